//! sealshare-client: the encrypt and decrypt paths as single calls
//!
//! Encrypt: file cipher → SHA-256 → wrap for owner → [`UploadPackage`].
//! Decrypt: envelope → permission check → master key → file key → plaintext →
//! integrity check → [`DecryptedFile`].

pub mod engine;
pub mod package;

pub use engine::ShareEngine;
pub use package::{DecryptedFile, PlainFile, UploadMetadata, UploadPackage};
