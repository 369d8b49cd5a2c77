//! sealshare-envelope: the three-section response carrying a shared file
//!
//! Wire layout:
//! ```text
//! --<boundary>\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! {permissions JSON}\r\n
//! --<boundary>\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! {metadata JSON}\r\n
//! --<boundary>\r\n
//! Content-Type: application/octet-stream\r\n
//! Content-Transfer-Encoding: base64\r\n
//! \r\n
//! <base64 ciphertext>\r\n
//! --<boundary>--\r\n
//! ```
//!
//! The ciphertext is base64 encoded *before* the sections are joined and
//! decoded only *after* the body is split, so boundary bytes can never appear
//! inside it.

pub mod decode;
pub mod encode;

pub use decode::{boundary_from_content_type, decode, decode_response, Decoder};
pub use encode::{content_type_for, encode, generate_boundary};

use sealshare_core::{FileMetadata, FilePermissions};

/// Content type the ciphertext section must declare
pub const OCTET_STREAM: &str = "application/octet-stream";

/// The decoded shared-file response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub permissions: FilePermissions,
    pub metadata: FileMetadata,
    /// `nonce ‖ ciphertext+tag`, already base64-decoded
    pub encrypted_file: Vec<u8>,
}
