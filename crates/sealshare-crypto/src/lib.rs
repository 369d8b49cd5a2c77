//! sealshare-crypto: client-side E2E encryption for shared files
//!
//! Nothing in this crate holds state between calls. Every component takes an
//! explicit [`CryptoProvider`] for randomness so tests can make key and nonce
//! generation deterministic.
//!
//! Key hierarchy:
//! ```text
//! Master Password
//!   └── PBKDF2-HMAC-SHA256 (salt=16 random bytes, >=100k iterations)
//!       └── AES-256-GCM → PKCS#8 private key (RSA)
//!           └── RSA-OAEP-SHA256 → File Key (per-file, 256-bit random, JWK form)
//!               └── AES-256-GCM → file content  [12-byte nonce][ciphertext][16-byte tag]
//! ```

pub mod cipher;
pub mod integrity;
pub mod keys;
pub mod master;
pub mod provider;
pub mod wrap;

pub use cipher::{EncryptedBlob, FileCipher};
pub use integrity::{content_hash, ensure_integrity, verify};
pub use keys::{JsonWebKey, SymmetricKey};
pub use master::{DerivedKey, MasterKeyProtectedPrivateKey, MasterKeyUnwrapper};
pub use provider::{CryptoProvider, OsCryptoProvider, SeededCryptoProvider};
pub use wrap::{KeyWrapper, PrivateKeyMaterial, RecipientPublicKey, RecipientWrappedKey, WrappedKeyBlob};

/// Size of a file key or derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of an AES-GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Size of the PBKDF2 salt stored in front of a protected private key
pub const SALT_SIZE: usize = 16;
