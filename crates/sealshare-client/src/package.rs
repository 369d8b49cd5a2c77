//! Inputs and outputs of the client pipelines

use sealshare_core::{FileKind, Recipient};
use sealshare_crypto::EncryptedBlob;
use serde::Serialize;
use zeroize::Zeroize;

/// A plaintext file about to be shared
#[derive(Clone)]
pub struct PlainFile {
    pub name: String,
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for PlainFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlainFile")
            .field("name", &self.name)
            .field("mimetype", &self.mimetype)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Metadata sent with an upload. The server adds the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadMetadata {
    pub name: String,
    pub mimetype: String,
    pub size: u64,
    /// SHA-256 of the plaintext, lowercase hex
    pub hash: String,
}

/// Everything the transport needs to upload one encrypted file.
///
/// Serializes without the ciphertext, which travels as its own body part.
/// `encryption_key_b64` is the base64 JWK the server uses to wrap the key for
/// recipients; it is zeroed when the package drops.
#[derive(Serialize)]
pub struct UploadPackage {
    #[serde(skip)]
    pub encrypted_file: EncryptedBlob,
    pub encryption_key_b64: String,
    /// File key wrapped under the uploader's own public key (base64)
    pub owner_wrapped_key: String,
    pub metadata: UploadMetadata,
    pub recipients: Vec<Recipient>,
}

impl Drop for UploadPackage {
    fn drop(&mut self) {
        self.encryption_key_b64.zeroize();
    }
}

impl std::fmt::Debug for UploadPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadPackage")
            .field("encrypted_file", &self.encrypted_file)
            .field("encryption_key_b64", &"[REDACTED]")
            .field("owner_wrapped_key", &self.owner_wrapped_key)
            .field("metadata", &self.metadata)
            .field("recipients", &self.recipients)
            .finish()
    }
}

/// Verified plaintext ready for a viewer
pub struct DecryptedFile {
    pub name: String,
    pub mimetype: String,
    pub kind: FileKind,
    pub bytes: Vec<u8>,
}

impl Drop for DecryptedFile {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DecryptedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecryptedFile")
            .field("name", &self.name)
            .field("mimetype", &self.mimetype)
            .field("kind", &self.kind)
            .field("len", &self.bytes.len())
            .finish()
    }
}
