use thiserror::Error;

use crate::types::AccessAction;

pub type ShareResult<T> = Result<T, ShareError>;

/// Failure kinds surfaced by the encryption engine.
///
/// The cryptographic variants (`DecryptionFailed`, `KeyUnwrapFailed`,
/// `InvalidMasterPassword`) intentionally carry no inner detail: a wrong key
/// and tampered input must produce the same error.
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("malformed blob: {0}")]
    MalformedBlob(String),

    #[error("decryption failed")]
    DecryptionFailed,

    #[error("key unwrap failed")]
    KeyUnwrapFailed,

    #[error("invalid master password")]
    InvalidMasterPassword,

    #[error("file integrity check failed")]
    FileIntegrityFailed,

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),

    #[error("file access has expired")]
    PermissionExpired,

    #[error("{0} not allowed")]
    PermissionDenied(AccessAction),

    #[error("encryption error: {0}")]
    Encryption(String),

    #[error("invalid key material: {0}")]
    InvalidKey(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ShareError {
    /// Text safe to show an end user.
    ///
    /// Never distinguishes a wrong password from a corrupted key blob.
    pub fn user_message(&self) -> &'static str {
        match self {
            ShareError::MalformedBlob(_) | ShareError::MalformedEnvelope(_) => {
                "Could not process file."
            }
            ShareError::DecryptionFailed | ShareError::KeyUnwrapFailed => {
                "Could not decrypt file."
            }
            ShareError::InvalidMasterPassword => {
                "Could not unlock your private key. Please re-enter your master password."
            }
            ShareError::FileIntegrityFailed => "File integrity failed. Please try again.",
            ShareError::PermissionExpired => "Link expired.",
            ShareError::PermissionDenied(AccessAction::View) => "View not allowed.",
            ShareError::PermissionDenied(AccessAction::Download) => "Download not allowed.",
            ShareError::Encryption(_)
            | ShareError::InvalidKey(_)
            | ShareError::Config(_)
            | ShareError::Io(_) => "Something went wrong. Please try again.",
        }
    }

    /// Whether asking the user for different input could make the operation succeed.
    ///
    /// Only the master password qualifies; every other failure is deterministic
    /// for the same inputs.
    pub fn is_retryable_with_new_input(&self) -> bool {
        matches!(self, ShareError::InvalidMasterPassword)
    }
}
