use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ShareError, ShareResult};

/// What a recipient asks to do with a shared file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessAction {
    View,
    Download,
}

impl fmt::Display for AccessAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessAction::View => f.write_str("view"),
            AccessAction::Download => f.write_str("download"),
        }
    }
}

/// Display identity of the user who uploaded a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileOwner {
    pub name: String,
    pub username: String,
}

/// Server-issued description of a shared file. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub name: String,
    pub mimetype: String,
    pub size: u64,
    /// SHA-256 of the plaintext, lowercase hex
    #[serde(default)]
    pub hash: String,
    pub owner: FileOwner,
}

/// Rendering category derived from a MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Audio,
    Video,
    Pdf,
    Other,
}

impl FileMetadata {
    pub fn file_kind(&self) -> FileKind {
        FileKind::from_mimetype(&self.mimetype)
    }
}

impl FileKind {
    pub fn from_mimetype(mimetype: &str) -> Self {
        let essence = mimetype
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        if essence == "application/pdf" {
            return FileKind::Pdf;
        }
        match essence.split_once('/') {
            Some(("image", sub)) if !sub.is_empty() => FileKind::Image,
            Some(("audio", sub)) if !sub.is_empty() => FileKind::Audio,
            Some(("video", sub)) if !sub.is_empty() => FileKind::Video,
            _ => FileKind::Other,
        }
    }
}

/// Per-recipient access grant, issued by the server for each request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePermissions {
    pub can_view: bool,
    pub can_download: bool,
    /// The file key wrapped under this recipient's public key (base64)
    pub encrypted_file_key: String,
    pub expires_at: DateTime<Utc>,
}

impl FilePermissions {
    /// Re-check the grant locally before any key material is touched.
    pub fn validate(&self, action: AccessAction, now: DateTime<Utc>) -> ShareResult<()> {
        if self.expires_at <= now {
            tracing::debug!(expires_at = %self.expires_at, "permission grant expired");
            return Err(ShareError::PermissionExpired);
        }
        let allowed = match action {
            AccessAction::View => self.can_view,
            AccessAction::Download => self.can_download,
        };
        if !allowed {
            return Err(ShareError::PermissionDenied(action));
        }
        Ok(())
    }
}

/// A user a file is shared with, as sent alongside an upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub email: String,
    #[serde(default = "default_true")]
    pub can_view: bool,
    #[serde(default)]
    pub can_download: bool,
}

fn default_true() -> bool {
    true
}
