use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ShareError, ShareResult};

/// Lowest PBKDF2 iteration count accepted for master-password derivation
pub const MIN_PBKDF2_ITERATIONS: u32 = 100_000;

/// Top-level configuration (loaded from sealshare.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SealshareConfig {
    pub crypto: CryptoConfig,
    pub envelope: EnvelopeConfig,
    pub integrity: IntegrityConfig,
    pub logging: LoggingConfig,
}

/// Master-password key derivation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptoConfig {
    /// PBKDF2-HMAC-SHA256 iterations (default: 100000, never lower).
    /// Must match the value used when the private key blob was created.
    pub pbkdf2_iterations: u32,
}

impl Default for CryptoConfig {
    fn default() -> Self {
        Self {
            pbkdf2_iterations: MIN_PBKDF2_ITERATIONS,
        }
    }
}

/// Multipart response decoding limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvelopeConfig {
    /// Largest response body accepted for decoding (default: 256 MiB)
    pub max_envelope_bytes: u64,
    /// Content type the ciphertext section must declare
    pub binary_content_type: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            max_envelope_bytes: 256 * 1024 * 1024,
            binary_content_type: "application/octet-stream".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IntegrityConfig {
    /// Treat a missing published hash as an integrity failure (default: true)
    pub require_hash: bool,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self { require_hash: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl SealshareConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> ShareResult<Self> {
        let config: SealshareConfig =
            toml::from_str(content).map_err(|e| ShareError::Config(format!("parsing: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> ShareResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_toml_str(&content)
        } else {
            tracing::warn!(
                "config file not found: {}  (using defaults)",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> ShareResult<()> {
        if self.crypto.pbkdf2_iterations < MIN_PBKDF2_ITERATIONS {
            return Err(ShareError::Config(format!(
                "crypto.pbkdf2_iterations must be at least {MIN_PBKDF2_ITERATIONS}, got {}",
                self.crypto.pbkdf2_iterations
            )));
        }
        if self.envelope.max_envelope_bytes == 0 {
            return Err(ShareError::Config(
                "envelope.max_envelope_bytes must be non-zero".into(),
            ));
        }
        if self.envelope.binary_content_type.trim().is_empty() {
            return Err(ShareError::Config(
                "envelope.binary_content_type must not be empty".into(),
            ));
        }
        match self.logging.format.as_str() {
            "json" | "text" => Ok(()),
            other => Err(ShareError::Config(format!(
                "logging.format must be \"json\" or \"text\", got {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[crypto]
pbkdf2_iterations = 310000

[envelope]
max_envelope_bytes = 1048576
binary_content_type = "application/octet-stream"

[integrity]
require_hash = false

[logging]
level = "debug"
format = "json"
"#;
        let config = SealshareConfig::from_toml_str(toml_str).unwrap();

        assert_eq!(config.crypto.pbkdf2_iterations, 310_000);
        assert_eq!(config.envelope.max_envelope_bytes, 1_048_576);
        assert!(!config.integrity.require_hash);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
    }

    #[test]
    fn test_parse_defaults() {
        let config = SealshareConfig::from_toml_str("").unwrap();

        assert_eq!(config.crypto.pbkdf2_iterations, 100_000);
        assert_eq!(config.envelope.max_envelope_bytes, 256 * 1024 * 1024);
        assert_eq!(config.envelope.binary_content_type, "application/octet-stream");
        assert!(config.integrity.require_hash);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[logging]
level = "trace"
"#;
        let config = SealshareConfig::from_toml_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.logging.level, "trace");
        // Defaults
        assert_eq!(config.logging.format, "text");
        assert_eq!(config.crypto.pbkdf2_iterations, 100_000);
    }

    #[test]
    fn test_rejects_weak_kdf() {
        let err = SealshareConfig::from_toml_str("[crypto]\npbkdf2_iterations = 1000\n")
            .unwrap_err();
        assert!(matches!(err, ShareError::Config(_)));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let err = SealshareConfig::from_toml_str("[logging]\nformat = \"xml\"\n").unwrap_err();
        assert!(matches!(err, ShareError::Config(_)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = SealshareConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.crypto.pbkdf2_iterations, 100_000);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sealshare.toml");
        std::fs::write(&path, "[integrity]\nrequire_hash = false\n").unwrap();

        let config = SealshareConfig::load(&path).unwrap();
        assert!(!config.integrity.require_hash);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = SealshareConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed = SealshareConfig::from_toml_str(&toml_str).unwrap();

        assert_eq!(config.crypto.pbkdf2_iterations, parsed.crypto.pbkdf2_iterations);
        assert_eq!(config.logging.format, parsed.logging.format);
    }
}
