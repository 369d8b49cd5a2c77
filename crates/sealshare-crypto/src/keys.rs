//! Per-file symmetric key and its JWK export form

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sealshare_core::{ShareError, ShareResult};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::provider::{random_array, CryptoProvider};
use crate::KEY_SIZE;

const JWK_ALG: &str = "A256GCM";

/// A per-file 256-bit AES-GCM key. Zeroized on drop.
#[derive(Clone)]
pub struct SymmetricKey {
    bytes: [u8; KEY_SIZE],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }

    /// Generate a fresh random key.
    pub fn generate(provider: &dyn CryptoProvider) -> Self {
        Self::from_bytes(random_array(provider))
    }

    pub fn to_jwk(&self) -> JsonWebKey {
        JsonWebKey {
            alg: Some(JWK_ALG.to_string()),
            ext: Some(true),
            k: URL_SAFE_NO_PAD.encode(self.bytes),
            key_ops: Some(vec!["encrypt".to_string(), "decrypt".to_string()]),
            kty: "oct".to_string(),
        }
    }

    pub fn from_jwk(jwk: &JsonWebKey) -> ShareResult<Self> {
        if jwk.kty != "oct" {
            return Err(ShareError::InvalidKey(format!(
                "expected an \"oct\" JWK, got {:?}",
                jwk.kty
            )));
        }
        if let Some(alg) = jwk.alg.as_deref() {
            if alg != JWK_ALG {
                return Err(ShareError::InvalidKey(format!(
                    "unsupported JWK alg {alg:?}"
                )));
            }
        }

        let decoded = Zeroizing::new(
            URL_SAFE_NO_PAD
                .decode(jwk.k.trim_end_matches('='))
                .map_err(|e| ShareError::InvalidKey(format!("JWK k is not base64url: {e}")))?,
        );
        if decoded.len() != KEY_SIZE {
            return Err(ShareError::InvalidKey(format!(
                "JWK key has wrong size: {} bytes (expected {KEY_SIZE})",
                decoded.len()
            )));
        }

        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        Ok(Self::from_bytes(bytes))
    }

    /// Canonical exportable form: the UTF-8 JSON of the key's JWK.
    pub fn export(&self) -> ShareResult<Zeroizing<Vec<u8>>> {
        serde_json::to_vec(&self.to_jwk())
            .map(Zeroizing::new)
            .map_err(|e| ShareError::Encryption(format!("JWK serialization: {e}")))
    }

    /// Inverse of [`SymmetricKey::export`].
    pub fn import(exported: &[u8]) -> ShareResult<Self> {
        let jwk: JsonWebKey = serde_json::from_slice(exported)
            .map_err(|e| ShareError::InvalidKey(format!("JWK deserialization: {e}")))?;
        Self::from_jwk(&jwk)
    }
}

impl Drop for SymmetricKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymmetricKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// JSON Web Key for an octet-sequence key (RFC 7517).
///
/// Fields are declared in the order browsers emit them.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct JsonWebKey {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ext: Option<bool>,
    pub k: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_ops: Option<Vec<String>>,
    pub kty: String,
}

impl std::fmt::Debug for JsonWebKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonWebKey")
            .field("kty", &self.kty)
            .field("alg", &self.alg)
            .field("k", &"[REDACTED]")
            .finish()
    }
}
