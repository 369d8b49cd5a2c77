//! Whole-file AES-256-GCM encryption/decryption
//!
//! Encrypted blob format (binary):
//! ```text
//! [12 bytes: random nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! The file body is encrypted exactly once with a fresh per-file key, no matter
//! how many recipients later receive a wrapped copy of that key.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use sealshare_core::{ShareError, ShareResult};
use std::sync::Arc;

use crate::keys::SymmetricKey;
use crate::provider::{random_array, CryptoProvider};
use crate::{KEY_SIZE, NONCE_SIZE};

/// `nonce ‖ ciphertext+tag`, as produced by [`FileCipher::encrypt`].
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptedBlob {
    bytes: Vec<u8>,
}

impl EncryptedBlob {
    /// Wrap raw bytes, rejecting anything too short to hold a nonce.
    pub fn from_bytes(bytes: Vec<u8>) -> ShareResult<Self> {
        check_nonce_prefix(&bytes)?;
        Ok(Self { bytes })
    }

    pub fn nonce(&self) -> &[u8] {
        &self.bytes[..NONCE_SIZE]
    }

    /// Ciphertext followed by the authentication tag
    pub fn ciphertext(&self) -> &[u8] {
        &self.bytes[NONCE_SIZE..]
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for EncryptedBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedBlob")
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Symmetric file cipher. Holds no key material between calls.
#[derive(Clone)]
pub struct FileCipher {
    provider: Arc<dyn CryptoProvider>,
}

impl FileCipher {
    pub fn new(provider: Arc<dyn CryptoProvider>) -> Self {
        Self { provider }
    }

    /// Encrypt `plaintext` under a freshly generated key.
    ///
    /// Returns the blob and the key; this component keeps neither.
    pub fn encrypt(&self, plaintext: &[u8]) -> ShareResult<(EncryptedBlob, SymmetricKey)> {
        let key = SymmetricKey::generate(self.provider.as_ref());
        let blob = self.encrypt_with_key(&key, plaintext)?;
        Ok((blob, key))
    }

    /// Encrypt `plaintext` under an existing key with a fresh random nonce.
    pub fn encrypt_with_key(
        &self,
        key: &SymmetricKey,
        plaintext: &[u8],
    ) -> ShareResult<EncryptedBlob> {
        let nonce: [u8; NONCE_SIZE] = random_array(self.provider.as_ref());
        let bytes = seal(key.as_bytes(), &nonce, plaintext)?;
        tracing::debug!(
            plaintext_len = plaintext.len(),
            blob_len = bytes.len(),
            "file encrypted"
        );
        Ok(EncryptedBlob { bytes })
    }

    /// Authenticated decryption of `nonce ‖ ciphertext+tag`.
    ///
    /// Input shorter than a nonce is [`ShareError::MalformedBlob`]; every other
    /// failure (wrong key, tampered bytes, truncated tag) is
    /// [`ShareError::DecryptionFailed`].
    pub fn decrypt(&self, blob: &[u8], key: &SymmetricKey) -> ShareResult<Vec<u8>> {
        open(key.as_bytes(), blob)
    }
}

fn check_nonce_prefix(bytes: &[u8]) -> ShareResult<()> {
    if bytes.len() < NONCE_SIZE {
        return Err(ShareError::MalformedBlob(format!(
            "encrypted blob too short: {} bytes (minimum {NONCE_SIZE})",
            bytes.len()
        )));
    }
    Ok(())
}

/// AES-256-GCM encrypt, returning `nonce ‖ ciphertext+tag`.
pub(crate) fn seal(
    key: &[u8; KEY_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> ShareResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| ShareError::Encryption(format!("AES-GCM encryption failed: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(nonce);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// AES-256-GCM decrypt of `nonce ‖ ciphertext+tag`.
pub(crate) fn open(key: &[u8; KEY_SIZE], blob: &[u8]) -> ShareResult<Vec<u8>> {
    check_nonce_prefix(blob)?;

    let (nonce, ciphertext) = blob.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| ShareError::DecryptionFailed)
}
