//! Share engine: seal files for upload and decrypt shared-file responses
//!
//! Each call owns the key material it creates and drops it before returning.
//! The engine itself only holds configuration and a randomness provider, so a
//! single instance can serve any number of concurrent callers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use sealshare_core::config::SealshareConfig;
use sealshare_core::{AccessAction, Recipient, ShareError, ShareResult};
use sealshare_crypto::{
    content_hash, ensure_integrity, CryptoProvider, FileCipher, KeyWrapper, MasterKeyUnwrapper,
    OsCryptoProvider, RecipientPublicKey, WrappedKeyBlob,
};
use sealshare_envelope::{Decoder, Envelope};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::package::{DecryptedFile, PlainFile, UploadMetadata, UploadPackage};

#[derive(Clone)]
pub struct ShareEngine {
    cipher: FileCipher,
    wrapper: KeyWrapper,
    unwrapper: MasterKeyUnwrapper,
    decoder: Decoder,
    require_hash: bool,
}

impl ShareEngine {
    /// Engine drawing randomness from the operating system.
    pub fn new(config: &SealshareConfig) -> ShareResult<Self> {
        Self::with_provider(config, Arc::new(OsCryptoProvider))
    }

    pub fn with_provider(
        config: &SealshareConfig,
        provider: Arc<dyn CryptoProvider>,
    ) -> ShareResult<Self> {
        config.validate()?;
        Ok(Self {
            cipher: FileCipher::new(provider.clone()),
            wrapper: KeyWrapper::new(provider.clone()),
            unwrapper: MasterKeyUnwrapper::with_iterations(
                provider,
                config.crypto.pbkdf2_iterations,
            )?,
            decoder: Decoder::from_config(&config.envelope),
            require_hash: config.integrity.require_hash,
        })
    }

    pub fn unwrapper(&self) -> &MasterKeyUnwrapper {
        &self.unwrapper
    }

    /// Encrypt `file` once and package it for upload.
    ///
    /// The file key is wrapped for `owner` and exported for the server, then
    /// dropped when this call returns.
    pub fn seal_for_upload(
        &self,
        file: &PlainFile,
        owner: &RecipientPublicKey,
        recipients: Vec<Recipient>,
    ) -> ShareResult<UploadPackage> {
        let hash = content_hash(&file.bytes);
        let (encrypted_file, file_key) = self.cipher.encrypt(&file.bytes)?;
        debug!(file = %file.name, ciphertext_len = encrypted_file.len(), "file encrypted");

        let owner_wrapped_key = self.wrapper.wrap(&file_key, owner)?.to_base64();
        let encryption_key_b64 = STANDARD.encode(file_key.export()?.as_slice());
        drop(file_key);
        debug!(file = %file.name, "file key wrapped for owner");

        info!(
            file = %file.name,
            bytes = file.bytes.len(),
            recipients = recipients.len(),
            "sealed for upload"
        );

        Ok(UploadPackage {
            encrypted_file,
            encryption_key_b64,
            owner_wrapped_key,
            metadata: UploadMetadata {
                name: file.name.clone(),
                mimetype: file.mimetype.clone(),
                size: file.bytes.len() as u64,
                hash,
            },
            recipients,
        })
    }

    /// Decode a shared-file response body.
    pub fn open_response(&self, raw: &[u8], content_type: &str) -> ShareResult<Envelope> {
        self.decoder.decode_response(raw, content_type)
    }

    /// Run the decrypt path for one envelope.
    ///
    /// The permission grant is re-checked against `now` before any key is
    /// touched. Plaintext that fails the integrity check is discarded.
    pub fn decrypt_shared(
        &self,
        envelope: &Envelope,
        protected_private_key_b64: &str,
        password: &SecretString,
        action: AccessAction,
        now: DateTime<Utc>,
    ) -> ShareResult<DecryptedFile> {
        let metadata = &envelope.metadata;
        envelope.permissions.validate(action, now)?;

        let published_hash = metadata.hash.trim();
        if published_hash.is_empty() && self.require_hash {
            warn!(file = %metadata.name, "no published hash, refusing to decrypt");
            return Err(ShareError::FileIntegrityFailed);
        }

        let wrapped = WrappedKeyBlob::from_base64(&envelope.permissions.encrypted_file_key)
            .map_err(|_| ShareError::KeyUnwrapFailed)?;

        let private_key = self
            .unwrapper
            .unwrap_private_key_b64(protected_private_key_b64, password)?;
        debug!(file = %metadata.name, "private key unlocked");

        let file_key = self.wrapper.unwrap(&wrapped, &private_key)?;
        drop(private_key);
        debug!(file = %metadata.name, "file key unwrapped");

        let mut bytes = self.cipher.decrypt(&envelope.encrypted_file, &file_key)?;
        drop(file_key);
        debug!(file = %metadata.name, bytes = bytes.len(), "file decrypted");

        if published_hash.is_empty() {
            warn!(file = %metadata.name, "no published hash, skipping integrity check");
        } else if let Err(e) = ensure_integrity(&bytes, published_hash) {
            zeroize::Zeroize::zeroize(&mut bytes);
            return Err(e);
        }

        info!(file = %metadata.name, %action, bytes = bytes.len(), "decrypted shared file");

        Ok(DecryptedFile {
            name: metadata.name.clone(),
            mimetype: metadata.mimetype.clone(),
            kind: metadata.file_kind(),
            bytes,
        })
    }

    /// [`ShareEngine::seal_for_upload`] on the blocking pool.
    pub async fn seal_for_upload_async(
        &self,
        file: PlainFile,
        owner: RecipientPublicKey,
        recipients: Vec<Recipient>,
    ) -> ShareResult<UploadPackage> {
        let engine = self.clone();
        run_blocking(move || engine.seal_for_upload(&file, &owner, recipients)).await
    }

    /// [`ShareEngine::decrypt_shared`] on the blocking pool.
    ///
    /// Key derivation dominates the cost, so this keeps the async runtime free.
    pub async fn decrypt_shared_async(
        &self,
        envelope: Envelope,
        protected_private_key_b64: String,
        password: SecretString,
        action: AccessAction,
        now: DateTime<Utc>,
    ) -> ShareResult<DecryptedFile> {
        let engine = self.clone();
        run_blocking(move || {
            engine.decrypt_shared(&envelope, &protected_private_key_b64, &password, action, now)
        })
        .await
    }
}

async fn run_blocking<T, F>(f: F) -> ShareResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> ShareResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ShareError::Io(std::io::Error::other(format!("crypto task failed: {e}"))))?
}
