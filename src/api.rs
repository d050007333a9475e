//! Strongroom Media - Host API
//!
//! Single entry point the host app talks to. Bundles configuration, the
//! media resolver and the deletion coordinator.

use std::path::Path;
use std::sync::Arc;

use tokio::runtime::Handle;

use crate::config::MediaVaultConfig;
use crate::crypto::{self, DerivedKey};
use crate::deleter::{
    ConsentOutcome, ConsentPresenter, CorrelationToken, DeletionCoordinator, DeletionOutcome,
    PlatformCapability,
};
use crate::error::{VaultError, VaultResult};
use crate::media::{CanonicalMediaId, MediaIdentityResolver, MediaStore};
use crate::vault_file::VaultFile;

// ═══════════════════════════════════════════════════════════════════════════════
// MEDIA VAULT API
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongroom media API
///
/// # Example
///
/// ```rust,ignore
/// use strongroom_media::api::MediaVaultApi;
///
/// let api = MediaVaultApi::new(config, media_store, presenter)?;
///
/// // Read the vault manifest
/// let key = api.derive_key_hex(&password, &salt, 5000, 256)?;
/// let manifest = api.open_vault_file("vault/manifest", &key)?.plain_text_contents()?;
///
/// // Remove the original once it is in the vault
/// api.delete_media_file("content://media/external/images/media/42")?.await?;
/// ```
pub struct MediaVaultApi {
    config: MediaVaultConfig,
    resolver: Arc<MediaIdentityResolver>,
    coordinator: DeletionCoordinator,
    runtime: Handle,
}

impl MediaVaultApi {
    // ═══════════════════════════════════════════════════════════════════════
    // INITIALIZATION
    // ═══════════════════════════════════════════════════════════════════════

    /// Build the API on the current tokio runtime
    pub fn new<P: ConsentPresenter + 'static>(
        config: MediaVaultConfig,
        store: Arc<dyn MediaStore>,
        presenter: P,
    ) -> VaultResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| VaultError::Config(format!("no tokio runtime available: {}", e)))?;
        Self::with_runtime(config, store, presenter, runtime)
    }

    /// Build the API with background work on `runtime`
    pub fn with_runtime<P: ConsentPresenter + 'static>(
        config: MediaVaultConfig,
        store: Arc<dyn MediaStore>,
        presenter: P,
        runtime: Handle,
    ) -> VaultResult<Self> {
        config.validate()?;

        let resolver = Arc::new(MediaIdentityResolver::new(store, config.storage.clone()));
        let capability = config.capability();
        let coordinator = DeletionCoordinator::for_capability(
            capability,
            Arc::clone(&resolver),
            presenter,
            runtime.clone(),
        );

        log::info!(
            "Strongroom media API ready (sdk {}, {:?} deletes)",
            config.platform.sdk_level,
            capability
        );

        Ok(Self {
            config,
            resolver,
            coordinator,
            runtime,
        })
    }

    pub fn config(&self) -> &MediaVaultConfig {
        &self.config
    }

    pub fn capability(&self) -> PlatformCapability {
        self.coordinator.capability()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // KEYS & VAULT FILES
    // ═══════════════════════════════════════════════════════════════════════

    /// Derive a key with the configured cost
    pub fn derive_key(&self, password: &str, salt: &str) -> VaultResult<DerivedKey> {
        crypto::derive_key(password, salt, self.config.kdf.iterations, self.config.kdf.key_bits)
    }

    /// Derive a key with explicit parameters, hex encoded for transport
    pub fn derive_key_hex(
        &self,
        password: &str,
        salt: &str,
        iterations: u32,
        output_bits: u32,
    ) -> VaultResult<String> {
        crypto::derive_key_hex(password, salt, iterations, output_bits)
    }

    /// Vault file for `path`, decrypted with the hex encoded `key`.
    ///
    /// The file itself is not touched until it is read.
    pub fn open_vault_file<P: AsRef<Path>>(&self, path: P, key: &str) -> VaultResult<VaultFile> {
        let key = DerivedKey::from_hex(key)?;
        crypto::validate_key(&key)?;
        Ok(VaultFile::new(path, key).with_plaintext_limit(self.config.vault.max_plaintext_len))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // MEDIA
    // ═══════════════════════════════════════════════════════════════════════

    /// Canonical media row for `reference`, resolved on the API's blocking pool.
    ///
    /// The returned future may be polled from any executor.
    pub async fn resolve(&self, reference: String) -> VaultResult<CanonicalMediaId> {
        let resolver = Arc::clone(&self.resolver);
        self.runtime
            .spawn_blocking(move || resolver.resolve(&reference))
            .await
            .map_err(|e| VaultError::Platform(format!("resolver task failed: {}", e)))?
    }

    /// Delete `uris` from the shared media store
    pub fn request_deletion(&self, uris: Vec<String>) -> VaultResult<DeletionOutcome> {
        self.coordinator.request_deletion(uris)
    }

    /// Delete a single media item
    pub fn delete_media_file(&self, uri: &str) -> VaultResult<DeletionOutcome> {
        if uri.trim().is_empty() {
            return Err(VaultError::InvalidArgument("URI must not be empty".into()));
        }
        self.coordinator.request_deletion(vec![uri.to_string()])
    }

    /// Report the consent decision for the request tagged `token`.
    ///
    /// Returns whether a pending request was completed. A token that does not
    /// parse is an `InvalidArgument` error.
    pub fn on_consent_outcome(&self, token: &str, approved: bool) -> VaultResult<bool> {
        let token: CorrelationToken = token.parse()?;
        Ok(self
            .coordinator
            .on_consent_outcome(&token, ConsentOutcome::from_approved(approved)))
    }

    pub fn is_deletion_pending(&self) -> bool {
        self.coordinator.is_awaiting_consent()
    }

    /// Host is going away; pending consent requests are abandoned
    pub fn shutdown(&self) {
        log::info!("Shutting down strongroom media API");
        self.coordinator.shutdown();
    }
}
