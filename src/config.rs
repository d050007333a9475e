//! Strongroom Media - Configuration
//!
//! Loaded from JSON; every section has defaults matching a stock device.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::DEFAULT_KEY_BITS;
use crate::deleter::PlatformCapability;
use crate::error::{VaultError, VaultResult};

/// Key derivation cost used by the host when opening vaults
pub const DEFAULT_KDF_ITERATIONS: u32 = 5000;

/// Key derivation parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// PBKDF2 iteration count
    pub iterations: u32,
    /// Derived key size in bits
    pub key_bits: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_KDF_ITERATIONS,
            key_bits: DEFAULT_KEY_BITS,
        }
    }
}

/// Where the device keeps shared storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the primary external storage volume
    pub external_storage_root: String,
    /// Parent directory of removable volumes (`<root>/<volume id>`)
    pub removable_storage_root: String,
    /// Public downloads directory
    pub downloads_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            external_storage_root: "/storage/emulated/0".into(),
            removable_storage_root: "/storage".into(),
            downloads_dir: "/storage/emulated/0/Download".into(),
        }
    }
}

/// Platform facts fixed for the life of the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Platform API level
    pub sdk_level: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self { sdk_level: 30 }
    }
}

/// Vault file reading limits
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultReadConfig {
    /// Cap on plaintext buffered by `plain_text_contents`, unbounded if unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_plaintext_len: Option<u64>,
}

/// Top level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaVaultConfig {
    pub kdf: KdfConfig,
    pub storage: StorageConfig,
    pub platform: PlatformConfig,
    pub vault: VaultReadConfig,
}

impl MediaVaultConfig {
    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> VaultResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> VaultResult<Self> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&json)?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn to_json(&self) -> VaultResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> VaultResult<()> {
        if self.kdf.iterations == 0 {
            return Err(VaultError::Config("kdf.iterations must be positive".into()));
        }
        if !matches!(self.kdf.key_bits, 128 | 192 | 256) {
            return Err(VaultError::Config(format!(
                "kdf.key_bits must be an AES key size (128, 192 or 256), got {}",
                self.kdf.key_bits
            )));
        }
        for (name, dir) in [
            ("storage.external_storage_root", &self.storage.external_storage_root),
            ("storage.removable_storage_root", &self.storage.removable_storage_root),
            ("storage.downloads_dir", &self.storage.downloads_dir),
        ] {
            if !dir.starts_with('/') {
                return Err(VaultError::Config(format!("{} must be an absolute path", name)));
            }
        }
        Ok(())
    }

    /// Deletion capability of the configured platform
    pub fn capability(&self) -> PlatformCapability {
        PlatformCapability::from_sdk_level(self.platform.sdk_level)
    }
}
