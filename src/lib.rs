//! # Strongroom Media
//!
//! Core of the Strongroom media vault: reading encrypted vault entries and
//! removing the originals from the device's shared media store.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    MediaVaultApi                         │
//! │  ┌─────────────┐  ┌──────────────────┐  ┌────────────┐  │
//! │  │  CRYPTO     │  │  MEDIA RESOLVER  │  │  DELETION  │  │
//! │  │  PBKDF2     │  │  reference →     │  │  legacy /  │  │
//! │  │  AES-CBC    │  │  (collection,id) │  │  consent   │  │
//! │  └──────┬──────┘  └────────┬─────────┘  └─────┬──────┘  │
//! │         │                  │                  │          │
//! │  ┌──────┴──────┐  ┌────────┴──────────────────┴───────┐ │
//! │  │ VAULT FILE  │  │      MediaStore (host provided)    │ │
//! │  └─────────────┘  └────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Vault Format
//!
//! - Keys: PBKDF2-HMAC-SHA512 over the UTF-8 password and salt
//! - Entries: 16 byte IV followed by AES-CBC ciphertext, PKCS#7 padded
//! - Decryption is streamed block by block; key material is zeroized on drop

pub mod crypto;
pub mod vault_file;
pub mod media;
pub mod deleter;
pub mod config;
pub mod api;
pub mod error;

#[cfg(test)]
mod testing;

pub use error::{ErrorKind, VaultError, VaultResult};
pub use crypto::{derive_key, derive_key_hex, DerivedKey};
pub use vault_file::VaultFile;
pub use media::{CanonicalMediaId, MediaIdentityResolver, MediaStore};
pub use deleter::{ConsentPresenter, CorrelationToken, DeletionCoordinator, DeletionOutcome};
pub use config::MediaVaultConfig;
pub use api::MediaVaultApi;

/// Strongroom media version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
