//! Strongroom Media - Key Derivation
//!
//! Password based vault keys (PBKDF2-HMAC-SHA512) and their hex transport form.

use std::fmt;

use hmac::Hmac;
use secrecy::{ExposeSecret, Secret};
use sha2::Sha512;

use crate::error::{VaultError, VaultResult};

/// Iteration count used by the key derivation self-test.
///
/// Demonstration value only; production vaults use the configured cost.
pub const SELF_TEST_ITERATIONS: u32 = 1000;

/// Key size used by the self-test and the default vault configuration
pub const DEFAULT_KEY_BITS: u32 = 256;

/// Cipher family a derived key is meant for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    /// AES, key size chosen by the key length
    Aes,
}

/// Symmetric key material produced by [`derive_key`] or decoded from hex.
///
/// The bytes are zeroized on drop and never appear in `Debug` output.
pub struct DerivedKey {
    algorithm: KeyAlgorithm,
    bytes: Secret<Vec<u8>>,
}

impl DerivedKey {
    /// Wrap raw AES key bytes
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            algorithm: KeyAlgorithm::Aes,
            bytes: Secret::new(bytes),
        }
    }

    /// Decode a key previously produced by [`DerivedKey::to_hex`].
    ///
    /// Accepts upper or lower case digits. Any key length decodes; whether
    /// the length suits the vault cipher is checked when a stream is opened.
    pub fn from_hex(hex_key: &str) -> VaultResult<Self> {
        let bytes = hex::decode(hex_key.trim())?;
        Ok(Self::from_bytes(bytes))
    }

    /// Upper-case hex encoding of the key bytes
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.expose())
    }

    /// Expose the key bytes (use with caution)
    pub fn expose(&self) -> &[u8] {
        self.bytes.expose_secret()
    }

    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Key length in bytes
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    pub fn is_empty(&self) -> bool {
        self.expose().is_empty()
    }
}

impl Clone for DerivedKey {
    fn clone(&self) -> Self {
        Self {
            algorithm: self.algorithm,
            bytes: Secret::new(self.expose().to_vec()),
        }
    }
}

impl PartialEq for DerivedKey {
    fn eq(&self, other: &Self) -> bool {
        self.algorithm == other.algorithm && self.expose() == other.expose()
    }
}

impl Eq for DerivedKey {}

impl fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DerivedKey")
            .field("algorithm", &self.algorithm)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Derive a vault key from a password and salt.
///
/// Both strings are fed to PBKDF2-HMAC-SHA512 as their UTF-8 bytes. The
/// result is exactly `output_bits / 8` bytes long.
pub fn derive_key(
    password: &str,
    salt: &str,
    iterations: u32,
    output_bits: u32,
) -> VaultResult<DerivedKey> {
    if iterations == 0 {
        return Err(VaultError::KeyDerivationFailed(
            "iteration count must be positive".into(),
        ));
    }
    if output_bits == 0 || output_bits % 8 != 0 {
        return Err(VaultError::KeyDerivationFailed(format!(
            "output length must be a positive multiple of 8 bits, got {}",
            output_bits
        )));
    }

    let mut okm = vec![0u8; (output_bits / 8) as usize];
    pbkdf2::pbkdf2::<Hmac<Sha512>>(password.as_bytes(), salt.as_bytes(), iterations, &mut okm)
        .map_err(|e| VaultError::KeyDerivationFailed(e.to_string()))?;

    Ok(DerivedKey::from_bytes(okm))
}

/// Derive a key and return it in its hex transport form
pub fn derive_key_hex(
    password: &str,
    salt: &str,
    iterations: u32,
    output_bits: u32,
) -> VaultResult<String> {
    derive_key(password, salt, iterations, output_bits).map(|key| key.to_hex())
}

/// Check that derivation works and survives the hex round trip.
///
/// Every failure is returned to the caller.
pub fn self_test() -> VaultResult<bool> {
    let key = derive_key("test", "salt", SELF_TEST_ITERATIONS, DEFAULT_KEY_BITS)?;
    let decoded = DerivedKey::from_hex(&key.to_hex())?;
    let works = decoded == key;
    log::debug!("Key derivation self-test: {}", works);
    Ok(works)
}
