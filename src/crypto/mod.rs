//! Strongroom Media - Cryptographic Core
//!
//! PBKDF2 key derivation and streaming decryption of vault entries.

pub mod keys;
pub mod cbc_stream;

pub use keys::*;
pub use cbc_stream::{validate_key, DecryptedStream, BLOCK_SIZE, IV_LEN};
