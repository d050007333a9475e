//! Strongroom Media - Streaming AES-CBC Decryption
//!
//! Vault entries are stored as:
//! ```text
//! [IV 16B][CIPHERTEXT n*16B][AES-CBC, PKCS#7 padded]
//! ```
//! There is no magic, version or MAC; the caller must know the key.

use std::io::{self, Read};

use aes::{Aes128, Aes192, Aes256, Block};
use cbc::cipher::block_padding::{Padding, Pkcs7};
use cbc::cipher::consts::U16;
use cbc::cipher::{BlockDecryptMut, InvalidLength, KeyIvInit};
use zeroize::Zeroize;

use super::keys::DerivedKey;
use crate::error::{VaultError, VaultResult};

/// AES block size
pub const BLOCK_SIZE: usize = 16;

/// CBC initialisation vector length
pub const IV_LEN: usize = 16;

// ---------------------------------------------------------------------------
// Cipher selection
// ---------------------------------------------------------------------------

/// CBC decryptor, AES variant picked from the key length
enum CbcDecryptor {
    Aes128(cbc::Decryptor<Aes128>),
    Aes192(cbc::Decryptor<Aes192>),
    Aes256(cbc::Decryptor<Aes256>),
}

impl CbcDecryptor {
    fn new(key: &DerivedKey, iv: &[u8; IV_LEN]) -> VaultResult<Self> {
        let bytes = key.expose();
        let init_failed = |e: InvalidLength| VaultError::Crypto(format!("cipher init failed: {}", e));

        match bytes.len() {
            16 => cbc::Decryptor::<Aes128>::new_from_slices(bytes, iv)
                .map(Self::Aes128)
                .map_err(init_failed),
            24 => cbc::Decryptor::<Aes192>::new_from_slices(bytes, iv)
                .map(Self::Aes192)
                .map_err(init_failed),
            32 => cbc::Decryptor::<Aes256>::new_from_slices(bytes, iv)
                .map(Self::Aes256)
                .map_err(init_failed),
            n => Err(VaultError::InvalidKeyLength(n)),
        }
    }

    fn decrypt_block(&mut self, block: &mut Block) {
        match self {
            Self::Aes128(d) => d.decrypt_block_mut(block),
            Self::Aes192(d) => d.decrypt_block_mut(block),
            Self::Aes256(d) => d.decrypt_block_mut(block),
        }
    }
}

/// Check that a key can drive the vault cipher without touching any file
pub fn validate_key(key: &DerivedKey) -> VaultResult<()> {
    CbcDecryptor::new(key, &[0u8; IV_LEN]).map(|_| ())
}

// ---------------------------------------------------------------------------
// DecryptedStream
// ---------------------------------------------------------------------------

/// Plaintext view over an encrypted vault entry.
///
/// Ciphertext is pulled from `inner` one block at a time as the caller reads.
/// The most recent plaintext block is held back until the next block (or end
/// of input) arrives, because only the final block carries padding.
///
/// A wrong key is not detectable when the stream is created. It shows up as
/// garbage output or as an [`io::ErrorKind::InvalidData`] padding error near
/// the end of the stream.
pub struct DecryptedStream<R> {
    inner: R,
    decryptor: CbcDecryptor,
    /// Decrypted block that may still turn out to be the last one
    held: Option<Block>,
    /// Plaintext ready to hand out
    out: Vec<u8>,
    out_pos: usize,
    finished: bool,
    failure: Option<String>,
}

impl<R: Read> DecryptedStream<R> {
    /// Read the IV from `inner` and set up the cipher.
    ///
    /// Fails with [`VaultError::InvalidKeyLength`] for keys that are not
    /// 16, 24 or 32 bytes, and with [`VaultError::Io`] when the IV is missing.
    pub fn new(mut inner: R, key: &DerivedKey) -> VaultResult<Self> {
        validate_key(key)?;

        let mut iv = [0u8; IV_LEN];
        inner.read_exact(&mut iv)?;
        let decryptor = CbcDecryptor::new(key, &iv)?;

        Ok(Self {
            inner,
            decryptor,
            held: None,
            out: Vec::with_capacity(BLOCK_SIZE),
            out_pos: 0,
            finished: false,
            failure: None,
        })
    }

    /// True once the final block has been unpadded and handed out
    pub fn is_exhausted(&self) -> bool {
        self.finished && self.out_pos >= self.out.len()
    }

    /// Fill `block` from the source, returning how many bytes were read
    fn read_block(&mut self, block: &mut Block) -> io::Result<usize> {
        let mut filled = 0;
        while filled < BLOCK_SIZE {
            match self.inner.read(&mut block[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }

    fn fail(&mut self, message: String) -> io::Error {
        self.finished = true;
        self.failure = Some(message.clone());
        io::Error::new(io::ErrorKind::InvalidData, message)
    }

    /// Decrypt until at least one plaintext byte is ready or input ends
    fn refill(&mut self) -> io::Result<()> {
        self.out.zeroize();
        self.out.clear();
        self.out_pos = 0;

        while self.out.is_empty() && !self.finished {
            let mut block = Block::default();
            match self.read_block(&mut block)? {
                BLOCK_SIZE => {
                    self.decryptor.decrypt_block(&mut block);
                    if let Some(mut previous) = self.held.replace(block) {
                        self.out.extend_from_slice(&previous);
                        previous.as_mut_slice().zeroize();
                    }
                }
                0 => {
                    let Some(mut last) = self.held.take() else {
                        return Err(self.fail("ciphertext is empty, padding block missing".into()));
                    };
                    let unpadded = <Pkcs7 as Padding<U16>>::unpad(&last)
                        .map(|plain| plain.to_vec())
                        .map_err(|_| "bad padding - wrong key or corrupted file".to_string());
                    last.as_mut_slice().zeroize();
                    match unpadded {
                        Ok(plain) => {
                            self.out.extend_from_slice(&plain);
                            self.finished = true;
                        }
                        Err(message) => return Err(self.fail(message)),
                    }
                }
                trailing => {
                    return Err(self.fail(format!(
                        "ciphertext is not a multiple of {} bytes ({} trailing)",
                        BLOCK_SIZE, trailing
                    )));
                }
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for DecryptedStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if let Some(message) = &self.failure {
            return Err(io::Error::new(io::ErrorKind::InvalidData, message.clone()));
        }
        if buf.is_empty() {
            return Ok(0);
        }
        if self.out_pos >= self.out.len() {
            self.refill()?;
        }

        let available = &self.out[self.out_pos..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        self.out_pos += n;
        Ok(n)
    }
}

impl<R> Drop for DecryptedStream<R> {
    fn drop(&mut self) {
        self.out.zeroize();
        if let Some(block) = self.held.as_mut() {
            block.as_mut_slice().zeroize();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::encrypt_cbc;
    use std::io::Cursor;

    const IV: [u8; IV_LEN] = [0x24; IV_LEN];

    fn key(len: usize) -> DerivedKey {
        DerivedKey::from_bytes((0..len as u8).collect())
    }

    fn decrypt_all(data: Vec<u8>, key: &DerivedKey) -> io::Result<Vec<u8>> {
        let mut stream = DecryptedStream::new(Cursor::new(data), key).unwrap();
        let mut out = Vec::new();
        stream.read_to_end(&mut out)?;
        Ok(out)
    }

    #[test]
    fn test_decrypts_any_plaintext_size() {
        let key = key(32);
        for size in [0usize, 1, 15, 16, 17, 31, 32, 1000] {
            let plaintext: Vec<u8> = (0..size).map(|i| (i * 7 % 251) as u8).collect();
            let encrypted = encrypt_cbc(&key, &IV, &plaintext);
            assert_eq!(decrypt_all(encrypted, &key).unwrap(), plaintext, "size {}", size);
        }
    }

    #[test]
    fn test_all_aes_key_sizes() {
        let plaintext = b"Strongroom vault entry";
        for len in [16, 24, 32] {
            let key = key(len);
            let encrypted = encrypt_cbc(&key, &IV, plaintext);
            assert_eq!(decrypt_all(encrypted, &key).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_bad_key_length_fails_at_open() {
        let encrypted = encrypt_cbc(&key(32), &IV, b"data");
        let err = DecryptedStream::new(Cursor::new(encrypted), &key(20)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::VaultCrypto);
    }

    #[test]
    fn test_missing_iv_is_io_error() {
        let err = DecryptedStream::new(Cursor::new(vec![1u8, 2, 3]), &key(32)).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::VaultIo);
    }

    #[test]
    fn test_wrong_key_never_yields_plaintext() {
        let plaintext = b"The quick brown fox jumps over the lazy dog".to_vec();
        let encrypted = encrypt_cbc(&key(32), &IV, &plaintext);
        let wrong = DerivedKey::from_bytes(vec![0x99; 32]);

        // Opening must succeed; the failure, if any, comes while reading.
        let mut stream = DecryptedStream::new(Cursor::new(encrypted), &wrong).unwrap();
        let mut out = Vec::new();
        match stream.read_to_end(&mut out) {
            Ok(_) => assert_ne!(out, plaintext),
            Err(e) => assert_eq!(e.kind(), io::ErrorKind::InvalidData),
        }
    }

    #[test]
    fn test_truncated_ciphertext() {
        let key = key(32);
        let mut encrypted = encrypt_cbc(&key, &IV, &[7u8; 40]);
        encrypted.truncate(encrypted.len() - 3);

        let err = decrypt_all(encrypted, &key).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_iv_only_is_invalid() {
        let err = decrypt_all(IV.to_vec(), &key(32)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_failure_is_sticky() {
        let key = key(32);
        let mut encrypted = encrypt_cbc(&key, &IV, &[1u8; 20]);
        encrypted.truncate(encrypted.len() - 1);

        let mut stream = DecryptedStream::new(Cursor::new(encrypted), &key).unwrap();
        let mut out = Vec::new();
        assert!(stream.read_to_end(&mut out).is_err());
        assert!(stream.read(&mut [0u8; 4]).is_err());
    }

    /// Counts how many ciphertext bytes the stream has pulled
    struct CountingReader {
        inner: Cursor<Vec<u8>>,
        consumed: usize,
    }

    impl Read for CountingReader {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.consumed += n;
            Ok(n)
        }
    }

    #[test]
    fn test_decryption_is_lazy() {
        let key = key(32);
        let plaintext = vec![0x5Au8; 64 * 1024];
        let encrypted = encrypt_cbc(&key, &IV, &plaintext);
        let total = encrypted.len();

        let reader = CountingReader { inner: Cursor::new(encrypted), consumed: 0 };
        let mut stream = DecryptedStream::new(reader, &key).unwrap();

        let mut first = [0u8; BLOCK_SIZE];
        stream.read_exact(&mut first).unwrap();
        assert_eq!(first, [0x5A; BLOCK_SIZE]);
        assert!(stream.inner.consumed <= IV_LEN + 2 * BLOCK_SIZE);
        assert!(stream.inner.consumed < total);
        assert!(!stream.is_exhausted());
    }
}
