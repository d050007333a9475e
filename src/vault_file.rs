//! Strongroom Media - Vault Files
//!
//! A vault entry on disk plus the key it was encrypted with. The decrypted
//! stream is opened on first demand and reused by every later read.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};

use crate::crypto::{DecryptedStream, DerivedKey};
use crate::error::{VaultError, VaultResult};

/// Decrypted stream over an opened vault file
pub type VaultFileStream = DecryptedStream<BufReader<File>>;

enum StreamState {
    Unopened,
    Open(VaultFileStream),
    Released,
}

/// Encrypted vault entry
pub struct VaultFile {
    path: PathBuf,
    key: DerivedKey,
    stream: StreamState,
    /// Optional cap on [`VaultFile::plain_text_contents`]
    max_plaintext_len: Option<u64>,
}

impl VaultFile {
    pub fn new<P: AsRef<Path>>(path: P, key: DerivedKey) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            key,
            stream: StreamState::Unopened,
            max_plaintext_len: None,
        }
    }

    /// Refuse to buffer more than `max` plaintext bytes in memory
    pub fn with_plaintext_limit(mut self, max: Option<u64>) -> Self {
        self.max_plaintext_len = max;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn key(&self) -> &DerivedKey {
        &self.key
    }

    /// True while a decrypted stream holds the file open
    pub fn is_open(&self) -> bool {
        matches!(self.stream, StreamState::Open(_))
    }

    /// Decrypted view of the file, opened on first call.
    ///
    /// Later calls return the same stream, positioned wherever the previous
    /// reader left it. Once the stream has been released the file is not
    /// reopened.
    pub fn decrypted_stream(&mut self) -> VaultResult<&mut VaultFileStream> {
        if matches!(self.stream, StreamState::Unopened) {
            let file = File::open(&self.path)?;
            let stream = DecryptedStream::new(BufReader::new(file), &self.key)?;
            log::debug!("Opened vault file {}", self.path.display());
            self.stream = StreamState::Open(stream);
        }

        match &mut self.stream {
            StreamState::Open(stream) => Ok(stream),
            _ => Err(VaultError::StreamReleased(self.path.display().to_string())),
        }
    }

    /// Drain the decrypted stream and decode it as UTF-8.
    ///
    /// Meant for small entries such as manifests. The file handle is released
    /// whether draining and decoding succeed or not.
    pub fn plain_text_contents(&mut self) -> VaultResult<String> {
        let drained = self.drain();
        self.release();
        Ok(String::from_utf8(drained?)?)
    }

    /// Drop the decrypted stream and close the underlying file
    pub fn release(&mut self) {
        if self.is_open() {
            self.stream = StreamState::Released;
            log::debug!("Released vault file {}", self.path.display());
        }
    }

    fn drain(&mut self) -> VaultResult<Vec<u8>> {
        let limit = self.max_plaintext_len;
        let stream = self.decrypted_stream()?;
        let mut plaintext = Vec::new();

        match limit {
            Some(max) => {
                stream
                    .by_ref()
                    .take(max.saturating_add(1))
                    .read_to_end(&mut plaintext)
                    .map_err(read_error)?;
                if plaintext.len() as u64 > max {
                    return Err(VaultError::PlaintextTooLarge { max });
                }
            }
            None => {
                stream.read_to_end(&mut plaintext).map_err(read_error)?;
            }
        }

        Ok(plaintext)
    }
}

/// Padding and framing failures surface as `InvalidData`; those are cipher
/// errors, anything else is plain I/O.
fn read_error(e: io::Error) -> VaultError {
    if e.kind() == io::ErrorKind::InvalidData {
        VaultError::Crypto(e.to_string())
    } else {
        VaultError::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::write_vault_file;
    use tempfile::tempdir;

    fn test_key() -> DerivedKey {
        DerivedKey::from_bytes(vec![0x42; 32])
    }

    #[test]
    fn test_plain_text_contents() {
        let dir = tempdir().unwrap();
        let text = r#"{"a1b2":{"itemPath":"IMG_001.jpg","type":"image/jpeg"}}"#;
        let path = write_vault_file(dir.path(), "manifest", &test_key(), text.as_bytes());

        let mut file = VaultFile::new(&path, test_key());
        assert!(!file.is_open());
        assert_eq!(file.plain_text_contents().unwrap(), text);
        assert!(!file.is_open());
    }

    #[test]
    fn test_stream_is_reused() {
        let dir = tempdir().unwrap();
        let path = write_vault_file(dir.path(), "data", &test_key(), b"Hello, Strongroom!");

        let mut file = VaultFile::new(&path, test_key());
        let mut head = [0u8; 7];
        file.decrypted_stream().unwrap().read_exact(&mut head).unwrap();
        assert_eq!(&head, b"Hello, ");
        assert!(file.is_open());

        // Same stream, so the remainder continues where the first read stopped.
        assert_eq!(file.plain_text_contents().unwrap(), "Strongroom!");
    }

    #[test]
    fn test_no_reopen_after_release() {
        let dir = tempdir().unwrap();
        let path = write_vault_file(dir.path(), "data", &test_key(), b"once");

        let mut file = VaultFile::new(&path, test_key());
        file.plain_text_contents().unwrap();

        let err = file.decrypted_stream().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::VaultIo);
        assert!(matches!(err, VaultError::StreamReleased(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempdir().unwrap();
        let mut file = VaultFile::new(dir.path().join("missing.json"), test_key());

        let err = file.plain_text_contents().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::VaultIo);
        assert!(!file.is_open());
    }

    #[test]
    fn test_bad_key_length() {
        let dir = tempdir().unwrap();
        let path = write_vault_file(dir.path(), "data", &test_key(), b"payload");

        let mut file = VaultFile::new(&path, DerivedKey::from_bytes(vec![1; 10]));
        let err = file.decrypted_stream().err().unwrap();
        assert_eq!(err.kind(), ErrorKind::VaultCrypto);
    }

    #[test]
    fn test_wrong_key_is_not_silent() {
        let dir = tempdir().unwrap();
        let text = "secret manifest contents that span several blocks";
        let path = write_vault_file(dir.path(), "manifest", &test_key(), text.as_bytes());

        let mut file = VaultFile::new(&path, DerivedKey::from_bytes(vec![0x13; 32]));
        assert!(file.decrypted_stream().is_ok());
        match file.plain_text_contents() {
            Ok(decoded) => assert_ne!(decoded, text),
            Err(e) => assert!(matches!(e.kind(), ErrorKind::VaultCrypto | ErrorKind::Decode)),
        }
        assert!(!file.is_open());
    }

    #[test]
    fn test_invalid_utf8_releases_handle() {
        let dir = tempdir().unwrap();
        let path = write_vault_file(dir.path(), "thumb", &test_key(), &[0xFF, 0xFE, 0x00, 0xC3]);

        let mut file = VaultFile::new(&path, test_key());
        let err = file.plain_text_contents().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
        assert!(!file.is_open());
    }

    #[test]
    fn test_plaintext_limit() {
        let dir = tempdir().unwrap();
        let path = write_vault_file(dir.path(), "big", &test_key(), &[b'x'; 100]);

        let mut capped = VaultFile::new(&path, test_key()).with_plaintext_limit(Some(64));
        assert!(matches!(
            capped.plain_text_contents().unwrap_err(),
            VaultError::PlaintextTooLarge { max: 64 }
        ));

        let mut exact = VaultFile::new(&path, test_key()).with_plaintext_limit(Some(100));
        assert_eq!(exact.plain_text_contents().unwrap().len(), 100);
    }
}
