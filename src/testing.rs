//! In-memory stand-ins for the platform, shared by unit tests

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::pin;
use std::sync::Arc;
use std::task::{Context, Poll, Wake, Waker};
use std::thread::{self, Thread};

use aes::{Aes128, Aes192, Aes256};
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};
use parking_lot::Mutex;
use rand::RngCore;

use crate::crypto::{DerivedKey, IV_LEN};
use crate::deleter::{ConsentPresenter, CorrelationToken};
use crate::error::{VaultError, VaultResult};
use crate::media::{MediaCollection, MediaStore, DATA_COLUMN, ID_COLUMN};

// ═══════════════════════════════════════════════════════════════════════════
// VAULT FILES
// ═══════════════════════════════════════════════════════════════════════════

/// `IV || AES-CBC(PKCS#7(plaintext))`, the vault entry layout
pub fn encrypt_cbc(key: &DerivedKey, iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
    let bytes = key.expose();
    let ciphertext = match bytes.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(bytes, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        24 => cbc::Encryptor::<Aes192>::new_from_slices(bytes, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(bytes, iv)
            .unwrap()
            .encrypt_padded_vec_mut::<Pkcs7>(plaintext),
        n => panic!("unsupported test key length {}", n),
    };

    let mut out = iv.to_vec();
    out.extend_from_slice(&ciphertext);
    out
}

/// Encrypt `plaintext` under a random IV into `dir/name`
pub fn write_vault_file(dir: &Path, name: &str, key: &DerivedKey, plaintext: &[u8]) -> PathBuf {
    let mut iv = [0u8; IV_LEN];
    rand::thread_rng().fill_bytes(&mut iv);

    let path = dir.join(name);
    std::fs::write(&path, encrypt_cbc(key, &iv, plaintext)).unwrap();
    path
}

// ═══════════════════════════════════════════════════════════════════════════
// MEDIA INDEX
// ═══════════════════════════════════════════════════════════════════════════

struct Row {
    collection: MediaCollection,
    id: String,
    data: String,
}

impl Row {
    fn uri(&self) -> String {
        format!("{}/{}", self.collection.content_uri(), self.id)
    }

    fn column(&self, column: &str) -> Option<String> {
        match column {
            DATA_COLUMN => Some(self.data.clone()),
            ID_COLUMN => Some(self.id.clone()),
            _ => None,
        }
    }
}

#[derive(Default)]
struct IndexState {
    rows: Vec<Row>,
    columns: HashMap<(String, String), String>,
    vanished: HashSet<String>,
    deleted: Vec<String>,
}

/// Media index backed by a row list.
///
/// Understands the two selections the resolver issues (`_id=?` and
/// `_data = ?`) plus unfiltered reads of values set with `with_column`.
#[derive(Default)]
pub struct FakeMediaStore {
    state: Mutex<IndexState>,
    queries: Arc<Mutex<Vec<String>>>,
}

impl FakeMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(self, id: i64, path: &str) -> Self {
        self.with_raw_id(MediaCollection::Images, &id.to_string(), path)
    }

    pub fn with_video(self, id: i64, path: &str) -> Self {
        self.with_raw_id(MediaCollection::Video, &id.to_string(), path)
    }

    pub fn with_audio(self, id: i64, path: &str) -> Self {
        self.with_raw_id(MediaCollection::Audio, &id.to_string(), path)
    }

    pub fn with_raw_id(self, collection: MediaCollection, id: &str, path: &str) -> Self {
        self.state.lock().rows.push(Row {
            collection,
            id: id.to_string(),
            data: path.to_string(),
        });
        self
    }

    /// Value returned by an unfiltered query of `column` on `uri`
    pub fn with_column(self, uri: &str, column: &str, value: &str) -> Self {
        self.state
            .lock()
            .columns
            .insert((uri.to_string(), column.to_string()), value.to_string());
        self
    }

    /// Row still resolves, but deleting it removes nothing
    pub fn with_vanished(self, uri: &str) -> Self {
        self.state.lock().vanished.insert(uri.to_string());
        self
    }

    /// Every query issued so far, shared so it stays readable after the store
    /// moves into a resolver
    pub fn query_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.queries)
    }

    /// URIs deleted so far, in order
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }
}

impl MediaStore for FakeMediaStore {
    fn query(
        &self,
        uri: &str,
        column: &str,
        selection: Option<&str>,
        args: &[&str],
    ) -> VaultResult<Option<String>> {
        self.queries
            .lock()
            .push(format!("{} {} {:?} {:?}", uri, column, selection, args));

        let state = self.state.lock();
        let in_collection = |row: &&Row| row.collection.content_uri() == uri;

        let found = match (selection, args) {
            (None, _) => {
                return Ok(state.columns.get(&(uri.to_string(), column.to_string())).cloned())
            }
            (Some("_id=?"), [id]) => state.rows.iter().filter(in_collection).find(|r| r.id == *id),
            (Some("_data = ?"), [path]) => {
                state.rows.iter().filter(in_collection).find(|r| r.data == *path)
            }
            (Some(other), _) => {
                return Err(VaultError::Platform(format!("unsupported selection {:?}", other)))
            }
        };

        Ok(found.and_then(|row| row.column(column)))
    }

    fn delete(&self, uri: &str) -> VaultResult<usize> {
        let mut state = self.state.lock();
        if state.vanished.contains(uri) {
            return Ok(0);
        }
        match state.rows.iter().position(|row| row.uri() == uri) {
            Some(index) => {
                state.rows.remove(index);
                state.deleted.push(uri.to_string());
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONSENT
// ═══════════════════════════════════════════════════════════════════════════

/// Records every consent flow it is asked to show
#[derive(Clone, Default)]
pub struct FakePresenter {
    presented: Arc<Mutex<Vec<(CorrelationToken, Vec<String>)>>>,
    fail_with: Option<String>,
}

impl FakePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Presenter whose flow can never be launched
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn presented(&self) -> Vec<(CorrelationToken, Vec<String>)> {
        self.presented.lock().clone()
    }

    pub fn last(&self) -> Option<(CorrelationToken, Vec<String>)> {
        self.presented.lock().last().cloned()
    }
}

impl ConsentPresenter for FakePresenter {
    type Request = Vec<String>;

    fn build_consent_request(&self, uris: &[String]) -> VaultResult<Self::Request> {
        Ok(uris.to_vec())
    }

    fn present(&self, request: Self::Request, token: &CorrelationToken) -> VaultResult<()> {
        if let Some(message) = &self.fail_with {
            return Err(VaultError::Platform(message.clone()));
        }
        self.presented.lock().push((token.clone(), request));
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXECUTOR
// ═══════════════════════════════════════════════════════════════════════════

struct ThreadWaker(Thread);

impl Wake for ThreadWaker {
    fn wake(self: Arc<Self>) {
        self.0.unpark();
    }
}

/// Drive `future` on the calling thread with no tokio context
pub fn block_on<F: Future>(future: F) -> F::Output {
    let mut future = pin!(future);
    let waker = Waker::from(Arc::new(ThreadWaker(thread::current())));
    let mut cx = Context::from_waker(&waker);
    loop {
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(output) => return output,
            Poll::Pending => thread::park(),
        }
    }
}
