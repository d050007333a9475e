//! Strongroom Media - Media Identity Resolution
//!
//! Turns any reference a picker may hand back into the `(collection, id)` row
//! of the media index. Strategies are tried in a fixed order:
//!
//! 1. document provider shortcuts (external storage, downloads, media)
//! 2. a `_data` query on a plain content URI
//! 3. the path of a file URI
//!
//! The resulting path is then matched against the image collection, and only
//! if that misses, the video collection.

use std::sync::Arc;

use super::store::{
    CanonicalMediaId, MediaCollection, MediaStore, DATA_COLUMN, DISPLAY_NAME_COLUMN, ID_COLUMN,
};
use super::uri::{DocumentProvider, MediaReference};
use crate::config::StorageConfig;
use crate::error::{VaultError, VaultResult};

/// Resolves media references against one media index
pub struct MediaIdentityResolver {
    store: Arc<dyn MediaStore>,
    storage: StorageConfig,
}

impl MediaIdentityResolver {
    pub fn new(store: Arc<dyn MediaStore>, storage: StorageConfig) -> Self {
        Self { store, storage }
    }

    pub fn store(&self) -> &Arc<dyn MediaStore> {
        &self.store
    }

    /// Canonical row of `reference`
    pub fn resolve(&self, reference: &str) -> VaultResult<CanonicalMediaId> {
        resolve_with(self.store.as_ref(), &self.storage, reference)
    }

    /// Deletable content URI of `reference`
    pub fn resolve_uri(&self, reference: &str) -> VaultResult<String> {
        self.resolve(reference).map(|id| id.content_uri())
    }

    /// File path behind `reference`, without the final index lookup
    pub fn file_path(&self, reference: &str) -> VaultResult<Option<String>> {
        file_path(self.store.as_ref(), &self.storage, &MediaReference::parse(reference))
    }
}

/// Resolve `reference` using `store` directly
pub fn resolve_with(
    store: &dyn MediaStore,
    storage: &StorageConfig,
    reference: &str,
) -> VaultResult<CanonicalMediaId> {
    let parsed = MediaReference::parse(reference);
    log::debug!("Resolving {}", parsed);

    let path = match file_path(store, storage, &parsed)? {
        Some(path) if !path.is_empty() => path,
        _ => return Err(VaultError::UnresolvedMediaReference(reference.to_string())),
    };

    match lookup_path(store, &path)? {
        Some(id) => {
            log::debug!("{} resolved to {}", reference, id);
            Ok(id)
        }
        None => Err(VaultError::UnresolvedMediaReference(path)),
    }
}

/// Steps 1-3: derive a file system path from the reference
fn file_path(
    store: &dyn MediaStore,
    storage: &StorageConfig,
    reference: &MediaReference,
) -> VaultResult<Option<String>> {
    match reference {
        MediaReference::Document { uri, provider, document_id } => match provider {
            DocumentProvider::ExternalStorage => Ok(external_storage_path(storage, document_id)),
            DocumentProvider::Downloads => downloads_path(store, storage, uri, document_id),
            DocumentProvider::Media => media_document_path(store, document_id),
            DocumentProvider::Other => Ok(None),
        },
        MediaReference::Content { uri } => store.query(uri, DATA_COLUMN, None, &[]),
        MediaReference::File { path, .. } => Ok(Some(path.clone())),
        MediaReference::Unsupported { .. } => Ok(None),
    }
}

/// `primary:DCIM/a.jpg` or `1A2B-3C4D:DCIM/a.jpg`
fn external_storage_path(storage: &StorageConfig, document_id: &str) -> Option<String> {
    let (volume, relative) = document_id.split_once(':')?;
    let root = if volume.eq_ignore_ascii_case("primary") {
        storage.external_storage_root.trim_end_matches('/').to_string()
    } else {
        format!("{}/{}", storage.removable_storage_root.trim_end_matches('/'), volume)
    };
    Some(format!("{}/{}", root, relative))
}

fn downloads_path(
    store: &dyn MediaStore,
    storage: &StorageConfig,
    uri: &str,
    document_id: &str,
) -> VaultResult<Option<String>> {
    // Newer download providers hand out the absolute path directly
    if let Some(raw) = document_id.strip_prefix("raw:") {
        return Ok(Some(raw.to_string()));
    }

    let name = store.query(uri, DISPLAY_NAME_COLUMN, None, &[])?;
    Ok(name.map(|name| format!("{}/{}", storage.downloads_dir.trim_end_matches('/'), name)))
}

/// `image:1234` and friends
fn media_document_path(store: &dyn MediaStore, document_id: &str) -> VaultResult<Option<String>> {
    let Some((tag, row)) = document_id.split_once(':') else {
        return Ok(None);
    };
    let Some(collection) = MediaCollection::from_document_type(tag) else {
        return Ok(None);
    };

    store.query(collection.content_uri(), DATA_COLUMN, Some("_id=?"), &[row])
}

/// Step 4: find the path in the image, then the video collection
fn lookup_path(store: &dyn MediaStore, path: &str) -> VaultResult<Option<CanonicalMediaId>> {
    for collection in MediaCollection::LOOKUP_ORDER {
        let found = store.query(collection.content_uri(), ID_COLUMN, Some("_data = ?"), &[path])?;
        if let Some(raw) = found {
            let id = raw.trim().parse::<i64>().map_err(|_| {
                VaultError::Platform(format!("non-numeric {} {:?} for {}", ID_COLUMN, raw, path))
            })?;
            return Ok(Some(CanonicalMediaId::new(collection, id)));
        }
    }
    Ok(None)
}
