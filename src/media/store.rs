//! Strongroom Media - Platform Media Index
//!
//! The host implements [`MediaStore`] on top of the device's media index
//! (a `ContentResolver` on Android). Everything here is read through it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::VaultResult;

/// File path column of the media index
pub const DATA_COLUMN: &str = "_data";

/// Row id column of the media index
pub const ID_COLUMN: &str = "_id";

/// Display name column exposed by document providers
pub const DISPLAY_NAME_COLUMN: &str = "_display_name";

/// Query and delete access to the platform media index
pub trait MediaStore: Send + Sync {
    /// Read `column` from the first row of `uri` matching `selection`.
    ///
    /// `selection` uses `?` placeholders filled from `args`. Returns
    /// `Ok(None)` when no row matches or the column is null.
    fn query(
        &self,
        uri: &str,
        column: &str,
        selection: Option<&str>,
        args: &[&str],
    ) -> VaultResult<Option<String>>;

    /// Delete the rows behind `uri`, returning how many were removed
    fn delete(&self, uri: &str) -> VaultResult<usize>;
}

/// Media index collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaCollection {
    Images,
    Video,
    Audio,
}

impl MediaCollection {
    /// Collections a file path is looked up in, in priority order
    pub const LOOKUP_ORDER: [MediaCollection; 2] = [MediaCollection::Images, MediaCollection::Video];

    /// External content URI of the collection
    pub fn content_uri(self) -> &'static str {
        match self {
            MediaCollection::Images => "content://media/external/images/media",
            MediaCollection::Video => "content://media/external/video/media",
            MediaCollection::Audio => "content://media/external/audio/media",
        }
    }

    /// Collection named by the type tag of a media document id
    pub fn from_document_type(tag: &str) -> Option<Self> {
        match tag {
            "image" => Some(MediaCollection::Images),
            "video" => Some(MediaCollection::Video),
            "audio" => Some(MediaCollection::Audio),
            _ => None,
        }
    }
}

/// Row of the media index a reference resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CanonicalMediaId {
    pub collection: MediaCollection,
    pub id: i64,
}

impl CanonicalMediaId {
    pub fn new(collection: MediaCollection, id: i64) -> Self {
        Self { collection, id }
    }

    /// Deletable URI of the row
    pub fn content_uri(&self) -> String {
        format!("{}/{}", self.collection.content_uri(), self.id)
    }
}

impl fmt::Display for CanonicalMediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content_uri())
    }
}
