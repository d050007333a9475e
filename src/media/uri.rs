//! Strongroom Media - Media References
//!
//! Classifies caller supplied URIs into the shapes the resolver understands.

use std::fmt;

use percent_encoding::percent_decode_str;

/// Authority of the external storage document provider
pub const EXTERNAL_STORAGE_AUTHORITY: &str = "com.android.externalstorage.documents";

/// Authority of the downloads document provider
pub const DOWNLOADS_AUTHORITY: &str = "com.android.providers.downloads.documents";

/// Authority of the media document provider
pub const MEDIA_DOCUMENTS_AUTHORITY: &str = "com.android.providers.media.documents";

/// Document provider behind a document URI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentProvider {
    ExternalStorage,
    Downloads,
    Media,
    Other,
}

impl DocumentProvider {
    pub fn from_authority(authority: &str) -> Self {
        match authority {
            EXTERNAL_STORAGE_AUTHORITY => Self::ExternalStorage,
            DOWNLOADS_AUTHORITY => Self::Downloads,
            MEDIA_DOCUMENTS_AUTHORITY => Self::Media,
            _ => Self::Other,
        }
    }
}

/// A caller supplied media URI, classified
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaReference {
    /// `content://<authority>/document/<id>` or `.../tree/<tree>/document/<id>`
    Document {
        uri: String,
        provider: DocumentProvider,
        /// Percent-decoded document id
        document_id: String,
    },
    /// Any other `content://` URI
    Content { uri: String },
    /// `file:` URI (percent-decoded) or bare absolute path (verbatim)
    File { uri: String, path: String },
    /// Anything the resolver has no strategy for
    Unsupported { uri: String },
}

impl MediaReference {
    pub fn parse(reference: &str) -> Self {
        let uri = reference.to_string();

        if reference.starts_with('/') {
            return Self::File { path: uri.clone(), uri };
        }

        let Some((scheme, rest)) = split_scheme(reference) else {
            return Self::Unsupported { uri };
        };

        if scheme.eq_ignore_ascii_case("content") {
            let Some(rest) = rest.strip_prefix("//") else {
                return Self::Unsupported { uri };
            };
            let rest = strip_query(rest);
            let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));

            return match document_id(path) {
                Some(id) => Self::Document {
                    provider: DocumentProvider::from_authority(authority),
                    document_id: decode(id),
                    uri,
                },
                None => Self::Content { uri },
            };
        }

        if scheme.eq_ignore_ascii_case("file") {
            let rest = strip_query(rest);
            // file:///p, file://host/p and file:/p all carry an absolute path
            let path = match rest.strip_prefix("//") {
                Some(after) => after.find('/').map(|i| &after[i..]).unwrap_or(""),
                None => rest,
            };
            return Self::File { path: decode(path), uri };
        }

        Self::Unsupported { uri }
    }

    /// The reference exactly as the caller supplied it
    pub fn as_str(&self) -> &str {
        match self {
            Self::Document { uri, .. }
            | Self::Content { uri }
            | Self::File { uri, .. }
            | Self::Unsupported { uri } => uri,
        }
    }

    pub fn is_document(&self) -> bool {
        matches!(self, Self::Document { .. })
    }
}

impl fmt::Display for MediaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document { provider, document_id, .. } => {
                write!(f, "document ({:?}) id={}", provider, document_id)
            }
            Self::Content { uri } => write!(f, "content {}", uri),
            Self::File { path, .. } => write!(f, "file {}", path),
            Self::Unsupported { uri } => write!(f, "unsupported {}", uri),
        }
    }
}

fn split_scheme(reference: &str) -> Option<(&str, &str)> {
    let (scheme, rest) = reference.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some((scheme, rest))
}

fn strip_query(s: &str) -> &str {
    s.split(['?', '#']).next().unwrap_or(s)
}

/// Document id from a document provider path, still percent-encoded
fn document_id(path: &str) -> Option<&str> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        ["document", id] | ["tree", _, "document", id] => Some(*id),
        _ => None,
    }
}

fn decode(s: &str) -> String {
    percent_decode_str(s).decode_utf8_lossy().into_owned()
}
