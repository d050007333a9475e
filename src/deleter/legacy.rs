//! Strongroom Media - Legacy Deletion
//!
//! Platforms without a consent flow let the app delete index rows itself.
//! The whole batch runs on the blocking pool and reports when done.

use std::sync::Arc;

use tokio::runtime::Handle;

use super::{Deleter, DeletionOutcome};
use crate::error::{VaultError, VaultResult};
use crate::media::MediaIdentityResolver;

/// Resolves and deletes each reference directly.
///
/// Keeps no pending state, so several batches may run at once.
pub struct LegacyDeleter {
    resolver: Arc<MediaIdentityResolver>,
    runtime: Handle,
}

impl LegacyDeleter {
    pub fn new(resolver: Arc<MediaIdentityResolver>, runtime: Handle) -> Self {
        Self { resolver, runtime }
    }
}

impl Deleter for LegacyDeleter {
    fn request(&self, references: Vec<String>) -> VaultResult<DeletionOutcome> {
        let (tx, outcome) = DeletionOutcome::channel();
        let resolver = Arc::clone(&self.resolver);

        self.runtime.spawn_blocking(move || {
            let result = delete_batch(&resolver, &references);
            if let Err(ref e) = result {
                log::warn!("Legacy delete failed: {}", e);
            }
            if tx.send(result).is_err() {
                log::debug!("Delete caller went away before the batch finished");
            }
        });

        Ok(outcome)
    }
}

/// Resolve everything first so a bad reference aborts before any row is
/// removed, then delete in input order.
fn delete_batch(resolver: &MediaIdentityResolver, references: &[String]) -> VaultResult<()> {
    let targets = references
        .iter()
        .map(|reference| resolver.resolve_uri(reference))
        .collect::<VaultResult<Vec<_>>>()?;

    let mut deleted = 0usize;
    for uri in &targets {
        deleted += resolver.store().delete(uri)?;
    }

    if deleted == references.len() {
        log::info!("Deleted {} media item(s)", deleted);
        Ok(())
    } else {
        Err(VaultError::PartialDeletion {
            deleted,
            requested: references.len(),
        })
    }
}
