use std::sync::Arc;

use anyhow::Result;
use blob_store::{sort_newest_first, BlobStorage, StoredObject};
use tracing::{debug, error, info};

/// Keeps only the most recently modified object under a prefix.
#[derive(Clone)]
pub struct RetentionManager {
    storage: Arc<BlobStorage>,
}

/// Splits a listing into the survivor and the objects it supersedes.
pub fn partition_stale(
    mut objects: Vec<StoredObject>,
) -> Option<(StoredObject, Vec<StoredObject>)> {
    sort_newest_first(&mut objects);
    let mut objects = objects.into_iter();
    let survivor = objects.next()?;
    Some((survivor, objects.collect()))
}

impl RetentionManager {
    pub fn new(storage: Arc<BlobStorage>) -> Self {
        Self { storage }
    }

    /// Deletes every object under `prefix` except the newest and returns the
    /// number deleted. Failures are logged and reported as zero deletions;
    /// leftovers are collected by the next prune of the same prefix.
    pub async fn prune(&self, prefix: &str) -> usize {
        match self.try_prune(prefix).await {
            Ok(deleted) => deleted,
            Err(e) => {
                error!(prefix, "error pruning old versions: {:?}", e);
                0
            }
        }
    }

    async fn try_prune(&self, prefix: &str) -> Result<usize> {
        let objects = self.storage.list(prefix).await?;
        let Some((survivor, stale)) = partition_stale(objects) else {
            return Ok(0);
        };
        debug!(prefix, survivor = %survivor.key, "keeping latest version");
        for object in &stale {
            self.storage.delete(&object.location).await?;
            info!("Deleted old file: {}", object.key);
        }
        Ok(stale.len())
    }
}
