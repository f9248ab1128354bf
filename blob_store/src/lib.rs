use std::{env, fmt::Debug, sync::Arc};

use anyhow::{anyhow, Context, Result};
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::{stream::BoxStream, StreamExt, TryStreamExt};
use object_store::{
    aws::{AmazonS3, AmazonS3Builder},
    local,
    memory::InMemory,
    Attribute,
    Attributes,
    ObjectStore,
    PutOptions,
    PutPayload,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use object_store::path::Path;

pub const JSON_CONTENT_TYPE: &str = "application/json";
pub const CSV_CONTENT_TYPE: &str = "text/csv";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskStorageConfig {
    pub path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobStorageConfig {
    pub s3: Option<S3Config>,
    pub disk: Option<DiskStorageConfig>,
}

/// A listed object and the modification time assigned by the store.
///
/// `key` is the store's rendering of `location`, with reserved and non-ASCII
/// characters percent-encoded. Reads and deletes go through `location`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub location: Path,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PutResult {
    pub key: String,
    pub location: Path,
    pub url: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
enum Backend {
    S3 { bucket: String },
    Disk { path: String },
    Memory,
}

#[derive(Clone)]
pub struct BlobStorage {
    object_store: Arc<dyn ObjectStore>,
    backend: Backend,
}

impl Debug for BlobStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStorage")
            .field("backend", &self.backend)
            .finish()
    }
}

fn s3_builder(s3: &S3Config, endpoint: Option<String>) -> AmazonS3Builder {
    let mut builder = AmazonS3Builder::from_env()
        .with_region(s3.region.as_str())
        .with_bucket_name(s3.bucket.clone());
    // For supporting localstack/minio for testing
    if let Some(endpoint) = endpoint {
        if endpoint.starts_with("http://") {
            builder = builder.with_allow_http(true);
        }
        builder = builder.with_endpoint(endpoint);
    }
    builder
}

fn s3_storage(s3: &S3Config) -> Result<AmazonS3> {
    s3_builder(s3, env::var("AWS_ENDPOINT_URL").ok())
        .build()
        .context("unable to build S3 builder")
}

fn file_storage(disk: &DiskStorageConfig) -> Result<local::LocalFileSystem> {
    std::fs::create_dir_all(&disk.path)?;
    let s = local::LocalFileSystem::new_with_prefix(&disk.path)?;
    Ok(s)
}

impl BlobStorage {
    pub fn new(config: BlobStorageConfig) -> Result<Self> {
        if let Some(s3) = config.s3.as_ref() {
            return Ok(Self {
                object_store: Arc::new(s3_storage(s3)?),
                backend: Backend::S3 {
                    bucket: s3.bucket.clone(),
                },
            });
        }
        let disk = config
            .disk
            .ok_or_else(|| anyhow!("blob storage requires either s3 or disk config"))?;
        Ok(Self {
            object_store: Arc::new(file_storage(&disk)?),
            backend: Backend::Disk { path: disk.path },
        })
    }

    /// Process-local store, contents are dropped with the last clone.
    pub fn in_memory() -> Self {
        Self::from_object_store(Arc::new(InMemory::new()))
    }

    /// Wraps an already built store. URLs use the `memory://` scheme.
    pub fn from_object_store(object_store: Arc<dyn ObjectStore>) -> Self {
        Self {
            object_store,
            backend: Backend::Memory,
        }
    }

    pub fn path_url(&self, key: &str) -> String {
        match &self.backend {
            Backend::S3 { bucket } => format!("s3://{}/{}", bucket, key),
            Backend::Disk { path } => format!("file://{}/{}", path.trim_end_matches('/'), key),
            Backend::Memory => format!("memory:///{}", key),
        }
    }

    /// Lists every object under `prefix`. Prefixes are matched on whole
    /// path segments, so `a/2024-01-01/` never matches `a/2024-01-011/`.
    pub async fn list(&self, prefix: &str) -> Result<Vec<StoredObject>> {
        let prefix = Path::from(prefix);
        let objects = self
            .object_store
            .list(Some(&prefix))
            .map_ok(|meta| StoredObject {
                key: meta.location.to_string(),
                location: meta.location,
                last_modified: meta.last_modified,
            })
            .try_collect::<Vec<_>>()
            .await
            .map_err(|e| anyhow!("can't list objects under {:?}: {:?}", prefix, e))?;
        Ok(objects)
    }

    /// The most recently modified object under `prefix`, if any.
    pub async fn latest(&self, prefix: &str) -> Result<Option<StoredObject>> {
        let mut objects = self.list(prefix).await?;
        sort_newest_first(&mut objects);
        Ok(objects.into_iter().next())
    }

    pub async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<PutResult> {
        let path = Path::from(key);
        let size_bytes = data.len() as u64;
        let mut opts = PutOptions::default();
        // The local filesystem backend rejects object attributes.
        if !matches!(self.backend, Backend::Disk { .. }) {
            let mut attributes = Attributes::new();
            attributes.insert(Attribute::ContentType, content_type.to_string().into());
            opts.attributes = attributes;
        }
        self.object_store
            .put_opts(&path, PutPayload::from(data), opts)
            .await
            .map_err(|e| anyhow!("can't put object {:?}: {:?}", key, e))?;
        debug!(key = key, size_bytes, "wrote object");
        Ok(PutResult {
            key: path.to_string(),
            url: self.path_url(path.as_ref()),
            location: path,
            size_bytes,
        })
    }

    pub async fn get(&self, location: &Path) -> Result<BoxStream<'static, Result<Bytes>>> {
        let get_result = self
            .object_store
            .get(location)
            .await
            .map_err(|e| anyhow!("can't get object {:?}: {:?}", location, e))?;
        let location = location.clone();
        let stream = get_result.into_stream().map(move |chunk| {
            chunk.map_err(|e| anyhow!("error reading object {:?}: {:?}", location, e))
        });
        Ok(stream.boxed())
    }

    pub async fn read_bytes(&self, location: &Path) -> Result<Bytes> {
        let mut reader = self.get(location).await?;
        let mut bytes = BytesMut::new();
        while let Some(chunk) = reader.next().await {
            bytes.extend_from_slice(&chunk?);
        }
        Ok(bytes.into())
    }

    pub async fn delete(&self, location: &Path) -> Result<()> {
        self.object_store
            .delete(location)
            .await
            .map_err(|e| anyhow!("can't delete object {:?}: {:?}", location, e))?;
        Ok(())
    }
}

/// Orders objects newest first. Equal timestamps fall back to the key,
/// greatest first, so the order never depends on listing order.
pub fn sort_newest_first(objects: &mut [StoredObject]) {
    objects.sort_by(|a, b| {
        b.last_modified
            .cmp(&a.last_modified)
            .then_with(|| b.key.cmp(&a.key))
    });
}
