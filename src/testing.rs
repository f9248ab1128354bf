use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::{Arc, Mutex},
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use blob_store::{BlobStorage, Path, JSON_CONTENT_TYPE};
use bytes::Bytes;
use chrono::NaiveDate;
use data_model::{test_objects::tests::mock_forecast, CityCatalog};
use futures::stream::BoxStream;
use object_store::{
    memory::InMemory,
    GetOptions,
    GetResult,
    ListResult,
    MultipartUpload,
    ObjectMeta,
    ObjectStore,
    PutMultipartOptions,
    PutOptions,
    PutPayload,
    PutResult,
};
use pipeline_utils::RunClock;
use serde_json::Value;
use tracing::subscriber;
use tracing_subscriber::{layer::SubscriberExt, Layer};

use crate::{
    pipelines::PipelineContext,
    weather_client::{Endpoint, WeatherSource},
};

pub const TEST_DATE: &str = "2024-05-01";

pub const TEST_REGIONS: [(&str, &str); 5] = [
    ("Perth", "Western Australia"),
    ("Melbourne", "Victoria"),
    ("Sydney", "New South Wales"),
    ("Brisbane", "Queensland"),
    ("Adelaide", "South Australia"),
];

pub fn init_test_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug"));
    let _ = subscriber::set_global_default(
        tracing_subscriber::registry()
            .with(tracing_subscriber::fmt::layer().with_filter(env_filter)),
    );
}

/// 2024-05-01 06:30:00 plus `offset_secs`.
pub fn test_clock(offset_secs: u32) -> RunClock {
    RunClock::at(
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(6, 30, 0)
            .unwrap()
            + chrono::Duration::seconds(offset_secs as i64),
    )
}

pub struct TestContext {
    pub storage: Arc<BlobStorage>,
    pub ctx: PipelineContext,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_storage(BlobStorage::in_memory())
    }

    pub fn with_storage(storage: BlobStorage) -> Self {
        init_test_tracing();
        let storage = Arc::new(storage);
        let ctx = PipelineContext::new(storage.clone(), CityCatalog::default());
        Self { storage, ctx }
    }

    /// Writes `value` under `key` and waits long enough that the next write
    /// gets a strictly later modification time.
    pub async fn seed(&self, key: &str, value: &Value) -> Result<()> {
        self.storage
            .put(key, Bytes::from(serde_json::to_vec(value)?), JSON_CONTENT_TYPE)
            .await?;
        tokio::time::sleep(Duration::from_millis(5)).await;
        Ok(())
    }

    /// Reads an object by a key as reported by `keys`.
    pub async fn read(&self, key: &str) -> Result<Bytes> {
        self.storage.read_bytes(&Path::parse(key)?).await
    }

    pub async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys: Vec<_> = self
            .storage
            .list(prefix)
            .await?
            .into_iter()
            .map(|o| o.key)
            .collect();
        keys.sort();
        Ok(keys)
    }

    /// `(City, Alerts)` pairs from whichever current-weather object survived
    /// retention under `prefix`, JSON or CSV.
    pub async fn surviving_alerts(&self, prefix: &str) -> Result<Vec<(String, String)>> {
        let keys = self.keys(prefix).await?;
        let [key] = keys.as_slice() else {
            return Err(anyhow!("expected one survivor under {}, got {:?}", prefix, keys));
        };
        let bytes = self.read(key).await?;
        if key.ends_with(".json") {
            let records: Vec<Value> = serde_json::from_slice(&bytes)?;
            return Ok(records
                .iter()
                .map(|r| {
                    (
                        r["City"].as_str().unwrap_or_default().to_string(),
                        r["Alerts"].as_str().unwrap_or_default().to_string(),
                    )
                })
                .collect());
        }
        let mut reader = csv::Reader::from_reader(bytes.as_ref());
        let mut out = Vec::new();
        for row in reader.records() {
            let row = row?;
            out.push((row[0].to_string(), row[11].to_string()));
        }
        Ok(out)
    }
}

pub fn five_city_forecasts() -> Vec<Value> {
    TEST_REGIONS
        .iter()
        .map(|(name, region)| mock_forecast(name, region))
        .collect()
}

/// Serves canned payloads; cities without one fail.
#[derive(Default)]
pub struct StaticWeatherSource {
    forecasts: HashMap<String, Value>,
    alerts: HashMap<String, Value>,
    failing: HashSet<(String, &'static str)>,
    calls: Mutex<Vec<(String, Endpoint)>>,
}

impl StaticWeatherSource {
    pub fn with_forecast(mut self, city: &str, payload: Value) -> Self {
        self.forecasts.insert(city.to_string(), payload);
        self
    }

    pub fn with_alerts(mut self, city: &str, payload: Value) -> Self {
        self.alerts.insert(city.to_string(), payload);
        self
    }

    pub fn failing(mut self, city: &str, endpoint: Endpoint) -> Self {
        self.failing.insert((city.to_string(), endpoint.as_str()));
        self
    }

    pub fn calls(&self) -> Vec<(String, Endpoint)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl WeatherSource for StaticWeatherSource {
    async fn fetch(&self, city: &str, endpoint: Endpoint) -> Result<Value> {
        self.calls.lock().unwrap().push((city.to_string(), endpoint));
        if self.failing.contains(&(city.to_string(), endpoint.as_str())) {
            return Err(anyhow!("{} unavailable for {}", endpoint, city));
        }
        let payloads = match endpoint {
            Endpoint::Forecast => &self.forecasts,
            Endpoint::Alerts => &self.alerts,
        };
        payloads
            .get(city)
            .cloned()
            .ok_or_else(|| anyhow!("no {} payload for {}", endpoint, city))
    }
}

/// In-memory store that refuses every delete.
#[derive(Debug, Default)]
pub struct FailingDeleteStore {
    inner: InMemory,
}

impl FailingDeleteStore {
    pub fn storage() -> BlobStorage {
        BlobStorage::from_object_store(Arc::new(Self::default()))
    }
}

impl fmt::Display for FailingDeleteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FailingDeleteStore")
    }
}

#[async_trait]
impl ObjectStore for FailingDeleteStore {
    async fn put_opts(
        &self,
        location: &Path,
        payload: PutPayload,
        opts: PutOptions,
    ) -> object_store::Result<PutResult> {
        self.inner.put_opts(location, payload, opts).await
    }

    async fn put_multipart_opts(
        &self,
        location: &Path,
        opts: PutMultipartOptions,
    ) -> object_store::Result<Box<dyn MultipartUpload>> {
        self.inner.put_multipart_opts(location, opts).await
    }

    async fn get_opts(
        &self,
        location: &Path,
        options: GetOptions,
    ) -> object_store::Result<GetResult> {
        self.inner.get_opts(location, options).await
    }

    async fn delete(&self, location: &Path) -> object_store::Result<()> {
        Err(object_store::Error::Generic {
            store: "FailingDeleteStore",
            source: format!("delete of {} refused", location).into(),
        })
    }

    fn list(&self, prefix: Option<&Path>) -> BoxStream<'static, object_store::Result<ObjectMeta>> {
        self.inner.list(prefix)
    }

    async fn list_with_delimiter(&self, prefix: Option<&Path>) -> object_store::Result<ListResult> {
        self.inner.list_with_delimiter(prefix).await
    }

    async fn copy(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy(from, to).await
    }

    async fn copy_if_not_exists(&self, from: &Path, to: &Path) -> object_store::Result<()> {
        self.inner.copy_if_not_exists(from, to).await
    }
}
