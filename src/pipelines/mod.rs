use std::{any::Any, panic::AssertUnwindSafe, sync::Arc};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use blob_store::{BlobStorage, PutResult, StoredObject, CSV_CONTENT_TYPE, JSON_CONTENT_TYPE};
use bytes::Bytes;
use data_model::CityCatalog;
use futures::FutureExt;
use pipeline_utils::RunClock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::retention::RetentionManager;

pub mod current_weather;
pub mod forecast;
pub mod ingestion;

pub use current_weather::CurrentWeatherPipeline;
pub use forecast::ForecastPipeline;
pub use ingestion::IngestionPipeline;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No {kind} files found for date {date}")]
    MissingInput { kind: &'static str, date: String },

    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// What the scheduler sees: a status code and a JSON body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResponse {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub body: Value,
}

impl InvocationResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status_code: 200,
            body,
        }
    }

    pub fn not_found(message: String) -> Self {
        Self {
            status_code: 404,
            body: Value::String(message),
        }
    }

    pub fn internal_error(error: String, message: &str) -> Self {
        Self {
            status_code: 500,
            body: json!({
                "error": error,
                "message": message,
            }),
        }
    }

    /// The single translation point from a run's outcome to a status code.
    pub fn from_result(result: PipelineResult<Value>, failure_message: &str) -> Self {
        match result {
            Ok(body) => Self::ok(body),
            Err(e @ PipelineError::MissingInput { .. }) => {
                warn!("{}", e);
                Self::not_found(e.to_string())
            }
            Err(PipelineError::Fatal(e)) => {
                error!("{}: {:#}", failure_message, e);
                Self::internal_error(format!("{:#}", e), failure_message)
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }
}

/// Dependencies shared by every pipeline, passed in explicitly.
#[derive(Clone)]
pub struct PipelineContext {
    pub storage: Arc<BlobStorage>,
    pub retention: RetentionManager,
    pub cities: CityCatalog,
}

impl PipelineContext {
    pub fn new(storage: Arc<BlobStorage>, cities: CityCatalog) -> Self {
        Self {
            retention: RetentionManager::new(storage.clone()),
            storage,
            cities,
        }
    }

    /// Newest object under `prefix`, or `MissingInput` when there is none.
    pub async fn latest_input(
        &self,
        prefix: &str,
        kind: &'static str,
        date: &str,
    ) -> PipelineResult<StoredObject> {
        self.storage
            .latest(prefix)
            .await?
            .ok_or_else(|| PipelineError::MissingInput {
                kind,
                date: date.to_string(),
            })
    }

    pub async fn read_input(&self, object: &StoredObject) -> PipelineResult<Bytes> {
        info!(key = %object.key, "reading input object");
        let bytes = self
            .storage
            .read_bytes(&object.location)
            .await
            .with_context(|| format!("unable to read {}", object.key))?;
        Ok(bytes)
    }

    pub async fn write_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        pretty: bool,
    ) -> PipelineResult<PutResult> {
        let body = if pretty {
            serde_json::to_vec_pretty(value)
        } else {
            serde_json::to_vec(value)
        }
        .with_context(|| format!("unable to serialize {}", key))?;
        let put = self
            .storage
            .put(key, Bytes::from(body), JSON_CONTENT_TYPE)
            .await?;
        Ok(put)
    }

    pub async fn write_csv(&self, key: &str, body: String) -> PipelineResult<PutResult> {
        let put = self
            .storage
            .put(key, Bytes::from(body), CSV_CONTENT_TYPE)
            .await?;
        Ok(put)
    }
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    fn name(&self) -> &'static str;

    /// Human readable message carried by every 500 response.
    fn failure_message(&self) -> &'static str;

    async fn run(&self, clock: &RunClock) -> PipelineResult<Value>;
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        return s.to_string();
    }
    if let Some(s) = panic.downcast_ref::<String>() {
        return s.clone();
    }
    "unknown panic".to_string()
}

/// Runs one invocation of `pipeline`. The trigger event is opaque and only
/// logged. Errors and panics never escape; they become a 404 or 500 response.
pub async fn invoke(pipeline: &dyn Pipeline, event: &Value, clock: RunClock) -> InvocationResponse {
    let request_id = Uuid::new_v4().to_string();
    let span = info_span!("invocation", pipeline = pipeline.name(), %request_id);
    async move {
        debug!(%event, "received trigger event");
        let result = match AssertUnwindSafe(pipeline.run(&clock)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(PipelineError::Fatal(anyhow!(
                "pipeline panicked: {}",
                panic_message(panic.as_ref())
            ))),
        };
        let response = InvocationResponse::from_result(result, pipeline.failure_message());
        info!(status_code = response.status_code, "invocation finished");
        response
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    struct PanickingPipeline;

    #[async_trait]
    impl Pipeline for PanickingPipeline {
        fn name(&self) -> &'static str {
            "panicking"
        }

        fn failure_message(&self) -> &'static str {
            "Failed to panic"
        }

        async fn run(&self, _clock: &RunClock) -> PipelineResult<Value> {
            panic!("boom");
        }
    }

    fn clock() -> RunClock {
        RunClock::at(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(6, 30, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_from_result() {
        let ok = InvocationResponse::from_result(Ok(json!({"a": 1})), "failed");
        assert_eq!(ok.status_code, 200);
        assert!(ok.is_success());

        let missing = InvocationResponse::from_result(
            Err(PipelineError::MissingInput {
                kind: "forecast",
                date: "2024-05-01".to_string(),
            }),
            "failed",
        );
        assert_eq!(missing.status_code, 404);
        assert_eq!(
            missing.body,
            json!("No forecast files found for date 2024-05-01")
        );

        let fatal = InvocationResponse::from_result(
            Err(anyhow!("inner").context("outer").into()),
            "Failed to process forecast data",
        );
        assert_eq!(fatal.status_code, 500);
        assert_eq!(fatal.body["error"], json!("outer: inner"));
        assert_eq!(fatal.body["message"], json!("Failed to process forecast data"));
    }

    #[test]
    fn test_response_serialization() {
        let response = InvocationResponse::ok(json!({"message": "done"}));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"statusCode": 200, "body": {"message": "done"}}));
    }

    #[tokio::test]
    async fn test_invoke_catches_panics() {
        let response = invoke(&PanickingPipeline, &json!({}), clock()).await;
        assert_eq!(response.status_code, 500);
        assert_eq!(response.body["error"], json!("pipeline panicked: boom"));
        assert_eq!(response.body["message"], json!("Failed to panic"));
    }
}
