use std::sync::Arc;

use anyhow::Result;
use blob_store::BlobStorage;
use clap::Subcommand;
use pipeline_utils::RunClock;
use serde_json::Value;

use crate::{
    config::PipelineConfig,
    pipelines::{
        invoke,
        CurrentWeatherPipeline,
        ForecastPipeline,
        IngestionPipeline,
        InvocationResponse,
        Pipeline,
        PipelineContext,
    },
    weather_client::HttpWeatherSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum PipelineKind {
    /// Fetch forecasts and alerts and derive current weather.
    Ingest,
    /// Reshape today's raw forecast into per-city documents.
    Forecast,
    /// Join today's raw forecast and alerts into current weather.
    CurrentWeather,
}

impl PipelineKind {
    pub fn failure_message(&self) -> &'static str {
        match self {
            PipelineKind::Ingest => "Failed to process weather data",
            PipelineKind::Forecast => "Failed to process forecast data",
            PipelineKind::CurrentWeather => "Failed to process current weather data",
        }
    }
}

pub struct Service {
    pub config: PipelineConfig,
    pub ctx: PipelineContext,
}

impl Service {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        let storage = Arc::new(BlobStorage::new(config.blob_storage.clone())?);
        let ctx = PipelineContext::new(storage, config.cities.clone());
        Ok(Self { config, ctx })
    }

    /// Only ingestion talks to the weather API, so only it needs the key.
    pub fn pipeline(&self, kind: PipelineKind) -> Result<Box<dyn Pipeline>> {
        let pipeline: Box<dyn Pipeline> = match kind {
            PipelineKind::Ingest => {
                let source = HttpWeatherSource::new(&self.config.weather_api)?;
                Box::new(IngestionPipeline::new(self.ctx.clone(), Arc::new(source)))
            }
            PipelineKind::Forecast => Box::new(ForecastPipeline::new(self.ctx.clone())),
            PipelineKind::CurrentWeather => Box::new(CurrentWeatherPipeline::new(self.ctx.clone())),
        };
        Ok(pipeline)
    }

    pub async fn handle(&self, kind: PipelineKind, event: &Value) -> InvocationResponse {
        match self.pipeline(kind) {
            Ok(pipeline) => invoke(pipeline.as_ref(), event, RunClock::now()).await,
            Err(e) => {
                InvocationResponse::internal_error(format!("{:#}", e), kind.failure_message())
            }
        }
    }
}
