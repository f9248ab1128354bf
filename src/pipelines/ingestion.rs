use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use data_model::{
    alerts_by_city,
    current_weather_csv,
    forecasts_by_city,
    join,
    RawBatch,
    SourceAlerts,
};
use pipeline_utils::RunClock;
use serde_json::{json, Value};
use tracing::{info, warn};

use super::{Pipeline, PipelineContext, PipelineResult};
use crate::{
    keys::{current_weather_prefix, object_key, raw_alert_prefix, raw_forecast_prefix},
    weather_client::{Endpoint, WeatherSource},
};

/// Fetches forecasts and alerts for every configured city, stores them raw,
/// and derives the current-weather table from the same payloads.
pub struct IngestionPipeline {
    ctx: PipelineContext,
    source: Arc<dyn WeatherSource>,
}

impl IngestionPipeline {
    pub fn new(ctx: PipelineContext, source: Arc<dyn WeatherSource>) -> Self {
        Self { ctx, source }
    }

    async fn fetch_forecasts(&self) -> PipelineResult<Vec<Value>> {
        let mut forecasts = Vec::with_capacity(self.ctx.cities.names().len());
        for city in self.ctx.cities.names() {
            let forecast = self
                .source
                .fetch(city, Endpoint::Forecast)
                .await
                .with_context(|| format!("failed to get forecast for {}", city))?;
            forecasts.push(forecast);
        }
        Ok(forecasts)
    }

    /// Alerts are best effort: a failed city gets a `{city, error}` record.
    async fn fetch_alerts(&self) -> PipelineResult<Vec<Value>> {
        let mut alerts = Vec::with_capacity(self.ctx.cities.names().len());
        for city in self.ctx.cities.names() {
            match self.source.fetch(city, Endpoint::Alerts).await {
                Ok(alert) => alerts.push(alert),
                Err(e) => {
                    warn!("Failed to get alerts for {}: {:#}", city, e);
                    let placeholder = SourceAlerts::placeholder(city, &format!("{:#}", e));
                    alerts.push(
                        serde_json::to_value(placeholder)
                            .context("unable to encode alert placeholder")?,
                    );
                }
            }
        }
        Ok(alerts)
    }
}

#[async_trait]
impl Pipeline for IngestionPipeline {
    fn name(&self) -> &'static str {
        "ingestion"
    }

    fn failure_message(&self) -> &'static str {
        "Failed to process weather data"
    }

    async fn run(&self, clock: &RunClock) -> PipelineResult<Value> {
        let date = clock.date();
        let ts = clock.timestamp();

        let forecasts = self.fetch_forecasts().await?;
        let forecast_prefix = raw_forecast_prefix(&date);
        let forecast_put = self
            .ctx
            .write_json(
                &object_key(&forecast_prefix, "forecast", &ts, "json"),
                &forecasts,
                false,
            )
            .await?;

        let alerts = self.fetch_alerts().await?;
        let alert_prefix = raw_alert_prefix(&date);
        let alert_put = self
            .ctx
            .write_json(
                &object_key(&alert_prefix, "alert", &ts, "json"),
                &alerts,
                false,
            )
            .await?;

        let forecast_by_city = forecasts_by_city(RawBatch::List(forecasts), &self.ctx.cities)?;
        let alert_by_city = alerts_by_city(RawBatch::List(alerts), &self.ctx.cities);
        let records = join(&forecast_by_city, &alert_by_city);
        info!(cities = records.len(), "derived current weather records");

        let processed_prefix = current_weather_prefix(&date);
        let json_put = self
            .ctx
            .write_json(
                &object_key(&processed_prefix, "current_weather", &ts, "json"),
                &records,
                false,
            )
            .await?;
        let csv_put = self
            .ctx
            .write_csv(
                &object_key(&processed_prefix, "current_weather", &ts, "csv"),
                current_weather_csv(&records)?,
            )
            .await?;

        let deleted_forecast = self.ctx.retention.prune(&forecast_prefix).await;
        let deleted_alerts = self.ctx.retention.prune(&alert_prefix).await;
        let deleted_processed = self.ctx.retention.prune(&processed_prefix).await;

        Ok(json!({
            "message": "Weather data processed successfully",
            "processed_locations": {
                "json": json_put.url,
                "csv": csv_put.url,
            },
            "raw_data_locations": {
                "forecast": forecast_put.url,
                "alerts": alert_put.url,
            },
            "cleanup_stats": {
                "deleted_forecast_files": deleted_forecast,
                "deleted_alert_files": deleted_alerts,
                "deleted_processed_files": deleted_processed,
            },
        }))
    }
}
