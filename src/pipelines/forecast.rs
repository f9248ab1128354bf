use async_trait::async_trait;
use data_model::{forecast_csv, forecasts_by_city, reshape, RawBatch};
use pipeline_utils::RunClock;
use serde_json::{json, Map, Value};
use tracing::info;

use super::{Pipeline, PipelineContext, PipelineResult};
use crate::keys::{city_forecast_prefix, object_key, raw_forecast_prefix};

/// Turns today's latest raw forecast into per-city summary documents.
pub struct ForecastPipeline {
    ctx: PipelineContext,
}

impl ForecastPipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Pipeline for ForecastPipeline {
    fn name(&self) -> &'static str {
        "forecast"
    }

    fn failure_message(&self) -> &'static str {
        "Failed to process forecast data"
    }

    async fn run(&self, clock: &RunClock) -> PipelineResult<Value> {
        let date = clock.date();
        let raw_prefix = raw_forecast_prefix(&date);
        let latest = self.ctx.latest_input(&raw_prefix, "forecast", &date).await?;
        let bytes = self.ctx.read_input(&latest).await?;
        let by_city = forecasts_by_city(RawBatch::parse("forecast", &bytes)?, &self.ctx.cities)?;

        let ts = clock.timestamp();
        let mut processed_cities = Vec::with_capacity(by_city.len());
        let mut written_objects = Vec::new();
        let mut cleanup_stats = Map::new();

        for (city, source) in by_city.iter() {
            let summary = reshape(source, clock)?;
            processed_cities.push(city.to_string());
            let prefix = city_forecast_prefix(city, &date);

            let json_put = self
                .ctx
                .write_json(&object_key(&prefix, "forecast", &ts, "json"), &summary, true)
                .await?;
            written_objects.push(json_put.url);

            let csv = forecast_csv(&summary)?;
            let location_put = self
                .ctx
                .write_csv(&object_key(&prefix, "location", &ts, "csv"), csv.location)
                .await?;
            written_objects.push(location_put.url);
            let forecast_put = self
                .ctx
                .write_csv(&object_key(&prefix, "forecast", &ts, "csv"), csv.forecast)
                .await?;
            written_objects.push(forecast_put.url);

            let deleted = self.ctx.retention.prune(&prefix).await;
            info!("Deleted {} old files for {}", deleted, city);
            cleanup_stats.insert(prefix, deleted.into());
        }

        let deleted_raw = self.ctx.retention.prune(&raw_prefix).await;
        info!("Deleted {} old raw forecast files", deleted_raw);
        cleanup_stats.insert(raw_prefix, deleted_raw.into());

        Ok(json!({
            "message": "Forecast data processed successfully",
            "processed_cities": processed_cities,
            "files_created": written_objects.len(),
            "files_deleted": deleted_raw,
            "processing_date": date,
            "written_objects": written_objects,
            "cleanup_stats": cleanup_stats,
        }))
    }
}
