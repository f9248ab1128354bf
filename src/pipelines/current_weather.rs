use async_trait::async_trait;
use data_model::{alerts_by_city, current_weather_csv, forecasts_by_city, join, RawBatch};
use pipeline_utils::RunClock;
use serde_json::{json, Value};

use super::{Pipeline, PipelineContext, PipelineResult};
use crate::keys::{current_weather_prefix, object_key, raw_alert_prefix, raw_forecast_prefix};

/// Joins today's latest raw forecast and alert objects into the
/// current-weather table.
pub struct CurrentWeatherPipeline {
    ctx: PipelineContext,
}

impl CurrentWeatherPipeline {
    pub fn new(ctx: PipelineContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl Pipeline for CurrentWeatherPipeline {
    fn name(&self) -> &'static str {
        "current_weather"
    }

    fn failure_message(&self) -> &'static str {
        "Failed to process current weather data"
    }

    async fn run(&self, clock: &RunClock) -> PipelineResult<Value> {
        let date = clock.date();
        let forecast_prefix = raw_forecast_prefix(&date);
        let alert_prefix = raw_alert_prefix(&date);

        let latest_forecast = self
            .ctx
            .latest_input(&forecast_prefix, "forecast", &date)
            .await?;
        let latest_alert = self.ctx.latest_input(&alert_prefix, "alert", &date).await?;

        let forecast_bytes = self.ctx.read_input(&latest_forecast).await?;
        let alert_bytes = self.ctx.read_input(&latest_alert).await?;
        let forecasts = forecasts_by_city(
            RawBatch::parse("forecast", &forecast_bytes)?,
            &self.ctx.cities,
        )?;
        let alerts = alerts_by_city(RawBatch::parse("alert", &alert_bytes)?, &self.ctx.cities);
        let records = join(&forecasts, &alerts);

        let ts = clock.timestamp();
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

        let deleted_processed = self.ctx.retention.prune(&processed_prefix).await;
        let deleted_forecast = self.ctx.retention.prune(&forecast_prefix).await;
        let deleted_alert = self.ctx.retention.prune(&alert_prefix).await;

        Ok(json!({
            "message": "Current weather data processed successfully",
            "processed_locations": {
                "json": json_put.url,
                "csv": csv_put.url,
            },
            "cleanup_stats": {
                "deleted_processed_files": deleted_processed,
                "deleted_forecast_files": deleted_forecast,
                "deleted_alert_files": deleted_alert,
            },
            "total_deleted": deleted_processed + deleted_forecast + deleted_alert,
        }))
    }
}
