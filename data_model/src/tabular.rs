//! Fixed CSV projections. Column order is part of the output contract.

use anyhow::{Context, Result};
use serde_json::Number;

use crate::{current_weather::CurrentWeatherRecord, forecast::ForecastSummary};

pub const CURRENT_WEATHER_HEADER: [&str; 12] = [
    "City",
    "State",
    "Local_time",
    "Current_temp_(C)",
    "Feels_like_(C)",
    "Current_Weather",
    "Latitude",
    "Longitude",
    "Wind_kph",
    "Visibility_(km)",
    "UV_index",
    "Alerts",
];

pub const LOCATION_HEADER: [&str; 6] = [
    "Location",
    "Region",
    "Country",
    "Latitude",
    "Longitude",
    "Time Zone",
];

pub const FORECAST_HEADER: [&str; 11] = [
    "Date",
    "Max Temp (C)",
    "Min Temp (C)",
    "Avg Temp (C)",
    "Total Precip (mm)",
    "Chance of Rain",
    "Condition",
    "Max Wind (kph)",
    "Avg Humidity",
    "UV Index",
    "Hourly Temperatures (JSON)",
];

#[derive(Debug, Clone, PartialEq)]
pub struct ForecastCsv {
    pub location: String,
    pub forecast: String,
}

fn writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("unable to flush csv writer: {}", e))?;
    String::from_utf8(bytes).context("csv output is not utf-8")
}

fn num(n: &Number) -> String {
    n.to_string()
}

/// One row per record under the fixed 12-column header. The header is
/// written even when there are no records.
pub fn current_weather_csv(records: &[CurrentWeatherRecord]) -> Result<String> {
    let mut w = writer();
    w.write_record(CURRENT_WEATHER_HEADER)?;
    for record in records {
        w.serialize(record)?;
    }
    finish(w)
}

pub fn location_csv(summary: &ForecastSummary) -> Result<String> {
    let location = &summary.location;
    let mut w = writer();
    w.write_record(LOCATION_HEADER)?;
    w.write_record([
        location.name.clone(),
        location.region.clone(),
        location.country.clone(),
        num(&location.lat),
        num(&location.lon),
        location.tz_id.clone(),
    ])?;
    finish(w)
}

/// One row per forecast day; the last cell holds the hourly mapping as JSON.
pub fn forecast_days_csv(summary: &ForecastSummary) -> Result<String> {
    let mut w = writer();
    w.write_record(FORECAST_HEADER)?;
    for day in &summary.forecast_days {
        let s = &day.daily_summary;
        w.write_record([
            day.date.clone(),
            num(&s.max_temp_c),
            num(&s.min_temp_c),
            num(&s.avg_temp_c),
            num(&s.total_precip_mm),
            num(&s.chance_of_rain),
            s.condition.clone(),
            num(&s.max_wind_kph),
            num(&s.avg_humidity),
            num(&s.uv_index),
            serde_json::to_string(&day.hourly_temperatures)?,
        ])?;
    }
    finish(w)
}

pub fn forecast_csv(summary: &ForecastSummary) -> Result<ForecastCsv> {
    Ok(ForecastCsv {
        location: location_csv(summary)?,
        forecast: forecast_days_csv(summary)?,
    })
}
