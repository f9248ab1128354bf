use anyhow::{anyhow, Result};
use pipeline_utils::RunClock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

use crate::source::{SourceForecast, SourceForecastDay, SourceLocation};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationSummary {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: Number,
    pub lon: Number,
    pub tz_id: String,
}

impl From<&SourceLocation> for LocationSummary {
    fn from(location: &SourceLocation) -> Self {
        Self {
            name: location.name.clone(),
            region: location.region.clone(),
            country: location.country.clone(),
            lat: location.lat.clone(),
            lon: location.lon.clone(),
            tz_id: location.tz_id.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DailySummary {
    pub max_temp_c: Number,
    pub min_temp_c: Number,
    pub avg_temp_c: Number,
    pub total_precip_mm: Number,
    pub chance_of_rain: Number,
    pub condition: String,
    pub max_wind_kph: Number,
    pub avg_humidity: Number,
    pub uv_index: Number,
}

/// Hour-of-day label (`HH:MM`) to temperature, in source order.
pub type HourlyTemperatures = Map<String, Value>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastDay {
    pub date: String,
    pub daily_summary: DailySummary,
    pub hourly_temperatures: HourlyTemperatures,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastSummary {
    pub location: LocationSummary,
    pub forecast_days: Vec<ForecastDay>,
    pub last_processed: String,
}

fn hour_label(time: &str) -> Result<&str> {
    time.split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow!("hourly time {:?} has no time-of-day part", time))
}

fn reshape_day(day: &SourceForecastDay) -> Result<ForecastDay> {
    let mut hourly_temperatures = HourlyTemperatures::new();
    for hour in &day.hour {
        hourly_temperatures.insert(
            hour_label(&hour.time)?.to_string(),
            Value::Number(hour.temp_c.clone()),
        );
    }
    let d = &day.day;
    Ok(ForecastDay {
        date: day.date.clone(),
        daily_summary: DailySummary {
            max_temp_c: d.maxtemp_c.clone(),
            min_temp_c: d.mintemp_c.clone(),
            avg_temp_c: d.avgtemp_c.clone(),
            total_precip_mm: d.totalprecip_mm.clone(),
            chance_of_rain: d.daily_chance_of_rain.clone(),
            condition: d.condition.text.clone(),
            max_wind_kph: d.maxwind_kph.clone(),
            avg_humidity: d.avghumidity.clone(),
            uv_index: d.uv.clone(),
        },
        hourly_temperatures,
    })
}

/// Restructures one city's forecast into its summary document, keeping the
/// source's day order.
pub fn reshape(source: &SourceForecast, clock: &RunClock) -> Result<ForecastSummary> {
    let forecast_days = source
        .forecast
        .forecastday
        .iter()
        .map(reshape_day)
        .collect::<Result<Vec<_>>>()?;
    Ok(ForecastSummary {
        location: LocationSummary::from(&source.location),
        forecast_days,
        last_processed: clock.iso(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::test_objects::tests::mock_forecast;

    fn clock() -> RunClock {
        RunClock::at(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(6, 30, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_reshape() {
        let source: SourceForecast =
            serde_json::from_value(mock_forecast("Perth", "Western Australia")).unwrap();
        let summary = reshape(&source, &clock()).unwrap();

        assert_eq!(summary.location.name, "Perth");
        assert_eq!(summary.location.tz_id, "Australia/Perth");
        assert_eq!(summary.last_processed, "2024-05-01T06:30:00");
        let dates: Vec<_> = summary.forecast_days.iter().map(|d| d.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-05-01", "2024-05-02", "2024-05-03"]);

        let first = &summary.forecast_days[0];
        assert_eq!(first.daily_summary.condition, "Sunny");
        assert_eq!(first.daily_summary.chance_of_rain, Number::from(10));
        assert_eq!(first.hourly_temperatures.len(), 3);
        assert_eq!(
            first.hourly_temperatures.get("12:00"),
            Some(&json!(24.5))
        );
    }

    #[test]
    fn test_reshape_serializes_expected_shape() {
        let source: SourceForecast =
            serde_json::from_value(mock_forecast("Perth", "Western Australia")).unwrap();
        let value = serde_json::to_value(reshape(&source, &clock()).unwrap()).unwrap();
        assert_eq!(value["forecast_days"][0]["daily_summary"]["uv_index"], json!(6.0));
        assert_eq!(value["forecast_days"][0]["hourly_temperatures"]["00:00"], json!(15.2));
        assert!(value["location"].get("localtime").is_none());
    }

    #[test]
    fn test_reshape_rejects_time_without_hour() {
        let mut value = mock_forecast("Perth", "Western Australia");
        value["forecast"]["forecastday"][0]["hour"][0]["time"] = json!("2024-05-01");
        let source: SourceForecast = serde_json::from_value(value).unwrap();
        assert!(reshape(&source, &clock()).is_err());
    }

    #[test]
    fn test_reshape_keeps_hour_order() {
        let mut value = mock_forecast("Perth", "Western Australia");
        value["forecast"]["forecastday"][0]["hour"] = json!([
            {"time": "2024-05-01 18:00", "temp_c": 20.1},
            {"time": "2024-05-01 00:00", "temp_c": 15.2},
            {"time": "2024-05-01 12:00", "temp_c": 24},
        ]);
        let source: SourceForecast = serde_json::from_value(value).unwrap();
        let summary = reshape(&source, &clock()).unwrap();

        let hourly = &summary.forecast_days[0].hourly_temperatures;
        let labels: Vec<_> = hourly.keys().map(String::as_str).collect();
        assert_eq!(labels, vec!["18:00", "00:00", "12:00"]);
        assert_eq!(
            serde_json::to_string(hourly).unwrap(),
            r#"{"18:00":20.1,"00:00":15.2,"12:00":24}"#
        );
    }
}
