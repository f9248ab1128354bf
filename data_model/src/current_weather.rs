use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::source::{CityBatch, SourceAlerts, SourceForecast};

pub const NO_ALERTS: &str = "No alerts";
pub const ALERT_SEPARATOR: &str = " | ";

/// One flattened row of current conditions per city.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentWeatherRecord {
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "State")]
    pub state: String,
    #[serde(rename = "Local_time")]
    pub local_time: String,
    #[serde(rename = "Current_temp_(C)")]
    pub current_temp_c: Number,
    #[serde(rename = "Feels_like_(C)")]
    pub feels_like_c: Number,
    #[serde(rename = "Current_Weather")]
    pub current_weather: String,
    #[serde(rename = "Latitude")]
    pub latitude: Number,
    #[serde(rename = "Longitude")]
    pub longitude: Number,
    #[serde(rename = "Wind_kph")]
    pub wind_kph: Number,
    #[serde(rename = "Visibility_(km)")]
    pub visibility_km: Number,
    #[serde(rename = "UV_index")]
    pub uv_index: Number,
    #[serde(rename = "Alerts")]
    pub alerts: String,
}

impl CurrentWeatherRecord {
    pub fn new(forecast: &SourceForecast, alerts: String) -> Self {
        let location = &forecast.location;
        let current = &forecast.current;
        Self {
            city: location.name.clone(),
            state: location.region.clone(),
            local_time: location.localtime.clone(),
            current_temp_c: current.temp_c.clone(),
            feels_like_c: current.feelslike_c.clone(),
            current_weather: current.condition.text.clone(),
            latitude: location.lat.clone(),
            longitude: location.lon.clone(),
            wind_kph: current.wind_kph.clone(),
            visibility_km: current.vis_km.clone(),
            uv_index: current.uv.clone(),
            alerts,
        }
    }
}

/// Pipe-joined alert descriptions, or `"No alerts"` when the city has no
/// alert document or an empty alert list.
pub fn render_alerts(alerts: Option<&SourceAlerts>) -> String {
    let descriptions = alerts.map(SourceAlerts::descriptions).unwrap_or_default();
    if descriptions.is_empty() {
        return NO_ALERTS.to_string();
    }
    descriptions.join(ALERT_SEPARATOR)
}

/// Joins forecasts and alerts on the city key, in forecast order.
pub fn join(
    forecasts: &CityBatch<SourceForecast>,
    alerts: &CityBatch<SourceAlerts>,
) -> Vec<CurrentWeatherRecord> {
    forecasts
        .iter()
        .map(|(city, forecast)| CurrentWeatherRecord::new(forecast, render_alerts(alerts.get(city))))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        city::CityCatalog,
        source::{alerts_by_city, forecasts_by_city, RawBatch},
        test_objects::tests::{mock_alerts, mock_forecast},
    };

    fn forecasts() -> CityBatch<SourceForecast> {
        let batch = RawBatch::List(vec![
            mock_forecast("Perth", "Western Australia"),
            mock_forecast("Brisbane", "Queensland"),
            mock_forecast("Sydney", "New South Wales"),
        ]);
        forecasts_by_city(batch, &CityCatalog::default()).unwrap()
    }

    #[test]
    fn test_render_alerts() {
        assert_eq!(render_alerts(None), NO_ALERTS);
        assert_eq!(render_alerts(Some(&SourceAlerts::default())), NO_ALERTS);

        let empty: SourceAlerts = serde_json::from_value(mock_alerts("Perth", &[])).unwrap();
        assert_eq!(render_alerts(Some(&empty)), NO_ALERTS);

        let two: SourceAlerts =
            serde_json::from_value(mock_alerts("Perth", &["Heat", "Fire danger"])).unwrap();
        assert_eq!(render_alerts(Some(&two)), "Heat | Fire danger");

        let missing_description: SourceAlerts =
            serde_json::from_value(json!({"alerts": {"alert": [{"headline": "x"}]}})).unwrap();
        assert_eq!(render_alerts(Some(&missing_description)), "");
    }

    #[test]
    fn test_join_defaults_to_no_alerts() {
        let alerts = alerts_by_city(
            RawBatch::List(vec![
                mock_alerts("Brisbane", &["Severe thunderstorm"]),
                mock_alerts("Sydney", &[]),
            ]),
            &CityCatalog::default(),
        );

        let records = join(&forecasts(), &alerts);
        let rendered: Vec<_> = records
            .iter()
            .map(|r| (r.city.as_str(), r.alerts.as_str()))
            .collect();
        assert_eq!(
            rendered,
            vec![
                ("Perth", NO_ALERTS),
                ("Brisbane", "Severe thunderstorm"),
                ("Sydney", NO_ALERTS),
            ]
        );
        assert_eq!(records[1].state, "Queensland");
        assert_eq!(records[1].current_weather, "Clear");
    }

    #[test]
    fn test_record_serializes_with_column_names() {
        let records = join(&forecasts(), &CityBatch::default());
        let value = serde_json::to_value(&records[0]).unwrap();
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, crate::tabular::CURRENT_WEATHER_HEADER.to_vec());
        assert_eq!(value["Current_temp_(C)"], json!(18.0));
    }
}
