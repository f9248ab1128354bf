//! Object key layout shared by all pipelines.

pub fn raw_forecast_prefix(date: &str) -> String {
    format!("to_be_processed/forecast/{}/", date)
}

pub fn raw_alert_prefix(date: &str) -> String {
    format!("to_be_processed/alert/{}/", date)
}

pub fn current_weather_prefix(date: &str) -> String {
    format!("processed/current_weather/{}/", date)
}

pub fn city_forecast_prefix(city: &str, date: &str) -> String {
    format!("processed/{}_forecast/{}/", city, date)
}

/// `{prefix}{name}_{timestamp}.{extension}`
pub fn object_key(prefix: &str, name: &str, timestamp: &str, extension: &str) -> String {
    format!("{}{}_{}.{}", prefix, name, timestamp, extension)
}
