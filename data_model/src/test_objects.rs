pub mod tests {
    use serde_json::{json, Value};

    fn mock_day(date: &str, condition: &str, max: f64, min: f64) -> Value {
        json!({
            "date": date,
            "day": {
                "maxtemp_c": max,
                "mintemp_c": min,
                "avgtemp_c": (max + min) / 2.0,
                "totalprecip_mm": 0.4,
                "daily_chance_of_rain": 10,
                "condition": {"text": condition},
                "maxwind_kph": 22.3,
                "avghumidity": 55,
                "uv": 6.0
            },
            "hour": [
                {"time": format!("{date} 00:00"), "temp_c": 15.2},
                {"time": format!("{date} 12:00"), "temp_c": 24.5},
                {"time": format!("{date} 18:00"), "temp_c": 20.1}
            ]
        })
    }

    /// Forecast payload shaped like the weather API's `forecast` endpoint,
    /// with three days.
    pub fn mock_forecast(name: &str, region: &str) -> Value {
        json!({
            "location": {
                "name": name,
                "region": region,
                "country": "Australia",
                "lat": -31.93,
                "lon": 115.83,
                "tz_id": "Australia/Perth",
                "localtime": "2024-05-01 06:30"
            },
            "current": {
                "temp_c": 18.0,
                "feelslike_c": 17.4,
                "condition": {"text": "Clear"},
                "wind_kph": 11.2,
                "vis_km": 10.0,
                "uv": 1.0
            },
            "forecast": {
                "forecastday": [
                    mock_day("2024-05-01", "Sunny", 26.1, 12.3),
                    mock_day("2024-05-02", "Partly cloudy", 23.4, 13.0),
                    mock_day("2024-05-03", "Light rain", 19.8, 11.5)
                ]
            }
        })
    }

    /// Alert payload shaped like the weather API's `alerts` endpoint.
    pub fn mock_alerts(name: &str, descriptions: &[&str]) -> Value {
        let alert: Vec<Value> = descriptions
            .iter()
            .map(|d| json!({"headline": "Warning", "description": d}))
            .collect();
        json!({
            "location": {"name": name},
            "alerts": {"alert": alert}
        })
    }
}
