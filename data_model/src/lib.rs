pub mod city;
pub mod current_weather;
pub mod forecast;
pub mod source;
pub mod tabular;
pub mod test_objects;

pub use city::CityCatalog;
pub use current_weather::{join, render_alerts, CurrentWeatherRecord, NO_ALERTS};
pub use forecast::{reshape, ForecastSummary};
pub use source::{
    alerts_by_city,
    forecasts_by_city,
    CityBatch,
    RawBatch,
    SourceAlerts,
    SourceForecast,
};
pub use tabular::{current_weather_csv, forecast_csv, ForecastCsv};
