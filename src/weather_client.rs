use std::fmt;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::WeatherApiConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Forecast,
    Alerts,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Forecast => "forecast",
            Endpoint::Alerts => "alerts",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of per-city weather payloads.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch(&self, city: &str, endpoint: Endpoint) -> Result<Value>;
}

pub struct HttpWeatherSource {
    client: reqwest::Client,
    base_url: String,
    host: String,
    api_key: String,
}

impl HttpWeatherSource {
    /// Reads the API key from the environment once, at construction.
    pub fn new(config: &WeatherApiConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            base_url: config.base_url().trim_end_matches('/').to_string(),
            host: config.host.clone(),
            api_key: config.api_key()?,
        })
    }

    fn url(&self, endpoint: Endpoint) -> String {
        format!("{}/{}.json", self.base_url, endpoint)
    }
}

#[async_trait]
impl WeatherSource for HttpWeatherSource {
    async fn fetch(&self, city: &str, endpoint: Endpoint) -> Result<Value> {
        let url = self.url(endpoint);
        debug!(city, %endpoint, %url, "fetching weather data");
        let response = self
            .client
            .get(&url)
            .query(&[("q", city)])
            .header("x-rapidapi-key", &self.api_key)
            .header("x-rapidapi-host", &self.host)
            .send()
            .await
            .map_err(|e| anyhow!("request to {} for {} failed: {}", url, city, e))?
            .error_for_status()
            .map_err(|e| anyhow!("{} for {} returned an error: {}", endpoint, city, e))?;
        let body = response
            .json::<Value>()
            .await
            .map_err(|e| anyhow!("unable to decode {} for {}: {}", endpoint, city, e))?;
        Ok(body)
    }
}
