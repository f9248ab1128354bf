use std::env;

use anyhow::{anyhow, Result};
use blob_store::{BlobStorageConfig, S3Config};
use data_model::CityCatalog;
use figment::{
    providers::{Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_BUCKET: &str = "weather-data-opem-weather-api";
pub const DEFAULT_API_HOST: &str = "weatherapi-com.p.rapidapi.com";
pub const DEFAULT_API_KEY_ENV: &str = "API_KEY";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Export spans over OTLP.
    #[serde(default)]
    pub enable_tracing: bool,
    /// OTLP collector endpoint; the exporter default is used when unset.
    #[serde(default)]
    pub endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeatherApiConfig {
    pub host: String,
    /// Overrides `https://{host}`, for proxies and local fakes.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_api_key_env() -> String {
    DEFAULT_API_KEY_ENV.to_string()
}

impl Default for WeatherApiConfig {
    fn default() -> Self {
        WeatherApiConfig {
            host: DEFAULT_API_HOST.to_string(),
            base_url: None,
            api_key_env: default_api_key_env(),
        }
    }
}

impl WeatherApiConfig {
    pub fn base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| format!("https://{}", self.host))
    }

    pub fn api_key(&self) -> Result<String> {
        env::var(&self.api_key_env)
            .map_err(|_| anyhow!("environment variable {} is not set", self.api_key_env))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub structured_logging: bool,
    pub blob_storage: BlobStorageConfig,
    #[serde(default)]
    pub weather_api: WeatherApiConfig,
    #[serde(default)]
    pub cities: CityCatalog,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            structured_logging: false,
            blob_storage: BlobStorageConfig {
                s3: Some(S3Config {
                    bucket: DEFAULT_BUCKET.to_string(),
                    region: env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
                }),
                disk: None,
            },
            weather_api: Default::default(),
            cities: Default::default(),
            telemetry: Default::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_path(path: &str) -> Result<PipelineConfig> {
        let config_str = std::fs::read_to_string(path)?;
        Self::from_yaml(&config_str)
    }

    pub fn from_yaml(config_str: &str) -> Result<PipelineConfig> {
        let config: PipelineConfig = Figment::new().merge(Yaml::string(config_str)).extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.blob_storage.s3.is_some() && self.blob_storage.disk.is_some() {
            return Err(anyhow!("cannot specify both s3 and disk blob storage"));
        }
        if self.blob_storage.s3.is_none() && self.blob_storage.disk.is_none() {
            return Err(anyhow!("must specify one of s3 or disk blob storage"));
        }
        if self.cities.is_empty() {
            return Err(anyhow!("at least one city must be configured"));
        }
        if self.weather_api.host.is_empty() {
            return Err(anyhow!("weather_api.host must not be empty"));
        }
        Ok(())
    }
}
