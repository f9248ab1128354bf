//! Documents as returned by the weather API and persisted as raw objects.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use tracing::warn;

use crate::city::CityCatalog;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Condition {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceLocation {
    pub name: String,
    pub region: String,
    pub country: String,
    pub lat: Number,
    pub lon: Number,
    pub tz_id: String,
    pub localtime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceCurrent {
    pub temp_c: Number,
    pub feelslike_c: Number,
    pub condition: Condition,
    pub wind_kph: Number,
    pub vis_km: Number,
    pub uv: Number,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceDay {
    pub maxtemp_c: Number,
    pub mintemp_c: Number,
    pub avgtemp_c: Number,
    pub totalprecip_mm: Number,
    pub daily_chance_of_rain: Number,
    pub condition: Condition,
    pub maxwind_kph: Number,
    pub avghumidity: Number,
    pub uv: Number,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceHour {
    /// `YYYY-MM-DD HH:MM`
    pub time: String,
    pub temp_c: Number,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceForecastDay {
    pub date: String,
    pub day: SourceDay,
    #[serde(default)]
    pub hour: Vec<SourceHour>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceForecastDays {
    pub forecastday: Vec<SourceForecastDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceForecast {
    pub location: SourceLocation,
    pub current: SourceCurrent,
    pub forecast: SourceForecastDays,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertEntry {
    #[serde(default, alias = "desc")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertList {
    #[serde(default)]
    pub alert: Option<Vec<AlertEntry>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertLocation {
    pub name: String,
}

/// Alert payload for one city. Ingestion stores `{city, error}` in place of
/// a payload it failed to fetch; that shape parses here with no alerts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SourceAlerts {
    #[serde(default)]
    pub location: Option<AlertLocation>,
    #[serde(default)]
    pub alerts: Option<AlertList>,
    #[serde(default)]
    pub city: Option<String>,
    /// Ingestion's fetch error, or the API's own `{code, message}` error body.
    #[serde(default)]
    pub error: Option<Value>,
}

impl SourceAlerts {
    pub fn placeholder(city: &str, error: &str) -> Self {
        Self {
            city: Some(city.to_string()),
            error: Some(Value::String(error.to_string())),
            ..Default::default()
        }
    }

    pub fn descriptions(&self) -> Vec<&str> {
        self.alerts
            .as_ref()
            .and_then(|a| a.alert.as_ref())
            .map(|alerts| {
                alerts
                    .iter()
                    .map(|a| a.description.as_deref().unwrap_or(""))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn city_name(&self) -> Option<&str> {
        self.location
            .as_ref()
            .map(|l| l.name.as_str())
            .or(self.city.as_deref())
    }
}

/// Contents of a raw blob: either a list of per-city documents or a
/// mapping of them. Any other JSON shape is rejected.
#[derive(Debug, Clone)]
pub enum RawBatch {
    List(Vec<Value>),
    Map(Map<String, Value>),
}

impl RawBatch {
    pub fn parse(kind: &str, bytes: &[u8]) -> Result<Self> {
        let value: Value = serde_json::from_slice(bytes)
            .with_context(|| format!("raw {kind} object is not valid JSON"))?;
        Self::from_value(kind, value)
    }

    pub fn from_value(kind: &str, value: Value) -> Result<Self> {
        match value {
            Value::Array(items) => Ok(RawBatch::List(items)),
            Value::Object(map) => Ok(RawBatch::Map(map)),
            _ => Err(anyhow!("Unexpected {kind} data format")),
        }
    }

    fn into_entries(self) -> Vec<(Option<String>, Value)> {
        match self {
            RawBatch::List(items) => items.into_iter().map(|v| (None, v)).collect(),
            RawBatch::Map(map) => map.into_iter().map(|(k, v)| (Some(k), v)).collect(),
        }
    }
}

/// Documents keyed by canonical city key, in first-seen order. A repeated
/// key replaces the earlier document without moving it.
#[derive(Debug, Clone)]
pub struct CityBatch<T> {
    entries: Vec<(String, T)>,
}

impl<T> Default for CityBatch<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> CityBatch<T> {
    pub fn insert(&mut self, key: String, doc: T) {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = doc,
            None => self.entries.push((key, doc)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &T)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Re-keys forecast documents by the city key derived from their location
/// name. Mapping keys, if any, are discarded.
pub fn forecasts_by_city(
    batch: RawBatch,
    cities: &CityCatalog,
) -> Result<CityBatch<SourceForecast>> {
    let mut out = CityBatch::default();
    for (index, (_, value)) in batch.into_entries().into_iter().enumerate() {
        let doc: SourceForecast = serde_json::from_value(value)
            .with_context(|| format!("malformed forecast document at position {index}"))?;
        out.insert(cities.normalize(&doc.location.name), doc);
    }
    Ok(out)
}

/// Re-keys alert documents by location name, falling back to the
/// placeholder's `city` and then to the mapping key. Alerts are best effort:
/// documents that don't parse or name no city are skipped, and those cities
/// render as having no alerts.
pub fn alerts_by_city(batch: RawBatch, cities: &CityCatalog) -> CityBatch<SourceAlerts> {
    let mut out = CityBatch::default();
    for (index, (map_key, value)) in batch.into_entries().into_iter().enumerate() {
        let doc: SourceAlerts = match serde_json::from_value(value) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(position = index, "skipping malformed alert document: {}", e);
                continue;
            }
        };
        let Some(name) = doc.city_name().map(str::to_string).or(map_key) else {
            warn!(position = index, "skipping alert document without a city");
            continue;
        };
        out.insert(cities.normalize(&name), doc);
    }
    out
}
