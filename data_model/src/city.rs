use serde::{Deserialize, Serialize};

pub const DEFAULT_CITIES: [&str; 5] = ["Perth", "Melbourne", "Sydney", "Brisbane", "Adelaide"];

/// The configured set of cities, in fetch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CityCatalog {
    names: Vec<String>,
}

impl Default for CityCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CITIES)
    }
}

impl CityCatalog {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Names as configured, used when querying the weather API.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Maps a source-provided location name to a stable city key.
    ///
    /// The first configured city whose lower-cased name is a substring of
    /// the lower-cased location wins. Unknown locations keep their
    /// lower-cased name with spaces replaced by underscores.
    pub fn normalize(&self, location_name: &str) -> String {
        let name = location_name.to_lowercase();
        self.names
            .iter()
            .map(|c| c.to_lowercase())
            .find(|c| name.contains(c.as_str()))
            .unwrap_or_else(|| name.replace(' ', "_"))
    }
}
