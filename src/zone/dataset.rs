//! Static zone dataset.
//!
//! The bundled table lives in `data/zones.json` and is compiled into the
//! binary. It lists every top-level zone of the root, so any real TLD passes
//! normalization; zones without a WHOIS server are reached through the IANA
//! referral. It is refreshed out-of-band when registries change; nothing
//! here fetches zone data at runtime.

use crate::error::{Result, WhoisError};
use serde::{Deserialize, Serialize};
use std::path::Path;

const BUNDLED_ZONES: &str = include_str!("../../data/zones.json");

/// A versioned table of zones
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDataset {
    pub version: String,
    pub zones: Vec<Zone>,
}

/// One zone of the dataset (a TLD or a delegated sub-zone such as `co.uk`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub domain: String,
    #[serde(default)]
    pub registry_operator: String,
    #[serde(default)]
    pub info_url: String,
    #[serde(default)]
    pub whois_server: Option<String>,
    #[serde(default)]
    pub whois_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub name_servers: Vec<String>,
    #[serde(default)]
    pub subdomains: Vec<String>,
}

impl Zone {
    /// Bare WHOIS hostname, if the zone publishes one
    pub fn whois_server(&self) -> Option<&str> {
        non_empty(self.whois_server.as_deref())
    }

    /// HTTP(S) WHOIS URL, if the zone publishes one
    pub fn whois_url(&self) -> Option<&str> {
        non_empty(self.whois_url.as_deref())
    }

    pub fn is_top_level(&self) -> bool {
        !self.domain.contains('.')
    }

    /// Has a WHOIS server and is actually delegated
    pub fn is_queryable(&self) -> bool {
        self.whois_server().is_some() && !self.name_servers.is_empty()
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl ZoneDataset {
    /// The dataset compiled into this crate
    pub fn bundled() -> Result<Self> {
        Self::from_json(BUNDLED_ZONES)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| WhoisError::config(format!("invalid zone dataset: {}", e)))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            WhoisError::config(format!("cannot read zone dataset {}: {}", path.display(), e))
        })?;
        Self::from_json(&content)
    }

    /// Build a dataset in code
    pub fn new(version: impl Into<String>, zones: Vec<Zone>) -> Self {
        Self {
            version: version.into(),
            zones,
        }
    }
}
