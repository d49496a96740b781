//! Core types and structures for whois-probe

use crate::error::{Result, WhoisError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A top-level zone that can be queried over WHOIS
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TldEntry {
    #[serde(rename = "root_tld")]
    pub root_zone: String,
    #[serde(rename = "sub_tld")]
    pub sub_zones: Vec<String>,
    pub registry_operator: String,
    pub info_url: String,
    pub tags: BTreeSet<String>,
}

/// Structured result of a WHOIS lookup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoisRecord {
    pub domain: Option<WhoisDomain>,
    pub registrar: Option<WhoisContact>,
    pub registrant: Option<WhoisContact>,
}

impl WhoisRecord {
    /// A record is complete once the registry reported a creation date.
    /// Unregistered and pending-delete domains usually parse fine but lack it.
    pub fn is_complete(&self) -> bool {
        self.domain
            .as_ref()
            .map_or(false, |d| d.created_at.is_some())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.domain.as_ref().and_then(|d| d.created_at)
    }
}

/// Domain section of a WHOIS record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WhoisDomain {
    pub id: String,
    pub domain: String,
    pub punycode: String,
    pub name: String,
    pub extension: String,
    pub whois_server: String,
    pub status: Vec<String>,
    pub name_servers: Vec<String>,
    pub dnssec: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// Registrar or registrant contact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisContact {
    pub id: String,
    pub name: String,
    pub organization: String,
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: String,
    pub country: String,
    pub phone: String,
    pub fax: String,
    pub email: String,
    pub referral_url: String,
}

impl WhoisContact {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of one domain inside a mass lookup
#[derive(Debug, Clone)]
pub struct MassLookupOutcome {
    /// The input string exactly as the caller supplied it
    pub domain: String,
    pub record: Option<WhoisRecord>,
    pub error: Option<WhoisError>,
}

impl MassLookupOutcome {
    pub fn success(domain: impl Into<String>, record: WhoisRecord) -> Self {
        Self {
            domain: domain.into(),
            record: Some(record),
            error: None,
        }
    }

    pub fn failure(domain: impl Into<String>, error: WhoisError) -> Self {
        Self {
            domain: domain.into(),
            record: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.record.is_some()
    }
}

/// Configuration for lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    /// Budget of a single query when the caller gives no deadline
    pub query_timeout: Duration,
    /// Overall deadline shared by every domain of a mass lookup
    pub mass_deadline: Duration,
    pub jitter_min: Duration,
    pub jitter_max: Duration,
    /// Queries allowed on the wire at once during a mass lookup
    pub max_in_flight: usize,
    /// Admission cap for a mass lookup
    pub max_batch: usize,
    pub port: u16,
    pub follow_referral: bool,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            query_timeout: Duration::from_secs(15),
            mass_deadline: Duration::from_secs(30),
            jitter_min: Duration::from_millis(10),
            jitter_max: Duration::from_millis(100),
            max_in_flight: 16,
            max_batch: 150,
            port: 43,
            follow_referral: true,
        }
    }
}

impl LookupConfig {
    /// Build a configuration from `WHOIS_*` environment variables,
    /// falling back to defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LookupConfig::from_env`] with an injectable variable source.
    pub fn from_lookup<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64, _>(&get, "WHOIS_QUERY_TIMEOUT_MS")? {
            config.query_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&get, "WHOIS_MASS_DEADLINE_MS")? {
            config.mass_deadline = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&get, "WHOIS_JITTER_MIN_MS")? {
            config.jitter_min = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64, _>(&get, "WHOIS_JITTER_MAX_MS")? {
            config.jitter_max = Duration::from_millis(ms);
        }
        let (jitter_min, jitter_max) = (config.jitter_min, config.jitter_max);
        config = config.with_jitter(jitter_min, jitter_max);
        if let Some(n) = parse_var::<usize, _>(&get, "WHOIS_MAX_IN_FLIGHT")? {
            config = config.with_max_in_flight(n);
        }
        if let Some(n) = parse_var::<usize, _>(&get, "WHOIS_MAX_BATCH")? {
            config.max_batch = n;
        }
        if let Some(port) = parse_var::<u16, _>(&get, "WHOIS_PORT")? {
            config.port = port;
        }
        if let Some(follow) = parse_var::<bool, _>(&get, "WHOIS_FOLLOW_REFERRAL")? {
            config.follow_referral = follow;
        }

        Ok(config)
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn with_mass_deadline(mut self, deadline: Duration) -> Self {
        self.mass_deadline = deadline;
        self
    }

    /// Set the jitter window. Inverted bounds are swapped.
    pub fn with_jitter(mut self, min: Duration, max: Duration) -> Self {
        let (min, max) = if min > max { (max, min) } else { (min, max) };
        self.jitter_min = min;
        self.jitter_max = max;
        self
    }

    /// Caps in-flight queries at 1..=150.
    pub fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n.clamp(1, 150);
        self
    }

    pub fn with_max_batch(mut self, n: usize) -> Self {
        self.max_batch = n;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_follow_referral(mut self, enabled: bool) -> Self {
        self.follow_referral = enabled;
        self
    }
}

fn parse_var<T, F>(get: &F, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| WhoisError::config(format!("{key}={raw}: {e}"))),
        _ => Ok(None),
    }
}

/// Lookup counters shared by a service and its callers
#[derive(Debug, Default)]
pub struct LookupMetrics {
    lookups_started: AtomicU64,
    lookups_succeeded: AtomicU64,
    lookups_failed: AtomicU64,
    total_query_ms: AtomicU64,
}

impl LookupMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_started(&self) {
        self.lookups_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, elapsed: Duration) {
        self.lookups_succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_query_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn record_failure(&self, elapsed: Duration) {
        self.lookups_failed.fetch_add(1, Ordering::Relaxed);
        self.total_query_ms
            .fetch_add(elapsed.as_millis() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let succeeded = self.lookups_succeeded.load(Ordering::Relaxed);
        let failed = self.lookups_failed.load(Ordering::Relaxed);
        let total_ms = self.total_query_ms.load(Ordering::Relaxed);
        let finished = succeeded + failed;

        MetricsSnapshot {
            lookups_started: self.lookups_started.load(Ordering::Relaxed),
            lookups_succeeded: succeeded,
            lookups_failed: failed,
            avg_query_ms: if finished == 0 { 0 } else { total_ms / finished },
        }
    }
}

/// Point-in-time copy of [`LookupMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub lookups_started: u64,
    pub lookups_succeeded: u64,
    pub lookups_failed: u64,
    pub avg_query_ms: u64,
}
