//! Lookup facade over the registry, client and parser

pub mod mass;
pub mod service;

pub use service::WhoisService;

use crate::error::Result;
use crate::types::{MassLookupOutcome, TldEntry, WhoisRecord};
use async_trait::async_trait;
use tokio::time::Instant;

/// Operations exposed to transport layers
#[async_trait]
pub trait WhoisLookup: Send + Sync {
    /// Every queryable top-level zone
    async fn get_available_tlds(&self) -> Vec<TldEntry>;

    /// Normalize `query`, fetch and parse its record.
    ///
    /// Fails with `IncompleteRecord` when the reply carries no creation date.
    async fn get_whois_data(&self, query: &str, deadline: Option<Instant>) -> Result<WhoisRecord>;

    /// Unparsed reply for `query`, sent as given apart from trimming
    async fn get_raw_whois_data(&self, query: &str, deadline: Option<Instant>) -> Result<String>;

    /// Look up every query concurrently. Only admission can fail; per-domain
    /// failures are reported inside the outcomes.
    async fn mass_whois_lookup(
        &self,
        queries: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<MassLookupOutcome>>;
}
