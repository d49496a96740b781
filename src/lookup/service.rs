//! WHOIS lookup service

use crate::domain::DomainNormalizer;
use crate::error::{Result, WhoisError};
use crate::lookup::mass::check_admission;
use crate::lookup::WhoisLookup;
use crate::types::{
    LookupConfig, LookupMetrics, MassLookupOutcome, MetricsSnapshot, TldEntry, WhoisRecord,
};
use crate::whois::{TextParser, WhoisClient, WhoisParser};
use crate::zone::TldRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::Instant;

/// Lookup pipeline: normalize, resolve, query, parse
pub struct WhoisService {
    registry: Arc<TldRegistry>,
    client: WhoisClient,
    parser: Arc<dyn WhoisParser>,
    pub(crate) config: LookupConfig,
    metrics: Arc<LookupMetrics>,
}

impl WhoisService {
    /// Create a service with default configuration
    pub fn new(registry: Arc<TldRegistry>) -> Self {
        Self::with_config(registry, LookupConfig::default())
    }

    /// Create a service with custom configuration
    pub fn with_config(registry: Arc<TldRegistry>, config: LookupConfig) -> Self {
        let client = WhoisClient::with_config(Arc::clone(&registry), &config);
        Self {
            registry,
            client,
            parser: Arc::new(TextParser::new()),
            config,
            metrics: Arc::new(LookupMetrics::new()),
        }
    }

    /// Replace the default text parser
    pub fn with_parser(mut self, parser: Arc<dyn WhoisParser>) -> Self {
        self.parser = parser;
        self
    }

    /// Replace the client built from the configuration
    pub fn with_client(mut self, client: WhoisClient) -> Self {
        self.client = client;
        self
    }

    pub fn config(&self) -> &LookupConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<TldRegistry> {
        &self.registry
    }

    pub fn metrics(&self) -> Arc<LookupMetrics> {
        Arc::clone(&self.metrics)
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Normalize `query` to its root domain
    pub async fn normalize(&self, query: &str) -> Result<String> {
        let index = self.registry.ready().await;
        DomainNormalizer::new(index).normalize(query)
    }

    /// Deadline of one query: the configured budget, capped by `parent`
    pub(crate) fn query_deadline(&self, parent: Option<Instant>) -> Instant {
        let own = Instant::now() + self.config.query_timeout;
        match parent {
            Some(parent) if parent < own => parent,
            _ => own,
        }
    }

    /// Fetch and parse the record of an already normalized root domain
    pub(crate) async fn lookup_root(&self, root: &str, deadline: Instant) -> Result<WhoisRecord> {
        self.metrics.record_started();
        let started = Instant::now();

        let result = self.fetch_record(root, deadline).await;

        match &result {
            Ok(_) => {
                self.metrics.record_success(started.elapsed());
                tracing::debug!(
                    domain = %root,
                    duration_ms = started.elapsed().as_millis() as u64,
                    "WHOIS lookup succeeded"
                );
            }
            Err(e) => {
                self.metrics.record_failure(started.elapsed());
                tracing::debug!(domain = %root, error = %e, "WHOIS lookup failed");
            }
        }

        result
    }

    async fn fetch_record(&self, root: &str, deadline: Instant) -> Result<WhoisRecord> {
        let raw = self.client.query(root, Some(deadline)).await?;
        let text = String::from_utf8_lossy(&raw);

        let record = self.parser.parse(&text).map_err(|e| match e {
            WhoisError::ParseFailed { .. } => e,
            other => WhoisError::parse_failed(other.to_string()),
        })?;

        if !record.is_complete() {
            return Err(WhoisError::incomplete_record(root));
        }

        Ok(record)
    }
}

#[async_trait]
impl WhoisLookup for WhoisService {
    async fn get_available_tlds(&self) -> Vec<TldEntry> {
        self.registry.all_entries().await
    }

    async fn get_whois_data(&self, query: &str, deadline: Option<Instant>) -> Result<WhoisRecord> {
        let root = self.normalize(query).await?;
        let deadline = self.query_deadline(deadline);
        self.lookup_root(&root, deadline).await
    }

    async fn get_raw_whois_data(&self, query: &str, deadline: Option<Instant>) -> Result<String> {
        // a caller deadline is taken as given, even past the query budget
        let deadline = deadline.unwrap_or_else(|| Instant::now() + self.config.query_timeout);
        let raw = self.client.query(query.trim(), Some(deadline)).await?;
        Ok(String::from_utf8_lossy(&raw).into_owned())
    }

    async fn mass_whois_lookup(
        &self,
        queries: &[String],
        deadline: Option<Instant>,
    ) -> Result<Vec<MassLookupOutcome>> {
        check_admission(queries.len(), self.config.max_batch)?;
        Ok(self.lookup_many(queries, deadline).await)
    }
}
