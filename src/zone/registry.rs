//! TLD registry: a read-only index over the zone dataset, built once per
//! handle behind an initialization barrier.

use crate::types::TldEntry;
use crate::zone::dataset::{Zone, ZoneDataset};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::OnceCell;

/// Lookup structure built from a [`ZoneDataset`]
#[derive(Debug, Default)]
pub struct ZoneIndex {
    version: String,
    zones: HashMap<String, Zone>,
    entries: Vec<TldEntry>,
}

impl ZoneIndex {
    /// Index every zone and derive the queryable top-level entries.
    ///
    /// Duplicate zone names keep their first occurrence. Zones without a
    /// WHOIS server or without published name servers never become entries;
    /// they stay resolvable so callers get a precise error for them.
    pub fn build(dataset: &ZoneDataset) -> Self {
        let mut zones: HashMap<String, Zone> = HashMap::with_capacity(dataset.zones.len());

        for zone in &dataset.zones {
            let key = zone.domain.trim().trim_matches('.').to_lowercase();
            if key.is_empty() {
                continue;
            }
            if zones.contains_key(&key) {
                tracing::debug!(zone = %key, "Duplicate zone in dataset ignored");
                continue;
            }
            let mut zone = zone.clone();
            zone.domain = key.clone();
            zones.insert(key, zone);
        }

        let mut entries: Vec<TldEntry> = zones
            .values()
            .filter(|z| z.is_top_level() && z.is_queryable())
            .map(|z| TldEntry {
                root_zone: z.domain.clone(),
                sub_zones: z.subdomains.iter().map(|s| s.to_lowercase()).collect(),
                registry_operator: z.registry_operator.clone(),
                info_url: z.info_url.clone(),
                tags: z
                    .tags
                    .iter()
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect::<BTreeSet<_>>(),
            })
            .collect();
        entries.sort_by(|a, b| a.root_zone.cmp(&b.root_zone));

        Self {
            version: dataset.version.clone(),
            zones,
            entries,
        }
    }

    /// Queryable top-level zones, sorted by name
    pub fn entries(&self) -> &[TldEntry] {
        &self.entries
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Exact zone lookup
    pub fn zone(&self, name: &str) -> Option<&Zone> {
        self.zones.get(name)
    }

    /// Longest zone that `domain` falls under (`a.example.co.uk` → `co.uk`).
    pub fn zone_for(&self, domain: &str) -> Option<&Zone> {
        let domain = domain.trim().trim_end_matches('.').to_lowercase();
        let mut candidate = domain.as_str();

        loop {
            if let Some(zone) = self.zones.get(candidate) {
                return Some(zone);
            }
            match candidate.split_once('.') {
                Some((_, rest)) if !rest.is_empty() => candidate = rest,
                _ => return None,
            }
        }
    }

    /// Whether `tld` is a top-level zone of the dataset
    pub fn is_known_tld(&self, tld: &str) -> bool {
        !tld.contains('.') && self.zones.contains_key(tld)
    }
}

enum DatasetSource {
    Bundled,
    Provided(ZoneDataset),
}

/// Handle over the zone index.
///
/// Construct one at process start and share it (behind an `Arc`) with the
/// components that need it. The index is built on the first call to
/// [`TldRegistry::initialize`] or [`TldRegistry::ready`]; concurrent callers
/// all wait for that single build and never observe a partial index.
pub struct TldRegistry {
    source: DatasetSource,
    index: OnceCell<ZoneIndex>,
}

impl TldRegistry {
    /// Registry over the bundled dataset
    pub fn bundled() -> Self {
        Self {
            source: DatasetSource::Bundled,
            index: OnceCell::new(),
        }
    }

    /// Registry over a caller-supplied dataset
    pub fn from_dataset(dataset: ZoneDataset) -> Self {
        Self {
            source: DatasetSource::Provided(dataset),
            index: OnceCell::new(),
        }
    }

    /// Build the index. Calling this again, or concurrently, is a no-op.
    pub async fn initialize(&self) {
        self.ready().await;
    }

    /// Wait for the index, building it if nobody has yet
    pub async fn ready(&self) -> &ZoneIndex {
        self.index.get_or_init(|| async { self.build() }).await
    }

    pub fn is_ready(&self) -> bool {
        self.index.initialized()
    }

    /// Every queryable top-level zone
    pub async fn all_entries(&self) -> Vec<TldEntry> {
        self.ready().await.entries().to_vec()
    }

    fn build(&self) -> ZoneIndex {
        let index = match &self.source {
            DatasetSource::Provided(dataset) => ZoneIndex::build(dataset),
            DatasetSource::Bundled => match ZoneDataset::bundled() {
                Ok(dataset) => ZoneIndex::build(&dataset),
                Err(e) => {
                    tracing::error!(error = %e, "Bundled zone dataset failed to decode");
                    ZoneIndex::default()
                }
            },
        };

        tracing::info!(
            version = %index.version(),
            zones = index.zone_count(),
            entries = index.entries().len(),
            "Zone registry initialized"
        );

        index
    }
}

impl Default for TldRegistry {
    fn default() -> Self {
        Self::bundled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn zone(domain: &str, whois: Option<&str>, ns: &[&str]) -> Zone {
        Zone {
            domain: domain.to_string(),
            whois_server: whois.map(str::to_string),
            name_servers: ns.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn sample() -> ZoneDataset {
        let mut uk = zone("uk", Some("whois.nic.uk"), &["dns1.nic.uk"]);
        uk.subdomains = vec!["co.uk".to_string(), "org.uk".to_string()];
        uk.tags = vec!["country".to_string(), "geographic".to_string(), "".to_string()];

        ZoneDataset::new(
            "test",
            vec![
                zone("com", Some("whois.verisign-grs.com"), &["a.gtld-servers.net"]),
                uk,
                zone("co.uk", Some("whois.nic.uk"), &["dns1.nic.uk"]),
                zone("gr", None, &["grdns.ics.forth.gr"]),
                zone("zr", Some("whois.nic.zr"), &[]),
                zone("com", Some("whois.duplicate.example"), &["x.example"]),
            ],
        )
    }

    #[test]
    fn test_entries_exclude_unqueryable_zones() {
        let index = ZoneIndex::build(&sample());
        let roots: Vec<&str> = index.entries().iter().map(|e| e.root_zone.as_str()).collect();
        assert_eq!(roots, vec!["com", "uk"]);
    }

    #[test]
    fn test_entry_fields() {
        let index = ZoneIndex::build(&sample());
        let uk = index.entries().iter().find(|e| e.root_zone == "uk").unwrap();
        assert_eq!(uk.sub_zones, vec!["co.uk", "org.uk"]);
        assert_eq!(uk.tags.len(), 2);
        assert!(uk.tags.contains("country"));
    }

    #[test]
    fn test_duplicate_zone_keeps_first() {
        let index = ZoneIndex::build(&sample());
        assert_eq!(
            index.zone("com").and_then(|z| z.whois_server()),
            Some("whois.verisign-grs.com")
        );
    }

    #[test]
    fn test_zone_for_prefers_longest_match() {
        let index = ZoneIndex::build(&sample());
        assert_eq!(index.zone_for("www.example.co.uk").unwrap().domain, "co.uk");
        assert_eq!(index.zone_for("example.uk").unwrap().domain, "uk");
        assert_eq!(index.zone_for("Example.COM.").unwrap().domain, "com");
        assert!(index.zone_for("example.zzz").is_none());
    }

    #[test]
    fn test_known_tld() {
        let index = ZoneIndex::build(&sample());
        assert!(index.is_known_tld("gr"));
        assert!(!index.is_known_tld("co.uk"));
        assert!(!index.is_known_tld("zzz"));
    }

    #[tokio::test]
    async fn test_concurrent_initialize_builds_once() {
        let registry = Arc::new(TldRegistry::from_dataset(sample()));
        assert!(!registry.is_ready());

        let inits = (0..16).map(|_| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.initialize().await })
        });
        for handle in join_all(inits).await {
            handle.unwrap();
        }

        assert!(registry.is_ready());
        let first = registry.all_entries().await;
        let second = registry.all_entries().await;
        assert_eq!(first, second);

        let unique: HashSet<_> = first.iter().map(|e| e.root_zone.clone()).collect();
        assert_eq!(unique.len(), first.len());
    }

    #[tokio::test]
    async fn test_reader_before_initialize_sees_full_index() {
        let registry = Arc::new(TldRegistry::from_dataset(sample()));
        let reader = {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move { registry.all_entries().await.len() })
        };
        registry.initialize().await;
        assert_eq!(reader.await.unwrap(), 2);
    }

    #[test]
    fn test_entries_without_async_context() {
        let registry = TldRegistry::from_dataset(sample());
        let entries = tokio_test::block_on(registry.all_entries());
        assert_eq!(entries.len(), 2);
        assert!(registry.is_ready());
    }

    #[tokio::test]
    async fn test_bundled_registry() {
        let registry = TldRegistry::bundled();
        let entries = registry.all_entries().await;
        assert!(entries.iter().any(|e| e.root_zone == "com"));
        assert!(entries.iter().all(|e| !e.root_zone.contains('.')));
        // published a URL only, or nothing at all
        assert!(!entries.iter().any(|e| e.root_zone == "es" || e.root_zone == "gr"));
    }
}
