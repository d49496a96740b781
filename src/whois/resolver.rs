//! Authoritative WHOIS server discovery

use crate::error::{Result, WhoisError};
use crate::zone::ZoneIndex;
use url::Url;

/// IANA root WHOIS server, authoritative for TLD-level queries
pub const IANA_WHOIS_SERVER: &str = "whois.iana.org";

/// Server a query should be sent to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedServer {
    pub host: String,
    /// Set when the host was taken from the zone's published WHOIS URL
    pub whois_url: Option<String>,
}

impl ResolvedServer {
    fn bare(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            whois_url: None,
        }
    }
}

/// Find the WHOIS server for `query`.
///
/// A query without a dot is a TLD (or root) request and goes to IANA, as
/// long as it is empty or a zone the index knows. Anything else resolves
/// through its longest matching zone, preferring the host of the zone's
/// WHOIS URL over its bare server name.
pub fn resolve_server(index: &ZoneIndex, query: &str) -> Result<ResolvedServer> {
    let query = query.trim().trim_end_matches('.').to_lowercase();

    if !query.contains('.') {
        if query.is_empty() || index.is_known_tld(&query) {
            return Ok(ResolvedServer::bare(IANA_WHOIS_SERVER));
        }
        return Err(WhoisError::no_zone_found(query));
    }

    let zone = index
        .zone_for(&query)
        .ok_or_else(|| WhoisError::no_zone_found(&query))?;

    if let Some(url) = zone.whois_url() {
        if let Some(host) = url_host(url) {
            return Ok(ResolvedServer {
                host,
                whois_url: Some(url.to_string()),
            });
        }
        tracing::debug!(zone = %zone.domain, url = %url, "WHOIS URL has no usable host");
    }

    zone.whois_server()
        .map(ResolvedServer::bare)
        .ok_or_else(|| WhoisError::no_whois_server(&zone.domain))
}

fn url_host(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .filter(|h| !h.is_empty())
        .map(str::to_string)
}
