//! Raw WHOIS exchange over TCP

use crate::error::{Result, WhoisError};
use crate::types::LookupConfig;
use crate::whois::resolver::{resolve_server, IANA_WHOIS_SERVER};
use crate::zone::TldRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{timeout_at, Instant};

/// Query budget used when the caller supplies no deadline
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(15);

/// Well-known WHOIS port
pub const WHOIS_PORT: u16 = 43;

/// WHOIS client bound to a zone registry
#[derive(Clone)]
pub struct WhoisClient {
    registry: Arc<TldRegistry>,
    port: u16,
    bootstrap_server: String,
    follow_referral: bool,
}

impl WhoisClient {
    pub fn new(registry: Arc<TldRegistry>) -> Self {
        Self {
            registry,
            port: WHOIS_PORT,
            bootstrap_server: IANA_WHOIS_SERVER.to_string(),
            follow_referral: true,
        }
    }

    pub fn with_config(registry: Arc<TldRegistry>, config: &LookupConfig) -> Self {
        Self::new(registry)
            .with_port(config.port)
            .with_follow_referral(config.follow_referral)
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Server asked when a query cannot be resolved through the registry
    pub fn with_bootstrap_server(mut self, server: impl Into<String>) -> Self {
        self.bootstrap_server = server.into();
        self
    }

    pub fn with_follow_referral(mut self, enabled: bool) -> Self {
        self.follow_referral = enabled;
        self
    }

    /// Fetch the raw WHOIS reply for `query`.
    ///
    /// The whole exchange, referral hops included, is bounded by `deadline`
    /// (now + 15s when `None`).
    pub async fn query(&self, query: &str, deadline: Option<Instant>) -> Result<Vec<u8>> {
        let deadline = deadline.unwrap_or_else(|| Instant::now() + DEFAULT_QUERY_TIMEOUT);
        let query = query.trim();
        let index = self.registry.ready().await;

        let server = match resolve_server(index, query) {
            Ok(server) if server.host == IANA_WHOIS_SERVER => self.bootstrap_server.clone(),
            Ok(server) => server.host,
            Err(e) => {
                tracing::debug!(query = %query, error = %e, "No server resolved, asking bootstrap server");
                return self.query_via_bootstrap(query, deadline).await;
            }
        };

        let raw = self.query_server(&server, query, deadline).await?;

        #[cfg(feature = "referral")]
        let raw = if self.follow_referral {
            self.follow_registrar_referral(&server, query, raw, deadline)
                .await
        } else {
            raw
        };

        Ok(raw)
    }

    /// Send one query to `server` and read the reply to EOF
    pub async fn query_server(&self, server: &str, query: &str, deadline: Instant) -> Result<Vec<u8>> {
        let budget = deadline.saturating_duration_since(Instant::now());
        let addr = format!("{}:{}", server, self.port);
        let request = format_query(server, query);
        let started = Instant::now();

        let exchange = async {
            let mut stream = TcpStream::connect(&addr)
                .await
                .map_err(|e| WhoisError::unreachable(server, format!("connect failed: {}", e)))?;

            stream
                .write_all(format!("{}\r\n", request).as_bytes())
                .await
                .map_err(|e| WhoisError::unreachable(server, format!("write failed: {}", e)))?;

            let mut buf = Vec::new();
            stream
                .read_to_end(&mut buf)
                .await
                .map_err(|e| WhoisError::unreachable(server, format!("read failed: {}", e)))?;

            Ok::<_, WhoisError>(buf)
        };

        let result = timeout_at(deadline, exchange)
            .await
            .map_err(|_| WhoisError::timeout(format!("WHOIS query to {}", server), budget))?;

        tracing::debug!(
            server = %server,
            query = %query,
            duration_ms = started.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "WHOIS exchange finished"
        );

        result
    }

    async fn query_via_bootstrap(&self, query: &str, deadline: Instant) -> Result<Vec<u8>> {
        let tld = query.rsplit('.').next().unwrap_or(query);
        let bootstrap = self.query_server(&self.bootstrap_server, tld, deadline).await?;

        if !query.contains('.') {
            return Ok(bootstrap);
        }

        match referral_server(&String::from_utf8_lossy(&bootstrap)) {
            Some(server) if !server.eq_ignore_ascii_case(&self.bootstrap_server) => {
                self.query_server(&server, query, deadline).await
            }
            _ => Ok(bootstrap),
        }
    }

    #[cfg(feature = "referral")]
    async fn follow_registrar_referral(
        &self,
        server: &str,
        query: &str,
        mut raw: Vec<u8>,
        deadline: Instant,
    ) -> Vec<u8> {
        let registrar = match registrar_server(&String::from_utf8_lossy(&raw)) {
            Some(registrar) if !registrar.eq_ignore_ascii_case(server) => registrar,
            _ => return raw,
        };

        match self.query_server(&registrar, query, deadline).await {
            Ok(reply) if !reply.is_empty() => {
                raw.extend_from_slice(b"\r\n");
                raw.extend_from_slice(&reply);
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(server = %registrar, query = %query, error = %e, "Registrar referral failed");
            }
        }

        raw
    }
}

/// Apply the request syntax some registries insist on
pub fn format_query(server: &str, query: &str) -> String {
    if !query.contains('.') {
        return query.to_string();
    }

    match server.to_lowercase().as_str() {
        "whois.verisign-grs.com" | "whois.crsnic.net" => format!("={}", query),
        "whois.denic.de" => format!("-T dn,ace {}", query),
        "whois.jprs.jp" => format!("{}/e", query),
        _ => query.to_string(),
    }
}

/// Server named by an IANA reply (`whois:` or `refer:`)
pub fn referral_server(reply: &str) -> Option<String> {
    field_value(reply, &["whois:", "refer:"])
}

/// Registrar server named by a thin-registry reply
pub fn registrar_server(reply: &str) -> Option<String> {
    field_value(reply, &["registrar whois server:"]).map(|server| {
        let server = server
            .trim_start_matches("whois://")
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        server.split('/').next().unwrap_or(server).to_string()
    })
}

fn field_value(reply: &str, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        reply
            .lines()
            .map(str::trim)
            .find_map(|line| {
                let lower = line.to_lowercase();
                if lower.starts_with(key) {
                    line.get(key.len()..).map(|v| v.trim().to_string())
                } else {
                    None
                }
            })
            .filter(|s| !s.is_empty())
    })
}
