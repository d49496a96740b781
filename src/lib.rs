//! whois-probe - WHOIS lookups for domains and URLs
//!
//! Normalizes input to a registrable root domain, finds the authoritative
//! WHOIS server for its zone, queries it over TCP/43 and parses the reply.
//! Mass lookups run concurrently under a shared deadline.

pub mod api;
pub mod domain;
pub mod error;
pub mod lookup;
pub mod types;
pub mod whois;
pub mod zone;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use error::{ErrorKind, Result, WhoisError};
pub use types::{
    LookupConfig, LookupMetrics, MassLookupOutcome, MetricsSnapshot, TldEntry, WhoisContact,
    WhoisDomain, WhoisRecord,
};

// Re-export main functionality
pub use api::{ApiPayload, ApiResponse};
pub use domain::DomainNormalizer;
pub use lookup::{WhoisLookup, WhoisService};
pub use whois::{WhoisClient, WhoisParser};
pub use zone::{TldRegistry, ZoneDataset};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize the library
pub fn init() -> Result<()> {
    // Load .env file if it exists
    dotenv::dotenv().ok();
    Ok(())
}
