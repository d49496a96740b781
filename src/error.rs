//! Error handling for whois-probe

use std::time::Duration;
use thiserror::Error;

/// Main error type for whois-probe
#[derive(Error, Debug, Clone)]
pub enum WhoisError {
    #[error("Invalid domain '{input}': {reason}")]
    InvalidDomain { input: String, reason: String },

    #[error("Unsupported TLD for '{domain}'")]
    UnsupportedTld { domain: String },

    #[error("No public zone found for {query}")]
    NoZoneFound { query: String },

    #[error("No WHOIS server found for {zone}")]
    NoWhoisServer { zone: String },

    #[error("WHOIS server {server} unreachable: {message}")]
    Unreachable { server: String, message: String },

    #[error("Timeout error: {operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("Parse error: {message}")]
    ParseFailed { message: String },

    #[error("Incomplete WHOIS record for '{domain}': no creation date")]
    IncompleteRecord { domain: String },

    #[error("Lookup for '{domain}' abandoned at the batch deadline")]
    DeadlineExceeded { domain: String },

    #[error("Too many domains: {size} requested, maximum allowed is {max} per request")]
    BatchTooLarge { size: usize, max: usize },

    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Discriminant of [`WhoisError`], handy for boundary layers mapping
/// failures onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidDomain,
    UnsupportedTld,
    NoZoneFound,
    NoWhoisServer,
    Unreachable,
    Timeout,
    ParseFailed,
    IncompleteRecord,
    DeadlineExceeded,
    BatchTooLarge,
    Config,
}

impl WhoisError {
    /// Create an invalid domain error
    pub fn invalid_domain(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDomain {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an unsupported TLD error
    pub fn unsupported_tld(domain: impl Into<String>) -> Self {
        Self::UnsupportedTld {
            domain: domain.into(),
        }
    }

    /// Create a missing zone error
    pub fn no_zone_found(query: impl Into<String>) -> Self {
        Self::NoZoneFound {
            query: query.into(),
        }
    }

    /// Create a missing WHOIS server error
    pub fn no_whois_server(zone: impl Into<String>) -> Self {
        Self::NoWhoisServer { zone: zone.into() }
    }

    /// Create an unreachable server error
    pub fn unreachable(server: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unreachable {
            server: server.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(operation: impl Into<String>, timeout: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Create a parse error
    pub fn parse_failed(message: impl Into<String>) -> Self {
        Self::ParseFailed {
            message: message.into(),
        }
    }

    /// Create an incomplete record error
    pub fn incomplete_record(domain: impl Into<String>) -> Self {
        Self::IncompleteRecord {
            domain: domain.into(),
        }
    }

    /// Create a batch deadline error
    pub fn deadline_exceeded(domain: impl Into<String>) -> Self {
        Self::DeadlineExceeded {
            domain: domain.into(),
        }
    }

    /// Create an admission cap error
    pub fn batch_too_large(size: usize, max: usize) -> Self {
        Self::BatchTooLarge { size, max }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get the error discriminant
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidDomain { .. } => ErrorKind::InvalidDomain,
            Self::UnsupportedTld { .. } => ErrorKind::UnsupportedTld,
            Self::NoZoneFound { .. } => ErrorKind::NoZoneFound,
            Self::NoWhoisServer { .. } => ErrorKind::NoWhoisServer,
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::ParseFailed { .. } => ErrorKind::ParseFailed,
            Self::IncompleteRecord { .. } => ErrorKind::IncompleteRecord,
            Self::DeadlineExceeded { .. } => ErrorKind::DeadlineExceeded,
            Self::BatchTooLarge { .. } => ErrorKind::BatchTooLarge,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Whether the failure came from talking to a remote server
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. } | Self::Timeout { .. } | Self::DeadlineExceeded { .. }
        )
    }

    /// Whether the failure was caused by the caller's input
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDomain { .. } | Self::UnsupportedTld { .. } | Self::BatchTooLarge { .. }
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, WhoisError>;
