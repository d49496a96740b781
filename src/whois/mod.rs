//! WHOIS protocol: server discovery, the raw TCP exchange and reply parsing

pub mod client;
pub mod parser;
pub mod resolver;

pub use client::{WhoisClient, DEFAULT_QUERY_TIMEOUT, WHOIS_PORT};
pub use parser::{TextParser, WhoisParser};
pub use resolver::{resolve_server, ResolvedServer, IANA_WHOIS_SERVER};
