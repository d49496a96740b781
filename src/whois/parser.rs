//! Turning freeform WHOIS replies into [`WhoisRecord`]s

use crate::error::{Result, WhoisError};
use crate::types::{WhoisContact, WhoisDomain, WhoisRecord};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

/// Converts a raw reply into a structured record
pub trait WhoisParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<WhoisRecord>;
}

/// `Key: value` line, key up to the first colon followed by whitespace or EOL
static KEY_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([A-Za-z][^:\[\]]{0,80}?)\s*:(?:\s+(.*?))?\s*$")
        .expect("Invalid key/value regex")
});

/// JPRS style `[Key]   value` line
static BRACKETED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\[([A-Za-z][^\]]{0,80})\]\s*(.*?)\s*$").expect("Invalid bracketed regex")
});

const NOT_FOUND_PATTERNS: &[&str] = &[
    "no match",
    "not found",
    "no entries found",
    "no data found",
    "no object found",
    "status: free",
    "status: available",
];

const RATE_LIMIT_PATTERNS: &[&str] = &[
    "limit exceeded",
    "query rate",
    "too many requests",
    "quota exceeded",
    "try again later",
];

const DOMAIN_KEYS: &[&str] = &["domain name", "domain", "domain_name"];
const DOMAIN_ID_KEYS: &[&str] = &["registry domain id", "domain id", "roid"];
const WHOIS_SERVER_KEYS: &[&str] = &["registrar whois server", "whois server"];
const STATUS_KEYS: &[&str] = &["domain status", "status", "state", "registration status"];
const NAME_SERVER_KEYS: &[&str] = &[
    "name server",
    "name servers",
    "nameserver",
    "nameservers",
    "nserver",
];
const CREATED_KEYS: &[&str] = &[
    "creation date",
    "created date",
    "created on",
    "created",
    "registered on",
    "registered",
    "registration date",
    "registration time",
    "domain registration date",
];
const UPDATED_KEYS: &[&str] = &[
    "updated date",
    "last updated on",
    "last updated",
    "last modified",
    "last update",
    "modified",
    "changed",
];
const EXPIRES_KEYS: &[&str] = &[
    "registry expiry date",
    "registrar registration expiration date",
    "expiration date",
    "expiry date",
    "expires on",
    "expires",
    "expire date",
    "paid-till",
    "renewal date",
];

/// Line-oriented parser covering the common registry layouts
#[derive(Debug, Clone, Default)]
pub struct TextParser;

impl TextParser {
    pub fn new() -> Self {
        Self
    }
}

impl WhoisParser for TextParser {
    fn parse(&self, raw: &str) -> Result<WhoisRecord> {
        if raw.trim().is_empty() {
            return Err(WhoisError::parse_failed("empty response"));
        }

        let fields = Fields::scan(raw);

        let domain_name = match fields.first(DOMAIN_KEYS) {
            Some(name) => name.trim_end_matches('.').to_lowercase(),
            None => {
                let lower = raw.to_lowercase();
                let message = if NOT_FOUND_PATTERNS.iter().any(|p| lower.contains(p)) {
                    "domain not found"
                } else if RATE_LIMIT_PATTERNS.iter().any(|p| lower.contains(p)) {
                    "rate limited by server"
                } else {
                    "no domain name in response"
                };
                return Err(WhoisError::parse_failed(message));
            }
        };

        let (name, extension) = match domain_name.split_once('.') {
            Some((name, ext)) => (name.to_string(), ext.to_string()),
            None => (domain_name.clone(), String::new()),
        };

        let domain = WhoisDomain {
            id: fields.first(DOMAIN_ID_KEYS).unwrap_or_default(),
            punycode: punycode(&domain_name),
            domain: domain_name,
            name,
            extension,
            whois_server: fields.first(WHOIS_SERVER_KEYS).unwrap_or_default(),
            status: fields.status(),
            name_servers: fields.name_servers(),
            dnssec: fields.first(&["dnssec"]).map_or(false, |v| is_signed(&v)),
            created_at: fields.date(CREATED_KEYS),
            updated_at: fields.date(UPDATED_KEYS),
            expires_at: fields.date(EXPIRES_KEYS),
        };

        Ok(WhoisRecord {
            domain: Some(domain),
            registrar: non_empty(fields.registrar()),
            registrant: non_empty(fields.registrant()),
        })
    }
}

/// Keys and values in reply order
struct Fields {
    entries: Vec<(String, String)>,
}

impl Fields {
    fn scan(raw: &str) -> Self {
        let mut entries = Vec::new();
        // key of an open section whose values sit on the following lines
        let mut section: Option<String> = None;

        for line in raw.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                section = None;
                continue;
            }
            if trimmed.starts_with('%') || trimmed.starts_with('#') || trimmed.starts_with(">>>") {
                continue;
            }

            let captures = KEY_VALUE
                .captures(line)
                .or_else(|| BRACKETED.captures(line));

            match captures {
                Some(caps) => {
                    let key = normalize_key(&caps[1]);
                    let value = caps.get(2).map_or("", |m| m.as_str()).trim();
                    if value.is_empty() {
                        section = Some(key);
                    } else {
                        section = None;
                        entries.push((key, value.to_string()));
                    }
                }
                None => {
                    if let Some(key) = &section {
                        entries.push((key.clone(), trimmed.to_string()));
                    }
                }
            }
        }

        Self { entries }
    }

    /// Values for any of `keys`, redacted values skipped
    fn all<'a>(&'a self, keys: &'a [&'a str]) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(k, _)| keys.iter().any(|key| *key == k.as_str()))
            .map(|(_, v)| v.as_str())
            .filter(|v| !v.is_empty() && !v.to_lowercase().starts_with("redacted"))
    }

    /// First value found, honoring the order of `keys`
    fn first(&self, keys: &[&str]) -> Option<String> {
        keys.iter()
            .find_map(|key| self.all(std::slice::from_ref(key)).next())
            .map(str::to_string)
    }

    fn joined(&self, keys: &[&str]) -> String {
        self.all(keys).collect::<Vec<_>>().join(", ")
    }

    fn date(&self, keys: &[&str]) -> Option<DateTime<Utc>> {
        keys.iter()
            .flat_map(|key| self.all(std::slice::from_ref(key)).collect::<Vec<_>>())
            .find_map(parse_date)
    }

    fn status(&self) -> Vec<String> {
        let mut statuses: Vec<String> = Vec::new();
        for value in self.all(STATUS_KEYS) {
            let status = value.split_whitespace().next().unwrap_or(value).to_string();
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        statuses
    }

    fn name_servers(&self) -> Vec<String> {
        let mut servers: Vec<String> = Vec::new();
        for value in self.all(NAME_SERVER_KEYS) {
            let server = value
                .split_whitespace()
                .next()
                .unwrap_or(value)
                .trim_end_matches('.')
                .to_lowercase();
            if !server.is_empty() && !servers.contains(&server) {
                servers.push(server);
            }
        }
        servers
    }

    fn text(&self, keys: &[&str]) -> String {
        self.first(keys).unwrap_or_default()
    }

    fn registrar(&self) -> WhoisContact {
        WhoisContact {
            id: self.text(&["registrar iana id", "registrar id"]),
            name: self.text(&["registrar", "registrar name", "sponsoring registrar"]),
            organization: self.text(&["registrar organization", "registrar organisation"]),
            street: self.joined(&["registrar street", "registrar address"]),
            city: self.text(&["registrar city"]),
            province: self.text(&["registrar state/province", "registrar province"]),
            postal_code: self.text(&["registrar postal code"]),
            country: self.text(&["registrar country"]),
            phone: self.text(&["registrar abuse contact phone", "registrar phone"]),
            fax: self.text(&["registrar fax"]),
            email: self.text(&["registrar abuse contact email", "registrar email"]),
            referral_url: self.text(&["registrar url", "referral url"]),
        }
    }

    fn registrant(&self) -> WhoisContact {
        WhoisContact {
            id: self.text(&["registry registrant id", "registrant id"]),
            name: self.text(&["registrant name", "registrant"]),
            organization: self.text(&[
                "registrant organization",
                "registrant organisation",
                "org-name",
            ]),
            street: self.joined(&["registrant street", "registrant address"]),
            city: self.text(&["registrant city"]),
            province: self.text(&["registrant state/province", "registrant province"]),
            postal_code: self.text(&["registrant postal code"]),
            country: self.text(&["registrant country"]),
            phone: self.text(&["registrant phone"]),
            fax: self.text(&["registrant fax"]),
            email: self.text(&["registrant email"]),
            referral_url: String::new(),
        }
    }
}

fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn non_empty(contact: WhoisContact) -> Option<WhoisContact> {
    if contact.is_empty() {
        None
    } else {
        Some(contact)
    }
}

fn is_signed(value: &str) -> bool {
    let value = value.to_lowercase();
    value.starts_with("signed") || value.starts_with("yes") || value == "active"
}

fn punycode(domain: &str) -> String {
    match url::Host::parse(domain) {
        Ok(url::Host::Domain(ascii)) => ascii,
        _ => domain.to_string(),
    }
}

/// Parse the date formats registries commonly emit
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let cleaned = value
        .trim()
        .replace(" (UTC)", "")
        .replace(" UTC", "Z")
        .replace(" +0000", "Z");

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&Utc));
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%dT%H:%M:%SZ",
        "%Y-%m-%dT%H:%M:%S%.fZ",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%SZ",
        "%Y-%m-%d %H:%M:%S",
        "%Y.%m.%d %H:%M:%S",
        "%d.%m.%Y %H:%M:%S",
    ];
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(dt.and_utc());
        }
    }

    const DATE_FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%d-%b-%Y",
        "%d-%B-%Y",
        "%Y.%m.%d",
        "%Y/%m/%d",
        "%d.%m.%Y",
        "%d/%m/%Y",
        "%b %d %Y",
    ];
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}
