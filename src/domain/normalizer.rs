//! Reduce arbitrary user input to a registrable root domain

use crate::error::{Result, WhoisError};
use crate::zone::ZoneIndex;
use url::Url;

/// Maximum length of a single DNS label
pub const MAX_LABEL_LEN: usize = 63;

/// Normalizes domain and URL-like input against a zone index
pub struct DomainNormalizer<'a> {
    index: &'a ZoneIndex,
}

impl<'a> DomainNormalizer<'a> {
    pub fn new(index: &'a ZoneIndex) -> Self {
        Self { index }
    }

    /// Normalize `input` to its root domain.
    ///
    /// The public suffix list is tried first (`www.example.co.uk` →
    /// `example.co.uk`). Input it cannot handle is parsed as a URL host and
    /// reduced to its last two labels, which mis-splits multi-label suffixes
    /// the list does not cover. Either way the top-level zone must be present
    /// in the index.
    pub fn normalize(&self, input: &str) -> Result<String> {
        let query = input.trim().trim_end_matches('.').to_lowercase();
        if query.is_empty() {
            return Err(WhoisError::invalid_domain(input, "empty input"));
        }

        let root = match public_suffix_root(&query) {
            Some(root) => root,
            None => host_root(input, &query)?,
        };

        for label in root.split('.') {
            if !is_valid_label(label) {
                return Err(WhoisError::invalid_domain(
                    input,
                    format!("invalid label '{}'", label),
                ));
            }
        }

        let tld = root.rsplit('.').next().unwrap_or_default();
        if !self.index.is_known_tld(tld) {
            return Err(WhoisError::unsupported_tld(root));
        }

        Ok(root)
    }
}

fn public_suffix_root(query: &str) -> Option<String> {
    let host = host_of(query).unwrap_or_else(|| query.to_string());
    let name = addr::parse_domain_name(host.trim_end_matches('.')).ok()?;
    if !name.has_known_suffix() {
        return None;
    }
    name.root().map(str::to_string)
}

fn host_root(input: &str, query: &str) -> Result<String> {
    let host = host_of(query)
        .ok_or_else(|| WhoisError::invalid_domain(input, "cannot parse host"))?;

    let labels: Vec<&str> = host
        .trim_end_matches('.')
        .split('.')
        .filter(|l| !l.is_empty())
        .collect();
    if labels.len() < 2 {
        return Err(WhoisError::invalid_domain(
            input,
            "host needs at least two labels",
        ));
    }

    Ok(labels[labels.len() - 2..].join("."))
}

fn host_of(query: &str) -> Option<String> {
    let candidate = if query.contains("://") {
        query.to_string()
    } else {
        format!("https://{}", query)
    };
    let url = Url::parse(&candidate).ok()?;
    url.host_str().map(str::to_string)
}

/// A DNS label: 1 to 63 letters, digits or hyphens, not starting or
/// ending with a hyphen.
pub fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LEN {
        return false;
    }
    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }
    label.chars().all(|c| c.is_alphanumeric() || c == '-')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::zone::{Zone, ZoneDataset};

    fn index() -> ZoneIndex {
        let zones = ["com", "uk", "co.uk", "io", "de"]
            .iter()
            .map(|d| Zone {
                domain: d.to_string(),
                whois_server: Some(format!("whois.nic.{}", d)),
                name_servers: vec![format!("a.nic.{}", d)],
                ..Default::default()
            })
            .collect();
        ZoneIndex::build(&ZoneDataset::new("test", zones))
    }

    #[test]
    fn test_normalize_public_suffix() {
        let index = index();
        let n = DomainNormalizer::new(&index);
        assert_eq!(n.normalize("  Example.COM ").unwrap(), "example.com");
        assert_eq!(n.normalize("www.example.com").unwrap(), "example.com");
        assert_eq!(n.normalize("a.b.example.co.uk").unwrap(), "example.co.uk");
    }

    #[test]
    fn test_normalize_fully_qualified_name() {
        let index = index();
        let n = DomainNormalizer::new(&index);
        assert_eq!(n.normalize("example.com.").unwrap(), "example.com");
        assert_eq!(n.normalize("WWW.Example.co.uk.").unwrap(), "example.co.uk");
        assert_eq!(n.normalize("https://www.example.com./about").unwrap(), "example.com");
        assert_eq!(n.normalize(".").unwrap_err().kind(), ErrorKind::InvalidDomain);
    }

    #[test]
    fn test_normalize_url_input() {
        let index = index();
        let n = DomainNormalizer::new(&index);
        assert_eq!(
            n.normalize("https://www.Example.io/path?q=1").unwrap(),
            "example.io"
        );
        assert_eq!(n.normalize("example.de:8080/x").unwrap(), "example.de");
    }

    #[test]
    fn test_normalize_rejects_garbage() {
        let index = index();
        let n = DomainNormalizer::new(&index);
        for input in ["not a domain", "bad_domain_!!", "", "   ", "localhost"] {
            let err = n.normalize(input).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidDomain, "input {:?}", input);
        }
    }

    #[test]
    fn test_normalize_unknown_tld() {
        let index = index();
        let n = DomainNormalizer::new(&index);
        let err = n.normalize("example.zzzinvalidtld").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedTld);

        // listed in the public suffix list but absent from the index
        let err = n.normalize("example.org").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedTld);
    }

    #[test]
    fn test_label_validation() {
        assert!(is_valid_label("example"));
        assert!(is_valid_label("a-b"));
        assert!(is_valid_label("x"));
        assert!(!is_valid_label(""));
        assert!(!is_valid_label("-lead"));
        assert!(!is_valid_label("trail-"));
        assert!(!is_valid_label("under_score"));
        assert!(!is_valid_label(&"a".repeat(64)));
        assert!(is_valid_label(&"a".repeat(63)));
    }

    #[test]
    fn test_bundled_index() {
        let dataset = ZoneDataset::bundled().unwrap();
        let index = ZoneIndex::build(&dataset);
        let n = DomainNormalizer::new(&index);
        assert_eq!(n.normalize("mail.google.com").unwrap(), "google.com");
        assert_eq!(n.normalize("www.bbc.co.uk").unwrap(), "bbc.co.uk");
    }

    #[test]
    fn test_bundled_index_covers_root_zone() {
        let dataset = ZoneDataset::bundled().unwrap();
        let index = ZoneIndex::build(&dataset);
        let n = DomainNormalizer::new(&index);

        for tld in ["cz", "tw", "hk", "pt", "ua", "vn", "sg", "wtf", "aaa", "zw"] {
            let input = format!("www.example.{}", tld);
            assert_eq!(
                n.normalize(&input).unwrap(),
                format!("example.{}", tld),
                "tld {}",
                tld
            );
        }
        assert_eq!(n.normalize("shop.example.com.tw").unwrap(), "example.com.tw");
    }
}
