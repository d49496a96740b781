//! JSON response envelope shared by every operation

use crate::error::{ErrorKind, WhoisError};
use crate::lookup::WhoisService;
use crate::types::{MassLookupOutcome, MetricsSnapshot, TldEntry, WhoisRecord};
use serde::{Deserialize, Serialize};

/// Message carried by a healthy [`HealthReport`]
pub const HEALTHY_MESSAGE: &str = "API is healthy and ready to accept incoming requests";

/// Envelope returned for every request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub error: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<ApiPayload>,
}

/// Payload of a successful response, tagged by operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum ApiPayload {
    Tlds(Vec<TldEntry>),
    Record(WhoisRecord),
    Raw(String),
    Batch(Vec<BatchItem>),
    Health(HealthReport),
}

/// One domain of a mass lookup response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItem {
    pub error: bool,
    pub message: String,
    pub domain_name: String,
    pub whois: Option<WhoisRecord>,
}

impl From<MassLookupOutcome> for BatchItem {
    fn from(outcome: MassLookupOutcome) -> Self {
        match (outcome.record, outcome.error) {
            (Some(record), None) => Self {
                error: false,
                message: String::new(),
                domain_name: outcome.domain,
                whois: Some(record),
            },
            (_, error) => Self {
                error: true,
                message: error
                    .map(|e| e.to_string())
                    .unwrap_or_else(|| "error".to_string()),
                domain_name: outcome.domain,
                whois: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub version: String,
    pub registry_ready: bool,
    pub dataset_version: String,
    pub tld_count: usize,
    pub metrics: MetricsSnapshot,
}

impl HealthReport {
    /// Snapshot of `service`, initializing its registry if needed
    pub async fn collect(service: &WhoisService) -> Self {
        let index = service.registry().ready().await;
        Self {
            version: crate::VERSION.to_string(),
            registry_ready: service.registry().is_ready(),
            dataset_version: index.version().to_string(),
            tld_count: index.entries().len(),
            metrics: service.metrics_snapshot(),
        }
    }
}

impl ApiResponse {
    pub fn ok(data: ApiPayload) -> Self {
        Self {
            error: false,
            message: String::new(),
            data: Some(data),
        }
    }

    pub fn tlds(entries: Vec<TldEntry>) -> Self {
        Self::ok(ApiPayload::Tlds(entries))
    }

    pub fn record(record: WhoisRecord) -> Self {
        Self::ok(ApiPayload::Record(record))
    }

    pub fn raw(raw: String) -> Self {
        Self::ok(ApiPayload::Raw(raw))
    }

    pub fn batch(outcomes: Vec<MassLookupOutcome>) -> Self {
        Self::ok(ApiPayload::Batch(
            outcomes.into_iter().map(BatchItem::from).collect(),
        ))
    }

    pub fn health(report: HealthReport) -> Self {
        Self {
            error: false,
            message: HEALTHY_MESSAGE.to_string(),
            data: Some(ApiPayload::Health(report)),
        }
    }

    pub fn failure(error: &WhoisError) -> Self {
        Self {
            error: true,
            message: error.to_string(),
            data: None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| {
            format!(
                r#"{{"error": true, "message": "serialization failed: {}"}}"#,
                e.to_string().replace('"', "'")
            )
        })
    }
}

/// HTTP status a transport should answer `kind` with
pub fn status_code(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::InvalidDomain | ErrorKind::UnsupportedTld | ErrorKind::BatchTooLarge => 400,
        _ => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WhoisDomain;

    #[test]
    fn test_failure_envelope() {
        let response = ApiResponse::failure(&WhoisError::batch_too_large(151, 150));
        let json: serde_json::Value = serde_json::from_str(&response.to_json()).unwrap();
        assert_eq!(json["error"], true);
        assert!(json["message"].as_str().unwrap().contains("150"));
        assert!(json.get("data").is_none());
    }

    #[test]
    fn test_batch_items() {
        let record = WhoisRecord {
            domain: Some(WhoisDomain {
                domain: "example.com".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        let response = ApiResponse::batch(vec![
            MassLookupOutcome::success("Example.com", record),
            MassLookupOutcome::failure("bad_domain_!!", WhoisError::invalid_domain("bad_domain_!!", "x")),
        ]);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["data"]["kind"], "batch");
        let items = json["data"]["payload"].as_array().unwrap();
        assert_eq!(items[0]["domain_name"], "Example.com");
        assert_eq!(items[0]["error"], false);
        assert_eq!(items[0]["whois"]["domain"]["domain"], "example.com");
        assert_eq!(items[1]["error"], true);
        assert!(items[1]["whois"].is_null());
    }

    #[test]
    fn test_tld_entries_serialize_with_wire_names() {
        let entry = TldEntry {
            root_zone: "uk".to_string(),
            sub_zones: vec!["co.uk".to_string()],
            registry_operator: "Nominet UK".to_string(),
            info_url: String::new(),
            tags: Default::default(),
        };
        let json = serde_json::to_value(ApiResponse::tlds(vec![entry])).unwrap();
        assert_eq!(json["data"]["payload"][0]["root_tld"], "uk");
        assert_eq!(json["data"]["payload"][0]["sub_tld"][0], "co.uk");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(status_code(ErrorKind::InvalidDomain), 400);
        assert_eq!(status_code(ErrorKind::BatchTooLarge), 400);
        assert_eq!(status_code(ErrorKind::Unreachable), 500);
    }
}
