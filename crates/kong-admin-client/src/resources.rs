//! Serde types for the admin API's `/apis` and `/certificates` resources.

use serde::{Deserialize, Serialize};

/// An API (route definition) as returned by the gateway.
///
/// Only the fields the controller reconciles are modeled; anything else the
/// gateway attaches (plugin associations, timestamps) stays on the gateway
/// untouched because updates go out as field-level patches.
#[derive(Debug, Clone, Deserialize)]
pub struct Api {
    /// Gateway-assigned identifier.
    pub id: String,
    /// Client-chosen unique name; the controller's reconciliation key.
    pub name: String,
    pub upstream_url: String,
    #[serde(default)]
    pub hosts: Vec<String>,
    pub uris: Option<Vec<String>>,
    #[serde(default)]
    pub preserve_host: bool,
    pub strip_uri: Option<bool>,
}

/// Full desired record for `POST /apis`.
#[derive(Debug, Clone, Serialize)]
pub struct ApiRequest {
    pub name: String,
    pub upstream_url: String,
    pub hosts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    pub preserve_host: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_uri: Option<bool>,
}

/// Partial record for `PATCH /apis/{id}`.
///
/// Unset fields are omitted from the body entirely, so a patch built for one
/// drifted field changes nothing else.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiPatch {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hosts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uris: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_host: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strip_uri: Option<bool>,
}

/// One page of `GET /apis`; `next` is an absolute URL when more pages exist.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiPage {
    #[serde(default)]
    pub data: Vec<Api>,
    #[serde(default)]
    pub next: Option<String>,
}

/// A TLS certificate as returned by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct Certificate {
    pub id: String,
    pub cert: String,
    pub key: String,
    #[serde(default)]
    pub snis: Option<Vec<String>>,
}

/// Write payload for `POST /certificates` and `PATCH /certificates/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateRequest {
    pub cert: String,
    pub key: String,
    /// SNI hostname to bind on create; omitted on patch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snis: Option<String>,
}

/// Error body shape (`{"message": "..."}`) used by the gateway on failures.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AdminMessage {
    #[serde(default)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_serializes_only_set_fields() {
        let patch = ApiPatch {
            id: "abc-123".to_string(),
            upstream_url: Some("http://svc.prod:8080".to_string()),
            ..ApiPatch::default()
        };

        let body = serde_json::to_value(&patch).expect("patch should serialize");
        let object = body.as_object().expect("patch body should be an object");
        assert_eq!(object.len(), 2, "unexpected fields in patch body: {object:?}");
        assert_eq!(object["id"], "abc-123");
        assert_eq!(object["upstream_url"], "http://svc.prod:8080");
    }

    #[test]
    fn api_deserializes_without_optional_fields() {
        // Older gateways omit uris/strip_uri entirely.
        let api: Api = serde_json::from_str(
            r#"{"id": "x", "name": "a.prod", "upstream_url": "http://a.prod:80"}"#,
        )
        .expect("minimal api should deserialize");

        assert!(api.hosts.is_empty());
        assert!(api.uris.is_none());
        assert!(!api.preserve_host);
        assert!(api.strip_uri.is_none());
    }

    #[test]
    fn certificate_request_omits_snis_on_patch() {
        let request = CertificateRequest {
            cert: "CERT".to_string(),
            key: "KEY".to_string(),
            snis: None,
        };

        let body = serde_json::to_value(&request).expect("request should serialize");
        assert!(body.get("snis").is_none());
    }
}
