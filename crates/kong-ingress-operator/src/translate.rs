//! Ingress to gateway-API translation
//!
//! The pure layer of the controller: eligibility, validation, name
//! derivation, and projection into the desired gateway record. Everything
//! here is a function of the ingress alone, which is what makes the
//! reconciler and reaper safe to drive from either events or snapshots.

use k8s_openapi::api::networking::v1::Ingress;
use kong_admin_client::ApiRequest;
use thiserror::Error;

use crate::config::annotations;

/// Why an ingress cannot be synced to the gateway.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UnsupportedReason {
    #[error("single-service (default backend) ingresses are not supported")]
    DefaultBackend,

    #[error("path '{path}' has a non-service backend")]
    NonServiceBackend { path: String },

    #[error("path '{path}' has no resolvable backend port")]
    MissingBackendPort { path: String },
}

/// One (rule, path) pair flattened out of an ingress, carrying everything
/// needed to derive the gateway record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePair {
    pub host: String,
    pub path: String,
    pub namespace: String,
    pub service: String,
    pub port: String,
}

/// Whether this controller owns the ingress.
///
/// The ingress-class annotation must be absent (opt-in by default) or equal
/// to the configured class.
pub fn is_eligible(ingress: &Ingress, class: &str) -> bool {
    match ingress
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(annotations::INGRESS_CLASS))
    {
        Some(value) => value == class,
        None => true,
    }
}

/// Check that every route in the ingress can be expressed on the gateway.
pub fn validate(ingress: &Ingress) -> Result<(), UnsupportedReason> {
    let Some(spec) = ingress.spec.as_ref() else {
        return Ok(());
    };

    if spec.default_backend.is_some() {
        return Err(UnsupportedReason::DefaultBackend);
    }

    for rule in spec.rules.iter().flatten() {
        let Some(http) = rule.http.as_ref() else {
            continue;
        };
        for path in &http.paths {
            let shown = path.path.as_deref().unwrap_or("/").to_string();
            let Some(service) = path.backend.service.as_ref() else {
                return Err(UnsupportedReason::NonServiceBackend { path: shown });
            };
            if backend_port(service).is_none() {
                return Err(UnsupportedReason::MissingBackendPort { path: shown });
            }
        }
    }

    Ok(())
}

/// Flatten an ingress into its (rule, path) pairs.
///
/// Paths that `validate` would reject are skipped, so callers that validate
/// first see every pair.
pub fn route_pairs(ingress: &Ingress) -> Vec<RoutePair> {
    let namespace = ingress
        .metadata
        .namespace
        .clone()
        .unwrap_or_else(|| "default".to_string());

    let mut pairs = Vec::new();
    let Some(spec) = ingress.spec.as_ref() else {
        return pairs;
    };

    for rule in spec.rules.iter().flatten() {
        let host = rule.host.clone().unwrap_or_default();
        let Some(http) = rule.http.as_ref() else {
            continue;
        };
        for path in &http.paths {
            let Some(service) = path.backend.service.as_ref() else {
                continue;
            };
            let Some(port) = backend_port(service) else {
                continue;
            };
            pairs.push(RoutePair {
                host: host.clone(),
                path: path.path.clone().unwrap_or_else(|| "/".to_string()),
                namespace: namespace.clone(),
                service: service.name.clone(),
                port,
            });
        }
    }

    pairs
}

/// Stable gateway-API name for a (host, path, namespace) triple:
/// `{host}~{hash(path)}~{namespace}`, the join key between cluster state and
/// gateway state. The path is hashed so it cannot collide with the `~`
/// separators or the gateway's name charset.
pub fn qualified_api_name(host: &str, path: &str, namespace: &str) -> String {
    format!("{host}~{:x}~{namespace}", fnv1a_hash(path.as_bytes()))
}

/// Upstream URL for a backend: `http://{service}.{namespace}:{port}`.
pub fn upstream_url(service: &str, namespace: &str, port: &str) -> String {
    format!("http://{service}.{namespace}:{port}")
}

/// Project a route pair into the full desired gateway record.
pub fn desired_api(pair: &RoutePair) -> ApiRequest {
    ApiRequest {
        name: qualified_api_name(&pair.host, &pair.path, &pair.namespace),
        upstream_url: upstream_url(&pair.service, &pair.namespace, &pair.port),
        hosts: vec![pair.host.clone()],
        uris: Some(vec![pair.path.clone()]),
        preserve_host: true,
        strip_uri: Some(false),
    }
}

/// Render a backend port: the port number when set, else the named port.
fn backend_port(
    service: &k8s_openapi::api::networking::v1::IngressServiceBackend,
) -> Option<String> {
    let port = service.port.as_ref()?;
    port.number
        .map(|n| n.to_string())
        .or_else(|| port.name.clone())
}

/// FNV-1a over the path bytes, rendered as short lowercase hex in the
/// qualified name.
const fn fnv1a_hash(bytes: &[u8]) -> u32 {
    const FNV_OFFSET: u32 = 0x811c9dc5;
    const FNV_PRIME: u32 = 0x01000193;

    let mut hash = FNV_OFFSET;
    let mut i = 0;
    while i < bytes.len() {
        hash ^= bytes[i] as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
        i += 1;
    }
    hash
}
