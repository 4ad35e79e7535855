//! TLS certificate synchronization
//!
//! Mirrors certificates referenced by ingress TLS entries onto the gateway:
//! the cluster secret is the source of truth, the gateway record keyed by
//! SNI hostname is converged with a create-or-patch. Comparison tolerates
//! trailing newlines because PEM blobs routinely gain or lose one on their
//! way through secrets and admin APIs.
//
// TODO: reap gateway certificates whose last referencing ingress was
// deleted; a host can be shared by several ingresses, so this needs
// reference counting across the snapshot rather than per-event cleanup.

use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::IngressTLS;
use kong_admin_client::CertificateRequest;
use thiserror::Error;
use tracing::info;

use crate::cluster::{ClusterError, SecretReader};
use crate::gateway::GatewayAdmin;

#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("gateway admin error: {0}")]
    Gateway(#[from] kong_admin_client::Error),

    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("TLS entry has no secret name")]
    MissingSecretName,

    #[error("secret '{secret}' is missing or has invalid '{key}'")]
    SecretData { secret: String, key: String },
}

/// Converge the gateway certificates for one ingress TLS entry.
pub async fn reconcile_certificates(
    gateway: &dyn GatewayAdmin,
    secrets: &dyn SecretReader,
    namespace: &str,
    tls: &IngressTLS,
) -> Result<(), CertificateError> {
    let secret_name = tls
        .secret_name
        .as_deref()
        .ok_or(CertificateError::MissingSecretName)?;

    let secret = secrets.get_secret(namespace, secret_name).await?;
    let cert = secret_value(&secret, secret_name, "tls.crt")?;
    let key = secret_value(&secret, secret_name, "tls.key")?;

    for host in tls.hosts.iter().flatten() {
        match gateway.get_certificate(host).await? {
            None => {
                info!(host = %host, secret = %secret_name, "Creating gateway certificate");
                gateway
                    .create_certificate(&CertificateRequest {
                        cert: cert.clone(),
                        key: key.clone(),
                        snis: Some(host.clone()),
                    })
                    .await?;
            }
            Some(existing) => {
                if pem_equal(&existing.cert, &cert) && pem_equal(&existing.key, &key) {
                    continue;
                }
                info!(
                    host = %host,
                    id = %existing.id,
                    secret = %secret_name,
                    "Gateway certificate is out of date, updating"
                );
                gateway
                    .patch_certificate(
                        &existing.id,
                        &CertificateRequest {
                            cert: cert.clone(),
                            key: key.clone(),
                            snis: None,
                        },
                    )
                    .await?;
            }
        }
    }

    Ok(())
}

fn secret_value(secret: &Secret, secret_name: &str, key: &str) -> Result<String, CertificateError> {
    let missing = || CertificateError::SecretData {
        secret: secret_name.to_string(),
        key: key.to_string(),
    };

    let bytes = secret
        .data
        .as_ref()
        .and_then(|data| data.get(key))
        .ok_or_else(missing)?;

    String::from_utf8(bytes.0.clone()).map_err(|_| missing())
}

fn pem_equal(left: &str, right: &str) -> bool {
    left.trim_matches('\n') == right.trim_matches('\n')
}
