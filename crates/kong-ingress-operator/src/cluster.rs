//! Cluster read seams
//!
//! The reaper and the resync tick need an ingress snapshot across all
//! namespaces, and certificate sync needs to read referenced secrets. Both
//! go through traits so tests can supply fixed data; production impls wrap
//! the kube client.

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::ListParams;
use kube::{Api, Client};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("secret {namespace}/{name} not found")]
    SecretNotFound { namespace: String, name: String },
}

/// Synchronous-style snapshot of all ingresses in all namespaces.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IngressLister: Send + Sync {
    async fn list_all(&self) -> Result<Vec<Ingress>, ClusterError>;
}

/// Reads secrets referenced by ingress TLS entries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SecretReader: Send + Sync {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError>;
}

/// Production ingress lister over the cluster API.
pub struct KubeIngressLister {
    client: Client,
}

impl KubeIngressLister {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl IngressLister for KubeIngressLister {
    async fn list_all(&self) -> Result<Vec<Ingress>, ClusterError> {
        let api: Api<Ingress> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }
}

/// Production secret reader over the cluster API.
pub struct KubeSecretReader {
    client: Client,
}

impl KubeSecretReader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SecretReader for KubeSecretReader {
    async fn get_secret(&self, namespace: &str, name: &str) -> Result<Secret, ClusterError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.map_err(|e| match e {
            kube::Error::Api(ref response) if response.code == 404 => {
                ClusterError::SecretNotFound {
                    namespace: namespace.to_string(),
                    name: name.to_string(),
                }
            }
            other => ClusterError::Kube(other),
        })
    }
}
