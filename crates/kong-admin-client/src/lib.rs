//! Typed client for the Kong 0.x admin API.
//!
//! Covers the two resource collections the ingress controller manages:
//!
//! - `/apis` - route definitions (list, get, create, patch, delete)
//! - `/certificates` - TLS material keyed by SNI hostname
//!
//! Patches are partial: the body carries the record `id` plus only the
//! fields being changed, so concurrent edits to unrelated fields on the
//! gateway are preserved.

mod resources;

pub use resources::{Api, ApiPatch, ApiRequest, Certificate, CertificateRequest};

use std::time::Duration;

use reqwest::StatusCode;
use resources::{AdminMessage, ApiPage};
use thiserror::Error;
use tracing::debug;

/// Per-request deadline; components above the client add no timeouts of
/// their own.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors from admin API calls.
#[derive(Debug, Error)]
pub enum Error {
    /// The request never produced an HTTP response (connect, DNS, timeout).
    #[error("admin API request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway answered 5xx.
    #[error("gateway unavailable: {status} - {message}")]
    Unavailable { status: u16, message: String },

    /// The gateway rejected the request with an unexpected 4xx.
    #[error("gateway rejected request: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// The named record does not exist.
    #[error("no such record: {0}")]
    NotFound(String),

    /// Invalid admin URL.
    #[error("invalid admin URL: {0}")]
    Config(String),
}

/// Client for the gateway admin API.
///
/// Cheap to clone and safe for concurrent use; the event dispatcher and the
/// orphan reaper share one instance.
#[derive(Debug, Clone)]
pub struct AdminClient {
    http: reqwest::Client,
    base_url: String,
}

impl AdminClient {
    /// Create a client for the given admin base URL, e.g.
    /// `http://kong-admin:8001`.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "expected http(s) URL, got '{base_url}'"
            )));
        }

        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// List every API on the gateway, following pagination links.
    pub async fn list_apis(&self) -> Result<Vec<Api>, Error> {
        let mut apis = Vec::new();
        let mut url = format!("{}/apis", self.base_url);

        loop {
            let response = self.http.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(unexpected(status, response).await);
            }

            let page: ApiPage = response.json().await?;
            apis.extend(page.data);

            match page.next {
                Some(next) => url = next,
                None => break,
            }
        }

        debug!(count = apis.len(), "Listed gateway APIs");
        Ok(apis)
    }

    /// Fetch a single API by name; `Ok(None)` when the gateway has no such
    /// record.
    pub async fn get_api(&self, name: &str) -> Result<Option<Api>, Error> {
        let url = format!("{}/apis/{}", self.base_url, name);
        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(unexpected(status, response).await);
        }

        Ok(Some(response.json().await?))
    }

    /// Create an API from the full desired record.
    pub async fn create_api(&self, api: &ApiRequest) -> Result<Api, Error> {
        let url = format!("{}/apis", self.base_url);
        let response = self.http.post(&url).json(api).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(unexpected(status, response).await);
        }

        let created: Api = response.json().await?;
        debug!(api = %created.name, id = %created.id, "Created gateway API");
        Ok(created)
    }

    /// Patch an API; the body carries `id` plus only the changed fields.
    pub async fn patch_api(&self, patch: &ApiPatch) -> Result<Api, Error> {
        let url = format!("{}/apis/{}", self.base_url, patch.id);
        let response = self.http.patch(&url).json(patch).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(patch.id.clone()));
        }
        if !status.is_success() {
            return Err(unexpected(status, response).await);
        }

        let updated: Api = response.json().await?;
        debug!(api = %updated.name, id = %updated.id, "Patched gateway API");
        Ok(updated)
    }

    /// Delete an API by name. Deleting a record that does not exist is a
    /// [`Error::NotFound`], not a silent success.
    pub async fn delete_api(&self, name: &str) -> Result<(), Error> {
        let url = format!("{}/apis/{}", self.base_url, name);
        let response = self.http.delete(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(name.to_string()));
        }
        if !status.is_success() {
            return Err(unexpected(status, response).await);
        }

        debug!(api = %name, "Deleted gateway API");
        Ok(())
    }

    /// Fetch a certificate by SNI hostname; `Ok(None)` when absent.
    pub async fn get_certificate(&self, sni: &str) -> Result<Option<Certificate>, Error> {
        let url = format!("{}/certificates/{}", self.base_url, sni);
        let response = self.http.get(&url).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(unexpected(status, response).await);
        }

        Ok(Some(response.json().await?))
    }

    /// Upload a new certificate bound to the SNI named in the request.
    pub async fn create_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<Certificate, Error> {
        let url = format!("{}/certificates", self.base_url);
        let response = self.http.post(&url).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(unexpected(status, response).await);
        }

        let created: Certificate = response.json().await?;
        debug!(id = %created.id, "Created gateway certificate");
        Ok(created)
    }

    /// Replace the cert/key material of an existing certificate.
    pub async fn patch_certificate(
        &self,
        id: &str,
        request: &CertificateRequest,
    ) -> Result<Certificate, Error> {
        let url = format!("{}/certificates/{}", self.base_url, id);
        let response = self.http.patch(&url).json(request).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Err(Error::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(unexpected(status, response).await);
        }

        let updated: Certificate = response.json().await?;
        debug!(id = %updated.id, "Patched gateway certificate");
        Ok(updated)
    }
}

/// Map a non-success status to the error taxonomy, salvaging the gateway's
/// `{"message": ...}` body when it sends one.
async fn unexpected(status: StatusCode, response: reqwest::Response) -> Error {
    let message = response
        .json::<AdminMessage>()
        .await
        .map(|m| m.message)
        .unwrap_or_default();

    if status.is_server_error() {
        Error::Unavailable {
            status: status.as_u16(),
            message,
        }
    } else {
        Error::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

impl Error {
    /// Whether the error means the gateway could not be reached or answered
    /// 5xx, as opposed to rejecting a well-formed request.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Http(_) | Error::Unavailable { .. })
    }
}
