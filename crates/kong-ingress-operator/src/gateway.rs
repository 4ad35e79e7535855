//! Gateway admin API seam
//!
//! The reconciler and reaper talk to the gateway through this trait so unit
//! tests can substitute a mock; production wires in the HTTP client.

use std::sync::Arc;

use async_trait::async_trait;
use kong_admin_client::{
    AdminClient, Api, ApiPatch, ApiRequest, Certificate, CertificateRequest, Error,
};

/// Operations the controller performs against the gateway admin API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait GatewayAdmin: Send + Sync {
    async fn list_apis(&self) -> Result<Vec<Api>, Error>;

    async fn get_api(&self, name: &str) -> Result<Option<Api>, Error>;

    async fn create_api(&self, api: &ApiRequest) -> Result<Api, Error>;

    async fn patch_api(&self, patch: &ApiPatch) -> Result<Api, Error>;

    async fn delete_api(&self, name: &str) -> Result<(), Error>;

    async fn get_certificate(&self, sni: &str) -> Result<Option<Certificate>, Error>;

    async fn create_certificate(&self, request: &CertificateRequest)
        -> Result<Certificate, Error>;

    async fn patch_certificate(
        &self,
        id: &str,
        request: &CertificateRequest,
    ) -> Result<Certificate, Error>;
}

#[async_trait]
impl GatewayAdmin for AdminClient {
    async fn list_apis(&self) -> Result<Vec<Api>, Error> {
        AdminClient::list_apis(self).await
    }

    async fn get_api(&self, name: &str) -> Result<Option<Api>, Error> {
        AdminClient::get_api(self, name).await
    }

    async fn create_api(&self, api: &ApiRequest) -> Result<Api, Error> {
        AdminClient::create_api(self, api).await
    }

    async fn patch_api(&self, patch: &ApiPatch) -> Result<Api, Error> {
        AdminClient::patch_api(self, patch).await
    }

    async fn delete_api(&self, name: &str) -> Result<(), Error> {
        AdminClient::delete_api(self, name).await
    }

    async fn get_certificate(&self, sni: &str) -> Result<Option<Certificate>, Error> {
        AdminClient::get_certificate(self, sni).await
    }

    async fn create_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<Certificate, Error> {
        AdminClient::create_certificate(self, request).await
    }

    async fn patch_certificate(
        &self,
        id: &str,
        request: &CertificateRequest,
    ) -> Result<Certificate, Error> {
        AdminClient::patch_certificate(self, id, request).await
    }
}

/// Arc-wrapped clients share the same seam.
#[async_trait]
impl<T: GatewayAdmin + ?Sized> GatewayAdmin for Arc<T> {
    async fn list_apis(&self) -> Result<Vec<Api>, Error> {
        (**self).list_apis().await
    }

    async fn get_api(&self, name: &str) -> Result<Option<Api>, Error> {
        (**self).get_api(name).await
    }

    async fn create_api(&self, api: &ApiRequest) -> Result<Api, Error> {
        (**self).create_api(api).await
    }

    async fn patch_api(&self, patch: &ApiPatch) -> Result<Api, Error> {
        (**self).patch_api(patch).await
    }

    async fn delete_api(&self, name: &str) -> Result<(), Error> {
        (**self).delete_api(name).await
    }

    async fn get_certificate(&self, sni: &str) -> Result<Option<Certificate>, Error> {
        (**self).get_certificate(sni).await
    }

    async fn create_certificate(
        &self,
        request: &CertificateRequest,
    ) -> Result<Certificate, Error> {
        (**self).create_certificate(request).await
    }

    async fn patch_certificate(
        &self,
        id: &str,
        request: &CertificateRequest,
    ) -> Result<Certificate, Error> {
        (**self).patch_certificate(id, request).await
    }
}
