//! Gateway reconciler
//!
//! Converges a single desired gateway record: fetch by name, create it when
//! missing, otherwise patch each drifted field separately. Field-level
//! patches (rather than one wholesale replace) leave gateway-side state the
//! controller does not model - plugin associations and the like - untouched,
//! and make every repair auditable in the logs.

use kong_admin_client::{ApiPatch, ApiRequest, Error};
use tracing::info;

use crate::gateway::GatewayAdmin;

/// Bring the gateway's record for `desired.name` into agreement with
/// `desired`.
///
/// Errors are surfaced without retry; the next event, resync tick, or reaper
/// cycle converges again.
pub async fn reconcile_api(gateway: &dyn GatewayAdmin, desired: &ApiRequest) -> Result<(), Error> {
    let Some(current) = gateway.get_api(&desired.name).await? else {
        info!(api = %desired.name, upstream = %desired.upstream_url, "Creating API");
        gateway.create_api(desired).await?;
        return Ok(());
    };

    if current.upstream_url != desired.upstream_url {
        info!(
            api = %current.name,
            from = %current.upstream_url,
            to = %desired.upstream_url,
            "Updating upstream URL"
        );
        gateway
            .patch_api(&ApiPatch {
                id: current.id.clone(),
                upstream_url: Some(desired.upstream_url.clone()),
                ..ApiPatch::default()
            })
            .await?;
    }

    // The desired record carries exactly one host.
    if let Some(host) = desired.hosts.first() {
        if current.hosts.len() != 1 || current.hosts[0] != *host {
            info!(api = %current.name, from = ?current.hosts, to = %host, "Updating hosts");
            gateway
                .patch_api(&ApiPatch {
                    id: current.id.clone(),
                    hosts: Some(desired.hosts.clone()),
                    ..ApiPatch::default()
                })
                .await?;
        }
    }

    if !current.preserve_host {
        info!(api = %current.name, "Updating preserve_host to true");
        gateway
            .patch_api(&ApiPatch {
                id: current.id.clone(),
                preserve_host: Some(true),
                ..ApiPatch::default()
            })
            .await?;
    }

    if current.strip_uri != Some(false) {
        info!(api = %current.name, from = ?current.strip_uri, "Updating strip_uri to false");
        gateway
            .patch_api(&ApiPatch {
                id: current.id.clone(),
                strip_uri: Some(false),
                ..ApiPatch::default()
            })
            .await?;
    }

    // The desired record carries exactly one URI prefix.
    if let Some(uri) = desired.uris.as_ref().and_then(|uris| uris.first()) {
        let drifted = match current.uris.as_ref() {
            None => true,
            Some(uris) => uris.is_empty() || uris[0] != *uri,
        };
        if drifted {
            info!(api = %current.name, from = ?current.uris, to = %uri, "Updating URIs");
            gateway
                .patch_api(&ApiPatch {
                    id: current.id.clone(),
                    uris: desired.uris.clone(),
                    ..ApiPatch::default()
                })
                .await?;
        }
    }

    Ok(())
}

/// Delete the named gateway API.
///
/// The record is fetched first so a gateway that rejects us fails loudly and
/// a missing record surfaces as [`Error::NotFound`] rather than a silent
/// no-op.
pub async fn delete_gateway_api(gateway: &dyn GatewayAdmin, name: &str) -> Result<(), Error> {
    match gateway.get_api(name).await? {
        None => Err(Error::NotFound(name.to_string())),
        Some(_) => {
            gateway.delete_api(name).await?;
            info!(api = %name, "Deleted gateway API");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MockGatewayAdmin;
    use kong_admin_client::Api;
    use mockall::predicate::eq;
    use mockall::Sequence;

    fn desired() -> ApiRequest {
        ApiRequest {
            name: "web.example.com~350ca8af~prod".to_string(),
            upstream_url: "http://web.prod:8080".to_string(),
            hosts: vec!["web.example.com".to_string()],
            uris: Some(vec!["/".to_string()]),
            preserve_host: true,
            strip_uri: Some(false),
        }
    }

    fn converged() -> Api {
        Api {
            id: "api-1".to_string(),
            name: "web.example.com~350ca8af~prod".to_string(),
            upstream_url: "http://web.prod:8080".to_string(),
            hosts: vec!["web.example.com".to_string()],
            uris: Some(vec!["/".to_string()]),
            preserve_host: true,
            strip_uri: Some(false),
        }
    }

    #[tokio::test]
    async fn test_creates_api_when_missing() {
        let mut gateway = MockGatewayAdmin::new();
        let want = desired();

        gateway
            .expect_get_api()
            .with(eq("web.example.com~350ca8af~prod"))
            .times(1)
            .returning(|_| Ok(None));
        gateway
            .expect_create_api()
            .withf(|api| {
                api.name == "web.example.com~350ca8af~prod"
                    && api.upstream_url == "http://web.prod:8080"
                    && api.preserve_host
                    && api.strip_uri == Some(false)
            })
            .times(1)
            .returning(|_| Ok(converged()));

        reconcile_api(&gateway, &want).await.expect("should create");
    }

    #[tokio::test]
    async fn test_converged_api_emits_no_patches() {
        let mut gateway = MockGatewayAdmin::new();

        gateway
            .expect_get_api()
            .times(1)
            .returning(|_| Ok(Some(converged())));
        // No patch/create expectations: any call fails the test.

        reconcile_api(&gateway, &desired()).await.expect("no-op");
    }

    #[tokio::test]
    async fn test_upstream_drift_patches_only_upstream() {
        let mut gateway = MockGatewayAdmin::new();

        gateway.expect_get_api().times(1).returning(|_| {
            let mut api = converged();
            api.upstream_url = "http://web-old.prod:8080".to_string();
            Ok(Some(api))
        });
        gateway
            .expect_patch_api()
            .withf(|patch| {
                patch.id == "api-1"
                    && patch.upstream_url.as_deref() == Some("http://web.prod:8080")
                    && patch.hosts.is_none()
                    && patch.preserve_host.is_none()
                    && patch.strip_uri.is_none()
                    && patch.uris.is_none()
            })
            .times(1)
            .returning(|_| Ok(converged()));

        reconcile_api(&gateway, &desired()).await.expect("should patch");
    }

    #[tokio::test]
    async fn test_host_drift_patches_only_hosts() {
        let mut gateway = MockGatewayAdmin::new();

        gateway.expect_get_api().times(1).returning(|_| {
            let mut api = converged();
            api.hosts = vec!["some-other-host".to_string()];
            Ok(Some(api))
        });
        gateway
            .expect_patch_api()
            .withf(|patch| {
                patch.id == "api-1"
                    && patch.hosts.as_deref() == Some(&["web.example.com".to_string()][..])
                    && patch.upstream_url.is_none()
            })
            .times(1)
            .returning(|_| Ok(converged()));

        reconcile_api(&gateway, &desired()).await.expect("should patch");
    }

    #[tokio::test]
    async fn test_multiple_hosts_count_as_drift() {
        let mut gateway = MockGatewayAdmin::new();

        gateway.expect_get_api().times(1).returning(|_| {
            let mut api = converged();
            api.hosts = vec!["web.example.com".to_string(), "extra.example.com".to_string()];
            Ok(Some(api))
        });
        gateway
            .expect_patch_api()
            .withf(|patch| patch.hosts.is_some())
            .times(1)
            .returning(|_| Ok(converged()));

        reconcile_api(&gateway, &desired()).await.expect("should patch");
    }

    #[tokio::test]
    async fn test_fully_drifted_api_patches_each_field_in_order() {
        let mut gateway = MockGatewayAdmin::new();
        let mut order = Sequence::new();

        gateway.expect_get_api().times(1).returning(|_| {
            Ok(Some(Api {
                id: "api-1".to_string(),
                name: "web.example.com~350ca8af~prod".to_string(),
                upstream_url: "http://stale.prod:80".to_string(),
                hosts: vec![],
                uris: None,
                preserve_host: false,
                strip_uri: Some(true),
            }))
        });

        gateway
            .expect_patch_api()
            .withf(|p| p.upstream_url.is_some())
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(converged()));
        gateway
            .expect_patch_api()
            .withf(|p| p.hosts.is_some())
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(converged()));
        gateway
            .expect_patch_api()
            .withf(|p| p.preserve_host == Some(true))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(converged()));
        gateway
            .expect_patch_api()
            .withf(|p| p.strip_uri == Some(false))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(converged()));
        gateway
            .expect_patch_api()
            .withf(|p| p.uris.is_some())
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(converged()));

        reconcile_api(&gateway, &desired()).await.expect("should patch all");
    }

    #[tokio::test]
    async fn test_missing_strip_uri_is_drift() {
        // An older gateway that never set strip_uri still gets pinned false.
        let mut gateway = MockGatewayAdmin::new();

        gateway.expect_get_api().times(1).returning(|_| {
            let mut api = converged();
            api.strip_uri = None;
            Ok(Some(api))
        });
        gateway
            .expect_patch_api()
            .withf(|p| p.strip_uri == Some(false))
            .times(1)
            .returning(|_| Ok(converged()));

        reconcile_api(&gateway, &desired()).await.expect("should patch");
    }

    #[tokio::test]
    async fn test_patch_failure_is_surfaced() {
        let mut gateway = MockGatewayAdmin::new();

        gateway.expect_get_api().times(1).returning(|_| {
            let mut api = converged();
            api.upstream_url = "http://stale.prod:80".to_string();
            Ok(Some(api))
        });
        gateway.expect_patch_api().times(1).returning(|_| {
            Err(Error::Unavailable {
                status: 502,
                message: "bad gateway".to_string(),
            })
        });

        let result = reconcile_api(&gateway, &desired()).await;
        assert!(matches!(result, Err(Error::Unavailable { status: 502, .. })));
    }

    #[tokio::test]
    async fn test_delete_fetches_then_deletes() {
        let mut gateway = MockGatewayAdmin::new();
        let mut order = Sequence::new();

        gateway
            .expect_get_api()
            .with(eq("boringservice.infra~350ca8af~infra"))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(Some(converged())));
        gateway
            .expect_delete_api()
            .with(eq("boringservice.infra~350ca8af~infra"))
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Ok(()));

        delete_gateway_api(&gateway, "boringservice.infra~350ca8af~infra")
            .await
            .expect("should delete");
    }

    #[tokio::test]
    async fn test_delete_missing_api_is_not_found() {
        let mut gateway = MockGatewayAdmin::new();

        gateway.expect_get_api().times(1).returning(|_| Ok(None));
        // delete_api must not be called for a record that is already gone.

        let result = delete_gateway_api(&gateway, "ghost~1234~prod").await;
        assert!(matches!(result, Err(Error::NotFound(name)) if name == "ghost~1234~prod"));
    }
}
