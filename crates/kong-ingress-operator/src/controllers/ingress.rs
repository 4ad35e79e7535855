//! Ingress event dispatcher
//!
//! Consumes the watch stream over all-namespace ingresses and hands each
//! eligible (rule, path) pair to the gateway reconciler. Adds and updates
//! are deliberately the same handler - reprocessing an ingress is idempotent
//! because the reconciler only writes drifted fields - and deletes remove
//! the corresponding gateway records. A resync ticker re-applies the full
//! ingress snapshot at the configured interval, which is what heals the
//! gateway after an outage window where individual events were lost.

use std::sync::Arc;

use anyhow::bail;
use futures::StreamExt;
use k8s_openapi::api::networking::v1::Ingress;
use kube::runtime::watcher;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::{Api, Client, ResourceExt};
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::ControllerContext;
use crate::{certificates, sync, translate};

/// Run the dispatcher until the watch stream ends or `shutdown` fires.
pub async fn run(
    client: Client,
    ctx: Arc<ControllerContext>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let api: Api<Ingress> = Api::all(client);
    let stream = watcher(api, WatcherConfig::default());
    futures::pin_mut!(stream);

    let mut resync = interval(ctx.config.full_resync_interval());
    resync.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!("Starting ingress watch");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Ingress watch stopping");
                return Ok(());
            }
            _ = resync.tick() => {
                if let Err(e) = resync_all(&ctx).await {
                    warn!(error = %e, "Full resync failed; retrying next interval");
                }
            }
            event = stream.next() => match event {
                Some(Ok(watcher::Event::Apply(ingress)))
                | Some(Ok(watcher::Event::InitApply(ingress))) => {
                    ingress_changed(&ctx, &ingress).await;
                }
                Some(Ok(watcher::Event::Delete(ingress))) => {
                    ingress_deleted(&ctx, &ingress).await;
                }
                Some(Ok(watcher::Event::Init)) => {
                    debug!("Ingress watch initializing");
                }
                Some(Ok(watcher::Event::InitDone)) => {
                    info!("Ingress watch initial sync complete");
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Ingress watch error");
                }
                None => bail!("ingress watch stream ended"),
            }
        }
    }
}

/// Re-apply every ingress in the cluster, standing in for the informer's
/// periodic full re-delivery.
pub async fn resync_all(ctx: &ControllerContext) -> Result<(), crate::cluster::ClusterError> {
    let ingresses = ctx.ingresses.list_all().await?;
    debug!(count = ingresses.len(), "Resyncing ingress snapshot");
    for ingress in &ingresses {
        ingress_changed(ctx, ingress).await;
    }
    Ok(())
}

/// Added/updated handler: reconcile every (rule, path) pair of an eligible,
/// supported ingress, then its TLS certificates. Per-pair failures are
/// logged and the remaining pairs still proceed.
pub async fn ingress_changed(ctx: &ControllerContext, ingress: &Ingress) {
    if !translate::is_eligible(ingress, &ctx.config.ingress_class) {
        return;
    }

    let name = ingress.name_any();
    let namespace = ingress.namespace().unwrap_or_else(|| "default".to_string());

    if let Err(reason) = translate::validate(ingress) {
        error!(
            ingress = %name,
            namespace = %namespace,
            error = %reason,
            "Unsupported ingress"
        );
        return;
    }

    debug!(ingress = %name, namespace = %namespace, "Reconciling ingress with gateway");

    for pair in translate::route_pairs(ingress) {
        let desired = translate::desired_api(&pair);
        if let Err(e) = sync::reconcile_api(ctx.gateway.as_ref(), &desired).await {
            error!(
                api = %desired.name,
                ingress = %name,
                error = %e,
                "Failed to create or update API"
            );
        }
    }

    for tls in ingress.spec.iter().flat_map(|spec| spec.tls.iter().flatten()) {
        if let Err(e) = certificates::reconcile_certificates(
            ctx.gateway.as_ref(),
            ctx.secrets.as_ref(),
            &namespace,
            tls,
        )
        .await
        {
            error!(
                ingress = %name,
                namespace = %namespace,
                error = %e,
                "Failed to reconcile certificate"
            );
        }
    }
}

/// Deleted handler: remove the gateway record for every (rule, path) pair.
pub async fn ingress_deleted(ctx: &ControllerContext, ingress: &Ingress) {
    if !translate::is_eligible(ingress, &ctx.config.ingress_class) {
        return;
    }

    let name = ingress.name_any();
    let namespace = ingress.namespace().unwrap_or_else(|| "default".to_string());
    info!(ingress = %name, namespace = %namespace, "Ingress deleted, removing from gateway");

    for pair in translate::route_pairs(ingress) {
        let api_name = translate::qualified_api_name(&pair.host, &pair.path, &pair.namespace);
        if let Err(e) = sync::delete_gateway_api(ctx.gateway.as_ref(), &api_name).await {
            error!(api = %api_name, ingress = %name, error = %e, "Failed to delete gateway API");
        }
    }
}
