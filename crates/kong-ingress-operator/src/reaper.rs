//! Orphan reaper
//!
//! Deletions can be missed while the controller is offline; the reaper
//! closes that hole. Every full-resync interval it lists the gateway's APIs
//! and the cluster's ingresses, derives the set of names an eligible ingress
//! still owns, and deletes every gateway API outside that set.
//!
//! The gateway is listed before the ingresses: an API created between the
//! two listings is simply absent from the reaped snapshot, so a fresh record
//! can never be mistaken for an orphan. Either listing failing aborts the
//! whole cycle with zero deletes - orphan removal is never performed on a
//! partial view.

use std::collections::HashSet;
use std::sync::Arc;

use thiserror::Error;
use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::cluster::ClusterError;
use crate::controllers::ControllerContext;
use crate::{sync, translate};

#[derive(Debug, Error)]
pub enum ReapError {
    #[error("failed to list gateway APIs: {0}")]
    Gateway(#[from] kong_admin_client::Error),

    #[error("failed to list ingresses: {0}")]
    Cluster(#[from] ClusterError),
}

/// Outcome of one completed reap cycle.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ReapOutcome {
    pub reaped: usize,
    pub failed: usize,
}

/// Run reap cycles at the full-resync interval until `shutdown` fires.
pub async fn run(ctx: Arc<ControllerContext>, shutdown: CancellationToken) {
    let mut tick = interval(ctx.config.full_resync_interval());
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    info!(
        interval_secs = ctx.config.full_resync_seconds,
        "Reaper watching for orphaned APIs"
    );

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Reaper stopping");
                return;
            }
            _ = tick.tick() => {}
        }

        debug!("Reaper looking for orphaned APIs");
        match reap_cycle(&ctx).await {
            Ok(outcome) if outcome.reaped > 0 || outcome.failed > 0 => {
                info!(reaped = outcome.reaped, failed = outcome.failed, "Reap cycle complete");
            }
            Ok(_) => debug!("Reap cycle complete, nothing orphaned"),
            Err(e) => error!(error = %e, "Failed to reap orphaned APIs"),
        }
    }
}

/// One sweep: delete every gateway API no eligible ingress owns.
pub async fn reap_cycle(ctx: &ControllerContext) -> Result<ReapOutcome, ReapError> {
    let apis = ctx.gateway.list_apis().await?;
    let ingresses = ctx.ingresses.list_all().await?;

    let mut expected: HashSet<String> = HashSet::new();
    for ingress in &ingresses {
        if !translate::is_eligible(ingress, &ctx.config.ingress_class) {
            continue;
        }
        for pair in translate::route_pairs(ingress) {
            expected.insert(translate::qualified_api_name(
                &pair.host,
                &pair.path,
                &pair.namespace,
            ));
        }
    }

    let mut outcome = ReapOutcome::default();
    for api in apis {
        if expected.contains(&api.name) {
            continue;
        }
        match sync::delete_gateway_api(ctx.gateway.as_ref(), &api.name).await {
            Ok(()) => {
                info!(api = %api.name, "Reaped orphaned gateway API");
                outcome.reaped += 1;
            }
            Err(e) => {
                error!(api = %api.name, error = %e, "Failed to reap orphaned gateway API");
                outcome.failed += 1;
            }
        }
    }

    Ok(outcome)
}
