use std::sync::Arc;

use anyhow::{bail, Context, Result};
use kube::Client;
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use kong_admin_client::AdminClient;
use kong_ingress_operator::cluster::{KubeIngressLister, KubeSecretReader};
use kong_ingress_operator::config::ControllerConfig;
use kong_ingress_operator::controllers::{ingress, ControllerContext};
use kong_ingress_operator::reaper;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().json())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    info!("kong-ingress-operator starting");

    let config = ControllerConfig::from_env().context("Failed to load configuration")?;
    info!(
        admin_url = %config.admin_url,
        ingress_class = %config.ingress_class,
        full_resync_secs = config.full_resync_seconds,
        "Loaded configuration"
    );

    let kube_client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;
    info!("Connected to Kubernetes cluster");

    let gateway = AdminClient::new(&config.admin_url).context("Failed to create gateway client")?;

    let ctx = Arc::new(ControllerContext {
        gateway: Arc::new(gateway),
        ingresses: Arc::new(KubeIngressLister::new(kube_client.clone())),
        secrets: Arc::new(KubeSecretReader::new(kube_client.clone())),
        config: Arc::new(config),
    });

    let shutdown = CancellationToken::new();

    let mut sigterm = signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    select! {
        result = ingress::run(kube_client.clone(), ctx.clone(), shutdown.clone()) => {
            // The watch loop only returns on stream exhaustion; let the pod restart.
            shutdown.cancel();
            return result.context("Ingress watch failure");
        }
        _ = reaper::run(ctx.clone(), shutdown.clone()) => {
            shutdown.cancel();
            bail!("Reaper exited unexpectedly");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down");
        }
    }

    shutdown.cancel();
    info!("Shutdown complete");

    Ok(())
}
