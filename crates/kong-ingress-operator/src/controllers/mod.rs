//! Kubernetes controllers for watched resources

pub mod ingress;

use std::sync::Arc;

use crate::cluster::{IngressLister, SecretReader};
use crate::config::ControllerConfig;
use crate::gateway::GatewayAdmin;

/// Shared state for the dispatcher and the reaper.
///
/// A handler object instead of closures: the informer-style callbacks are
/// methods over this context, bound once at startup.
pub struct ControllerContext {
    pub gateway: Arc<dyn GatewayAdmin>,
    pub ingresses: Arc<dyn IngressLister>,
    pub secrets: Arc<dyn SecretReader>,
    pub config: Arc<ControllerConfig>,
}
