//! # Error Policy
//!
//! Error handling and backoff for the controller watch loop: reconcile
//! failures are requeued with per-resource Fibonacci backoff, and the
//! controller result stream is logged.

use crate::controller::Context;
use crate::crd::ResourceKind;
use crate::error::ReconcileError;
use crate::observability::metrics;
use crate::store::ResourceKey;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::watcher;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Requeue a failed resource after its next backoff delay.
///
/// Backoff state is tracked per resource, so many failing resources do not
/// slow each other down. Success resets it (see `controller::drive`), and so
/// does the object disappearing (see [`log_controller_result`]).
pub fn handle_reconciliation_error<K>(
    kind: ResourceKind,
    obj: &K,
    error: &ReconcileError,
    ctx: &Context,
) -> Action
where
    K: ResourceExt,
{
    let key = ResourceKey::from_resource(obj);
    let reason = error.reason();

    error!(
        resource.kind = kind.as_str(),
        resource.namespace = %key.namespace,
        resource.name = %key.name,
        reason,
        "Reconciliation error: {}",
        error
    );
    metrics::increment_reconciliation_errors(kind.as_str(), reason);

    let delay = ctx.next_backoff(kind, &key);
    let next_trigger_time = chrono::Utc::now()
        + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
    info!(
        "Retrying {} {} in {}s (next attempt {})",
        kind,
        key,
        delay.as_secs(),
        next_trigger_time.to_rfc3339()
    );

    metrics::increment_requeues_total(kind.as_str(), reason);
    Action::requeue(delay)
}

/// Log one item of a controller's result stream.
///
/// A requeue for a deleted object never reaches the reconciler, so its
/// backoff entry is dropped here.
pub fn log_controller_result<K>(
    kind: ResourceKind,
    result: Result<(ObjectRef<K>, Action), controller::Error<ReconcileError, watcher::Error>>,
    ctx: &Context,
) where
    K: Resource,
{
    match result {
        Ok((obj, _)) => debug!(resource.kind = kind.as_str(), "reconciled {}", obj),
        // Already logged and requeued by the error policy
        Err(controller::Error::ReconcilerFailed(_, obj)) => {
            debug!(resource.kind = kind.as_str(), "reconcile of {} failed", obj);
        }
        Err(controller::Error::ObjectNotFound(obj)) => {
            debug!(resource.kind = kind.as_str(), "{} no longer exists", obj);
            let namespace = obj.namespace.as_deref().unwrap_or("default");
            ctx.reset_backoff(kind, &ResourceKey::new(namespace, obj.name.as_str()));
        }
        Err(e) => warn!(resource.kind = kind.as_str(), "Controller stream error: {}", e),
    }
}

/// Convenience wrapper matching `Controller::run`'s error policy signature
pub fn error_policy_for<K>(
    kind: ResourceKind,
) -> impl Fn(Arc<K>, &ReconcileError, Arc<Context>) -> Action
where
    K: ResourceExt,
{
    move |obj: Arc<K>, error: &ReconcileError, ctx: Arc<Context>| {
        handle_reconciliation_error(kind, obj.as_ref(), error, &ctx)
    }
}
