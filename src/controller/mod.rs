//! # Controller
//!
//! The three reconcilers and the pieces they share.
//!
//! - `backoff`: Fibonacci backoff for error requeues
//! - `context`: shared store, configuration and backoff state
//! - `jwt_key`: mirrors `JWTKey.spec.key` into status
//! - `service`: provisions the workload Deployment for a `Service`
//! - `token`: HS256 token issuance
//! - `user`: signs and publishes a token for a `User`
//!
//! Each reconciler is a single fetch, transform and persist (or fetch and
//! create) pass. They hold no state between invocations and never
//! call each other; coordination happens only through resource state.

pub mod backoff;
pub mod context;
pub mod jwt_key;
pub mod service;
pub mod token;
pub mod user;

pub use context::Context;

use crate::crd::ResourceKind;
use crate::error::ReconcileError;
use crate::observability::metrics;
use crate::store::ResourceKey;
use kube_runtime::controller::Action;
use std::future::Future;
use std::time::Instant;
use tracing::{debug, info_span, Instrument};

/// What a successful reconcile did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The primary resource no longer exists
    Missing,
    /// Observed state already matched; nothing was written
    Unchanged,
    /// Status was written
    Updated,
    /// A dependent resource was created
    Created,
}

impl ReconcileOutcome {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Unchanged => "unchanged",
            Self::Updated => "updated",
            Self::Created => "created",
        }
    }

    /// Every outcome is settled: wait for the next watch event.
    #[must_use]
    pub fn into_action(self) -> Action {
        Action::await_change()
    }
}

/// Run one reconcile pass for `key` with its span, deadline and metrics.
///
/// Success clears the resource's error backoff. Errors are returned
/// unchanged for the error policy to count and requeue.
pub async fn drive<F>(
    kind: ResourceKind,
    key: &ResourceKey,
    ctx: &Context,
    work: F,
) -> Result<ReconcileOutcome, ReconcileError>
where
    F: Future<Output = Result<ReconcileOutcome, ReconcileError>>,
{
    let span = info_span!(
        "controller.reconcile",
        resource.kind = kind.as_str(),
        resource.namespace = %key.namespace,
        resource.name = %key.name,
    );

    async move {
        let started = Instant::now();
        let result = ctx.with_deadline(kind, work).await;

        if let Ok(outcome) = &result {
            metrics::record_reconciliation(
                kind.as_str(),
                outcome.as_str(),
                started.elapsed().as_secs_f64(),
            );
            ctx.reset_backoff(kind, key);
            debug!(outcome = outcome.as_str(), "reconcile settled");
        }

        result
    }
    .instrument(span)
    .await
}
