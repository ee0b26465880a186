//! # Reconcile Context
//!
//! Shared state handed to every reconcile invocation: the resource store,
//! controller configuration and per-resource error backoff.

use crate::config::ControllerConfig;
use crate::constants::DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS;
use crate::controller::backoff::FibonacciBackoff;
use crate::crd::ResourceKind;
use crate::error::ReconcileError;
use crate::store::{ResourceKey, ResourceStore};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// Context shared by the three controllers
pub struct Context {
    pub store: Arc<dyn ResourceStore>,
    pub config: ControllerConfig,
    /// Backoff per `kind/namespace/name`. Entries are removed on success or
    /// once the object is gone.
    backoff_states: Mutex<HashMap<String, FibonacciBackoff>>,
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Context {
    #[must_use]
    pub fn new(store: Arc<dyn ResourceStore>, config: ControllerConfig) -> Self {
        Self {
            store,
            config,
            backoff_states: Mutex::new(HashMap::new()),
        }
    }

    /// Run `work` under the configured per-invocation deadline.
    ///
    /// When the deadline elapses the future is dropped, which cancels any
    /// in-flight store call.
    pub async fn with_deadline<T, F>(&self, kind: ResourceKind, work: F) -> Result<T, ReconcileError>
    where
        F: Future<Output = Result<T, ReconcileError>>,
    {
        let timeout = self.config.reconcile_timeout();
        match tokio::time::timeout(timeout, work).await {
            Ok(result) => result,
            Err(_) => Err(ReconcileError::DeadlineExceeded { kind, timeout }),
        }
    }

    /// Next retry delay for a failing resource, advancing its backoff
    pub fn next_backoff(&self, kind: ResourceKind, key: &ResourceKey) -> Duration {
        match self.backoff_states.lock() {
            Ok(mut states) => states
                .entry(backoff_key(kind, key))
                .or_insert_with(|| {
                    FibonacciBackoff::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                })
                .next_backoff(),
            Err(e) => {
                warn!("Failed to lock backoff_states: {}, using default backoff", e);
                Duration::from_secs(DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS)
            }
        }
    }

    /// Forget the backoff of a resource after it reconciled successfully
    pub fn reset_backoff(&self, kind: ResourceKind, key: &ResourceKey) {
        match self.backoff_states.lock() {
            Ok(mut states) => {
                states.remove(&backoff_key(kind, key));
            }
            Err(e) => warn!("Failed to lock backoff_states: {}, backoff not reset", e),
        }
    }
}

fn backoff_key(kind: ResourceKind, key: &ResourceKey) -> String {
    format!("{}/{}", kind.as_str(), key)
}
