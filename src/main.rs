//! # CNAuth Controller
//!
//! A Kubernetes controller that issues credentials for declared identities.
//!
//! ## Overview
//!
//! Three reconcilers drive cluster state toward the declared resources in the
//! `keys.cnauth/v1alpha1` API group:
//!
//! 1. **JWTKey** - mirrors `spec.key` into `status.key`
//! 2. **User** - signs an HS256 token for `spec.name` with the JWTKey named by
//!    `spec.keyRef` and publishes it to `status.token`
//! 3. **Service** - provisions a one-replica Deployment running the CNAuth server
//!
//! ## Features
//!
//! - **Per-resource backoff**: failing resources are retried with Fibonacci backoff
//! - **Reconcile deadline**: every invocation is bounded by `RECONCILE_TIMEOUT_SECS`
//! - **Prometheus metrics**: exposed on `/metrics`
//! - **Health probes**: `/healthz` and `/readyz`

use anyhow::Result;
use cnauth_controller::runtime::{initialize, run_watch_loop};

#[tokio::main]
async fn main() -> Result<()> {
    let init_result = initialize().await?;

    run_watch_loop(
        init_result.client,
        init_result.context,
        &init_result.registry,
        init_result.server_state,
    )
    .await
}
