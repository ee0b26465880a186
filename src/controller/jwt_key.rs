//! # JWTKey Reconciler
//!
//! Publishes a JWTKey's desired key material as observed state.

use super::{drive, Context, ReconcileOutcome};
use crate::crd::{JwtKey, JwtKeyStatus, ResourceKind};
use crate::error::{ReconcileError, StoreError};
use crate::observability::metrics;
use crate::store::ResourceKey;
use kube_runtime::controller::Action;
use std::sync::Arc;
use tracing::{debug, info};

/// Controller entry point
pub async fn reconcile(obj: Arc<JwtKey>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let key = ResourceKey::from_resource(obj.as_ref());
    reconcile_by_key(&key, &ctx)
        .await
        .map(ReconcileOutcome::into_action)
}

/// Reconcile the JWTKey identified by `key`
pub async fn reconcile_by_key(
    key: &ResourceKey,
    ctx: &Context,
) -> Result<ReconcileOutcome, ReconcileError> {
    drive(ResourceKind::JwtKey, key, ctx, converge(key, ctx)).await
}

async fn converge(key: &ResourceKey, ctx: &Context) -> Result<ReconcileOutcome, ReconcileError> {
    let mut jwt_key = match ctx.store.get_jwt_key(&key.namespace, &key.name).await {
        Ok(found) => found,
        Err(StoreError::NotFound { .. }) => {
            debug!("JWTKey deleted, nothing to do");
            return Ok(ReconcileOutcome::Missing);
        }
        Err(e) => return Err(e.into()),
    };

    if jwt_key.is_materialized() {
        return Ok(ReconcileOutcome::Unchanged);
    }

    jwt_key.status = Some(JwtKeyStatus {
        key: jwt_key.spec.key.clone(),
    });
    ctx.store.update_jwt_key_status(&jwt_key).await?;

    metrics::increment_keys_materialized();
    info!("JWTKey status updated");
    Ok(ReconcileOutcome::Updated)
}
