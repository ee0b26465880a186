//! # User Reconciler
//!
//! Resolves a User's `keyRef` to a JWTKey in the same namespace, signs an
//! HS256 token for `spec.name` with the key's observed material and writes it
//! to `status.token`.
//!
//! Any failure after the User itself was found (unresolvable key, key not
//! materialized yet, signing, persistence) is returned for a retry and leaves
//! the stored token as it was.

use super::{drive, token, Context, ReconcileOutcome};
use crate::crd::{JwtKey, ResourceKind, User, UserStatus};
use crate::error::{ReconcileError, StoreError};
use crate::observability::metrics;
use crate::store::ResourceKey;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use kube_runtime::reflector::ObjectRef;
use std::sync::Arc;
use tracing::{debug, info};

/// Controller entry point
pub async fn reconcile(obj: Arc<User>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let key = ResourceKey::from_resource(obj.as_ref());
    reconcile_by_key(&key, &ctx)
        .await
        .map(ReconcileOutcome::into_action)
}

/// Reconcile the User identified by `key`
pub async fn reconcile_by_key(
    key: &ResourceKey,
    ctx: &Context,
) -> Result<ReconcileOutcome, ReconcileError> {
    drive(ResourceKind::User, key, ctx, converge(key, ctx)).await
}

async fn converge(key: &ResourceKey, ctx: &Context) -> Result<ReconcileOutcome, ReconcileError> {
    let mut user = match ctx.store.get_user(&key.namespace, &key.name).await {
        Ok(found) => found,
        Err(StoreError::NotFound { .. }) => {
            debug!("User deleted, nothing to do");
            return Ok(ReconcileOutcome::Missing);
        }
        Err(e) => return Err(e.into()),
    };

    if user.spec.key_ref.is_empty() {
        return Err(ReconcileError::MissingKeyRef {
            namespace: key.namespace.clone(),
            name: key.name.clone(),
        });
    }

    let key_ref = key.sibling(&user.spec.key_ref);
    let jwt_key = ctx
        .store
        .get_jwt_key(&key_ref.namespace, &key_ref.name)
        .await
        .map_err(|source| ReconcileError::KeyRef {
            namespace: key_ref.namespace.clone(),
            name: key_ref.name.clone(),
            source,
        })?;

    let key_material = match jwt_key.observed_key() {
        Some(material) if !material.is_empty() => material,
        _ => {
            return Err(ReconcileError::KeyNotReady {
                namespace: key_ref.namespace,
                name: key_ref.name,
            })
        }
    };

    let signed = token::issue_token(&user.spec.name, key_material)?;
    if signed == user.issued_token() {
        return Ok(ReconcileOutcome::Unchanged);
    }

    user.status = Some(UserStatus { token: signed });
    ctx.store.update_user_status(&user).await?;

    metrics::increment_tokens_issued();
    info!(key_ref = %key_ref.name, "User token issued");
    Ok(ReconcileOutcome::Updated)
}

/// Users in the key's namespace whose `keyRef` names it.
///
/// Drives the User controller's secondary watch on JWTKeys so tokens
/// converge once a key is (re)materialized.
pub fn users_referencing(users: &[Arc<User>], jwt_key: &JwtKey) -> Vec<ObjectRef<User>> {
    let namespace = jwt_key.namespace();
    let name = jwt_key.name_any();

    users
        .iter()
        .filter(|user| user.namespace() == namespace && user.spec.key_ref == name)
        .map(|user| ObjectRef::from_obj(user.as_ref()))
        .collect()
}
