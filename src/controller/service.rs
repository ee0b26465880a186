//! # Service Reconciler
//!
//! Provisions one workload Deployment per Service record, named after the
//! record and placed in its namespace. The template is fixed: one replica,
//! container `web` running `lorenzodagostinorad/cnauthserver:0.0.1`, selector
//! and pod labels `app=demo`.
//!
//! Fetch-or-create: an existing Deployment (or losing a create race to one)
//! is a no-op. The Deployment is never updated or deleted here; the owner
//! reference lets the garbage collector remove it with its Service.

use super::{drive, Context, ReconcileOutcome};
use crate::constants::{
    WORKLOAD_CONTAINER_NAME, WORKLOAD_IMAGE, WORKLOAD_LABEL_KEY, WORKLOAD_LABEL_VALUE,
    WORKLOAD_REPLICAS,
};
use crate::crd::{ResourceKind, Service};
use crate::error::{ReconcileError, StoreError};
use crate::observability::metrics;
use crate::store::ResourceKey;
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{Container, PodSpec, PodTemplateSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::Resource;
use kube_runtime::controller::Action;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Controller entry point
pub async fn reconcile(obj: Arc<Service>, ctx: Arc<Context>) -> Result<Action, ReconcileError> {
    let key = ResourceKey::from_resource(obj.as_ref());
    reconcile_by_key(&key, &ctx)
        .await
        .map(ReconcileOutcome::into_action)
}

/// Reconcile the Service identified by `key`
pub async fn reconcile_by_key(
    key: &ResourceKey,
    ctx: &Context,
) -> Result<ReconcileOutcome, ReconcileError> {
    drive(ResourceKind::Service, key, ctx, converge(key, ctx)).await
}

async fn converge(key: &ResourceKey, ctx: &Context) -> Result<ReconcileOutcome, ReconcileError> {
    let service = match ctx.store.get_service(&key.namespace, &key.name).await {
        Ok(found) => found,
        Err(StoreError::NotFound { .. }) => {
            debug!("Service deleted, nothing to do");
            return Ok(ReconcileOutcome::Missing);
        }
        Err(e) => return Err(e.into()),
    };

    match ctx.store.get_deployment(&key.namespace, &key.name).await {
        Ok(_) => return Ok(ReconcileOutcome::Unchanged),
        Err(StoreError::NotFound { .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let deployment = workload_deployment(key, &service);
    match ctx.store.create_deployment(&deployment).await {
        Ok(_) => {
            metrics::increment_deployments_created();
            info!(image = WORKLOAD_IMAGE, "workload Deployment created");
            Ok(ReconcileOutcome::Created)
        }
        Err(StoreError::AlreadyExists { .. }) => {
            debug!("workload Deployment created concurrently");
            Ok(ReconcileOutcome::Unchanged)
        }
        Err(e) => Err(e.into()),
    }
}

/// Label set used for both the selector and the pod template
#[must_use]
pub fn workload_labels() -> BTreeMap<String, String> {
    BTreeMap::from([(
        WORKLOAD_LABEL_KEY.to_string(),
        WORKLOAD_LABEL_VALUE.to_string(),
    )])
}

/// Build the fixed workload Deployment for `service`.
///
/// A controller owner reference is attached when the record has a UID.
#[must_use]
pub fn workload_deployment(key: &ResourceKey, service: &Service) -> Deployment {
    let owner_references = service.controller_owner_ref(&()).map(|owner| vec![owner]);

    Deployment {
        metadata: ObjectMeta {
            name: Some(key.name.clone()),
            namespace: Some(key.namespace.clone()),
            owner_references,
            ..ObjectMeta::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(WORKLOAD_REPLICAS),
            selector: LabelSelector {
                match_labels: Some(workload_labels()),
                ..LabelSelector::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(workload_labels()),
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![Container {
                        name: WORKLOAD_CONTAINER_NAME.to_string(),
                        image: Some(WORKLOAD_IMAGE.to_string()),
                        ..Container::default()
                    }],
                    ..PodSpec::default()
                }),
            },
            ..DeploymentSpec::default()
        }),
        ..Deployment::default()
    }
}
