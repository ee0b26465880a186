//! # Watch Loop
//!
//! Runs one `kube_runtime::Controller` per registered kind until a shutdown
//! signal arrives.
//!
//! - JWTKey: watches JWTKeys
//! - User: watches Users, and JWTKeys mapped to the Users referencing them
//! - Service: watches Services and the Deployments they own

use super::error_policy::{error_policy_for, log_controller_result};
use crate::controller::{jwt_key, service, user, Context};
use crate::crd::{JwtKey, ResourceKind, ResourceRegistry, Service, User};
use crate::server::ServerState;
use anyhow::Result;
use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::NamespaceResourceScope;
use kube::{Api, Client, Resource};
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::info;

/// Namespaced API, or cluster-wide when no namespace is configured
fn scoped_api<K>(client: &Client, namespace: Option<&str>) -> Api<K>
where
    K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
{
    match namespace {
        Some(ns) => Api::namespaced(client.clone(), ns),
        None => Api::all(client.clone()),
    }
}

/// Run the controllers for every kind in `registry` concurrently
pub async fn run_watch_loop(
    client: Client,
    ctx: Arc<Context>,
    registry: &ResourceRegistry,
    server_state: Arc<ServerState>,
) -> Result<()> {
    let namespace = ctx.config.watch_namespace.clone();
    let namespace = namespace.as_deref();
    let wc = watcher::Config::default();

    match namespace {
        Some(ns) => info!("Watching namespace {}", ns),
        None => info!("Watching all namespaces"),
    }

    let mut controllers: Vec<BoxFuture<'static, ()>> = Vec::new();

    if registry.contains(ResourceKind::JwtKey) {
        controllers.push(
            Controller::new(scoped_api::<JwtKey>(&client, namespace), wc.clone())
                .shutdown_on_signal()
                .run(
                    jwt_key::reconcile,
                    error_policy_for(ResourceKind::JwtKey),
                    Arc::clone(&ctx),
                )
                .for_each({
                    let ctx = Arc::clone(&ctx);
                    move |result| {
                        log_controller_result(ResourceKind::JwtKey, result, &ctx);
                        futures::future::ready(())
                    }
                })
                .boxed(),
        );
    }

    if registry.contains(ResourceKind::User) {
        let users = Controller::new(scoped_api::<User>(&client, namespace), wc.clone());
        let user_store = users.store();
        controllers.push(
            users
                .watches(
                    scoped_api::<JwtKey>(&client, namespace),
                    wc.clone(),
                    move |key| user::users_referencing(&user_store.state(), &key),
                )
                .shutdown_on_signal()
                .run(
                    user::reconcile,
                    error_policy_for(ResourceKind::User),
                    Arc::clone(&ctx),
                )
                .for_each({
                    let ctx = Arc::clone(&ctx);
                    move |result| {
                        log_controller_result(ResourceKind::User, result, &ctx);
                        futures::future::ready(())
                    }
                })
                .boxed(),
        );
    }

    if registry.contains(ResourceKind::Service) {
        controllers.push(
            Controller::new(scoped_api::<Service>(&client, namespace), wc.clone())
                .owns(scoped_api::<Deployment>(&client, namespace), wc.clone())
                .shutdown_on_signal()
                .run(
                    service::reconcile,
                    error_policy_for(ResourceKind::Service),
                    Arc::clone(&ctx),
                )
                .for_each({
                    let ctx = Arc::clone(&ctx);
                    move |result| {
                        log_controller_result(ResourceKind::Service, result, &ctx);
                        futures::future::ready(())
                    }
                })
                .boxed(),
        );
    }

    info!("Running {} controllers", controllers.len());
    futures::future::join_all(controllers).await;

    server_state.set_ready(false);
    info!("Controller stopped");
    Ok(())
}
