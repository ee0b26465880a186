//! # Initialization
//!
//! Controller initialization: rustls setup, tracing, metrics, server
//! startup, Kubernetes client, resource registry and the startup check that
//! every registered kind can be listed.

use crate::config::ControllerConfig;
use crate::constants::DEFAULT_LOG_FILTER;
use crate::controller::Context;
use crate::crd::{RegisteredKind, ResourceRegistry};
use crate::observability;
use crate::server::{start_server, ServerState};
use crate::store::KubeStore;
use anyhow::{anyhow, Context as _, Result};
use kube::api::{Api, DynamicObject, ListParams};
use kube::{Client, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn, Instrument};

/// Everything the watch loop needs
pub struct InitializationResult {
    pub client: Client,
    pub context: Arc<Context>,
    pub registry: ResourceRegistry,
    pub server_state: Arc<ServerState>,
}

/// Initialize the controller runtime
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any TLS connection is made.
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();

    init_tracing()?;
    if !provider_installed {
        warn!("rustls crypto provider was already installed");
    }

    info!("Starting CNAuth Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    let config = ControllerConfig::from_env();
    info!(?config, "Loaded controller configuration");

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_state_clone = Arc::clone(&server_state);
    let server_port = config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&config, &server_state, &server_handle).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let registry = ResourceRegistry::new();
    for entry in registry.iter() {
        check_kind_queryable(&client, entry, config.watch_namespace.as_deref()).await;
    }

    let store = Arc::new(KubeStore::new(client.clone()));
    let context = Arc::new(Context::new(store, config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        client,
        context,
        registry,
        server_state,
    })
}

fn init_tracing() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .try_init()
        .map_err(|e| anyhow!("Failed to initialize tracing: {e}"))
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    config: &ControllerConfig,
    server_state: &ServerState,
    server_handle: &tokio::task::JoinHandle<()>,
) -> Result<()> {
    let startup_timeout = config.startup_timeout();
    let poll_interval = config.poll_interval();
    let start_time = tokio::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// List a registered kind and log a per-namespace summary.
///
/// A kind that cannot be listed (CRD not installed, RBAC) is logged and
/// skipped; its controller keeps retrying the watch.
async fn check_kind_queryable(client: &Client, entry: &RegisteredKind, namespace: Option<&str>) {
    let ar = entry.kind.api_resource();
    let api: Api<DynamicObject> = match namespace {
        Some(ns) => Api::namespaced_with(client.clone(), ns, &ar),
        None => Api::all_with(client.clone(), &ar),
    };

    let span = tracing::info_span!(
        "controller.startup.check_kind",
        resource.kind = entry.kind.as_str()
    );
    let listed = api.list(&ListParams::default()).instrument(span.clone()).await;
    let _guard = span.enter();

    match listed {
        Ok(list) => {
            let mut by_namespace: BTreeMap<String, Vec<String>> = BTreeMap::new();
            for item in &list.items {
                by_namespace
                    .entry(item.namespace().unwrap_or_else(|| "default".to_string()))
                    .or_default()
                    .push(item.name_any());
            }

            info!(
                "{} is queryable: {} resources in {} namespaces",
                entry.kind,
                list.items.len(),
                by_namespace.len()
            );
            for (namespace, mut names) in by_namespace {
                names.sort();
                info!("  {}: {}", namespace, summarize_names(&names));
            }
        }
        Err(e) => {
            let crd_name = entry.definition.metadata.name.as_deref().unwrap_or_default();
            error!("{} is not queryable: {}. Is CRD {} installed?", entry.kind, e, crd_name);
            warn!("Continuing despite failed check - controller will retry the watch");
        }
    }
}

/// At most three names, then a total
fn summarize_names(names: &[String]) -> String {
    if names.len() <= 3 {
        names.join(", ")
    } else {
        format!("{}, ... ({} total)", names[..3].join(", "), names.len())
    }
}
