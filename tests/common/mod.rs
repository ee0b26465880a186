//! Common test utilities for reconciler integration tests
//!
//! Provides an in-memory `ResourceStore` with API-server-like behaviour:
//! resourceVersion checks on status writes, AlreadyExists on duplicate
//! creates and optional per-call latency.

#![allow(dead_code, reason = "each test crate uses a different subset")]

use async_trait::async_trait;
use cnauth_controller::config::ControllerConfig;
use cnauth_controller::controller::Context;
use cnauth_controller::crd::{JwtKey, JwtKeySpec, Service, ServiceSpec, User, UserSpec};
use cnauth_controller::error::StoreError;
use cnauth_controller::store::ResourceStore;
use k8s_openapi::api::apps::v1::Deployment;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Key = (String, String);

#[derive(Default)]
struct State {
    jwt_keys: BTreeMap<Key, JwtKey>,
    users: BTreeMap<Key, User>,
    services: BTreeMap<Key, Service>,
    deployments: BTreeMap<Key, Deployment>,
    resource_version: u64,
    status_writes: usize,
    creates: usize,
}

impl State {
    fn next_version(&mut self) -> String {
        self.resource_version += 1;
        self.resource_version.to_string()
    }
}

/// In-memory stand-in for the API server
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    latency: Option<Duration>,
}

fn key_of<K: ResourceExt>(obj: &K) -> Key {
    (
        obj.namespace().unwrap_or_else(|| "default".to_string()),
        obj.name_any(),
    )
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every store call sleeps for `latency` before answering
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().expect("store mutex poisoned")
    }

    async fn delay(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }

    pub fn insert_jwt_key(&self, mut obj: JwtKey) {
        let mut state = self.lock();
        obj.metadata.resource_version = Some(state.next_version());
        state.jwt_keys.insert(key_of(&obj), obj);
    }

    pub fn insert_user(&self, mut obj: User) {
        let mut state = self.lock();
        obj.metadata.resource_version = Some(state.next_version());
        state.users.insert(key_of(&obj), obj);
    }

    pub fn insert_service(&self, mut obj: Service) {
        let mut state = self.lock();
        obj.metadata.resource_version = Some(state.next_version());
        state.services.insert(key_of(&obj), obj);
    }

    /// Change a JWTKey's desired key, as a concurrent writer would
    pub fn set_jwt_key_spec(&self, namespace: &str, name: &str, material: &str) {
        let mut state = self.lock();
        let version = state.next_version();
        if let Some(obj) = state.jwt_keys.get_mut(&key(namespace, name)) {
            obj.spec.key = material.to_string();
            obj.metadata.resource_version = Some(version);
        }
    }

    pub fn delete_jwt_key(&self, namespace: &str, name: &str) {
        self.lock().jwt_keys.remove(&key(namespace, name));
    }

    pub fn jwt_key(&self, namespace: &str, name: &str) -> Option<JwtKey> {
        self.lock().jwt_keys.get(&key(namespace, name)).cloned()
    }

    pub fn user(&self, namespace: &str, name: &str) -> Option<User> {
        self.lock().users.get(&key(namespace, name)).cloned()
    }

    pub fn deployment(&self, namespace: &str, name: &str) -> Option<Deployment> {
        self.lock().deployments.get(&key(namespace, name)).cloned()
    }

    pub fn deployment_count(&self) -> usize {
        self.lock().deployments.len()
    }

    /// Number of accepted status writes
    pub fn status_writes(&self) -> usize {
        self.lock().status_writes
    }

    /// Number of accepted creates
    pub fn creates(&self) -> usize {
        self.lock().creates
    }
}

/// Replace the stored status if `incoming` was read at the current version
fn write_status<K, S>(
    kind: &'static str,
    stored: Option<&mut K>,
    incoming: &K,
    status: impl FnOnce(&mut K) -> &mut Option<S>,
    incoming_status: Option<S>,
    version: String,
) -> Result<K, StoreError>
where
    K: Resource + Clone,
{
    let (namespace, name) = key_of(incoming);
    let Some(stored) = stored else {
        return Err(StoreError::not_found(kind, &namespace, &name));
    };
    if stored.resource_version() != incoming.resource_version() {
        return Err(StoreError::conflict(
            kind,
            &namespace,
            &name,
            "the object has been modified; please apply your changes to the latest version",
        ));
    }
    *status(stored) = incoming_status;
    stored.meta_mut().resource_version = Some(version);
    Ok(stored.clone())
}

#[async_trait]
impl ResourceStore for InMemoryStore {
    async fn get_jwt_key(&self, namespace: &str, name: &str) -> Result<JwtKey, StoreError> {
        self.delay().await;
        self.jwt_key(namespace, name)
            .ok_or_else(|| StoreError::not_found("JWTKey", namespace, name))
    }

    async fn get_user(&self, namespace: &str, name: &str) -> Result<User, StoreError> {
        self.delay().await;
        self.user(namespace, name)
            .ok_or_else(|| StoreError::not_found("User", namespace, name))
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError> {
        self.delay().await;
        self.lock()
            .services
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| StoreError::not_found("Service", namespace, name))
    }

    async fn get_deployment(&self, namespace: &str, name: &str) -> Result<Deployment, StoreError> {
        self.delay().await;
        self.deployment(namespace, name)
            .ok_or_else(|| StoreError::not_found("Deployment", namespace, name))
    }

    async fn update_jwt_key_status(&self, obj: &JwtKey) -> Result<JwtKey, StoreError> {
        self.delay().await;
        let mut state = self.lock();
        let version = state.next_version();
        let updated = write_status(
            "JWTKey",
            state.jwt_keys.get_mut(&key_of(obj)),
            obj,
            |k| &mut k.status,
            obj.status.clone(),
            version,
        )?;
        state.status_writes += 1;
        Ok(updated)
    }

    async fn update_user_status(&self, obj: &User) -> Result<User, StoreError> {
        self.delay().await;
        let mut state = self.lock();
        let version = state.next_version();
        let updated = write_status(
            "User",
            state.users.get_mut(&key_of(obj)),
            obj,
            |u| &mut u.status,
            obj.status.clone(),
            version,
        )?;
        state.status_writes += 1;
        Ok(updated)
    }

    async fn create_deployment(&self, obj: &Deployment) -> Result<Deployment, StoreError> {
        self.delay().await;
        let mut state = self.lock();
        let (namespace, name) = key_of(obj);
        if state.deployments.contains_key(&(namespace.clone(), name.clone())) {
            return Err(StoreError::already_exists("Deployment", &namespace, &name));
        }
        let mut created = obj.clone();
        created.metadata.resource_version = Some(state.next_version());
        state.deployments.insert((namespace, name), created.clone());
        state.creates += 1;
        Ok(created)
    }
}

pub fn jwt_key(namespace: &str, name: &str, material: &str) -> JwtKey {
    let mut obj = JwtKey::new(
        name,
        JwtKeySpec {
            key: material.to_string(),
        },
    );
    obj.metadata.namespace = Some(namespace.to_string());
    obj
}

pub fn user(namespace: &str, name: &str, username: &str, key_ref: &str) -> User {
    let mut obj = User::new(
        name,
        UserSpec {
            name: username.to_string(),
            key_ref: key_ref.to_string(),
        },
    );
    obj.metadata.namespace = Some(namespace.to_string());
    obj
}

pub fn service(namespace: &str, name: &str) -> Service {
    let mut obj = Service::new(name, ServiceSpec {});
    obj.metadata.namespace = Some(namespace.to_string());
    obj.metadata.uid = Some(format!("uid-{namespace}-{name}"));
    obj
}

pub fn context(store: &Arc<InMemoryStore>) -> Context {
    context_with(store, ControllerConfig::default())
}

pub fn context_with(store: &Arc<InMemoryStore>, config: ControllerConfig) -> Context {
    Context::new(Arc::clone(store) as Arc<dyn ResourceStore>, config)
}
