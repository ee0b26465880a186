//! # Resource Store
//!
//! The reconcilers reach the cluster only through [`ResourceStore`]. The
//! production implementation is [`KubeStore`]; tests substitute mocks or an
//! in-memory store.
//!
//! Every method re-reads or writes the API server directly. Nothing is
//! cached between invocations.

mod kube_store;

pub use kube_store::KubeStore;

use crate::crd::{JwtKey, Service, User};
use crate::error::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use kube::ResourceExt;
use std::fmt;

#[cfg(test)]
use mockall::automock;

/// Namespace/name identity of a resource
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    pub namespace: String,
    pub name: String,
}

impl ResourceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Identity of a namespaced object. Objects without a namespace map to `default`.
    pub fn from_resource<K: ResourceExt>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_else(|| "default".to_string()),
            name: obj.name_any(),
        }
    }

    /// Identity of another object in the same namespace
    #[must_use]
    pub fn sibling(&self, name: &str) -> Self {
        Self::new(self.namespace.clone(), name)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Typed access to the resources the reconcilers read and write
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Fetch a JWTKey
    async fn get_jwt_key(&self, namespace: &str, name: &str) -> Result<JwtKey, StoreError>;

    /// Fetch a User
    async fn get_user(&self, namespace: &str, name: &str) -> Result<User, StoreError>;

    /// Fetch a Service record
    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError>;

    /// Fetch a Deployment
    async fn get_deployment(&self, namespace: &str, name: &str)
        -> Result<Deployment, StoreError>;

    /// Persist `key.status`. Fails with [`StoreError::Conflict`] when the
    /// object changed since `key` was read.
    async fn update_jwt_key_status(&self, key: &JwtKey) -> Result<JwtKey, StoreError>;

    /// Persist `user.status`. Fails with [`StoreError::Conflict`] when the
    /// object changed since `user` was read.
    async fn update_user_status(&self, user: &User) -> Result<User, StoreError>;

    /// Create a Deployment. Fails with [`StoreError::AlreadyExists`] when an
    /// object with the same name is present.
    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError>;
}
