//! # Kubernetes Store
//!
//! [`ResourceStore`] backed by the Kubernetes API server.

use super::ResourceStore;
use crate::constants::FIELD_MANAGER;
use crate::crd::{JwtKey, Service, User};
use crate::error::StoreError;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::NamespaceResourceScope;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;
use tracing::debug;

/// Store that talks to the API server through a shared `kube::Client`
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl Debug for KubeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStore").finish_non_exhaustive()
    }
}

impl KubeStore {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn get<K>(&self, kind: &'static str, namespace: &str, name: &str) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
    {
        self.api::<K>(namespace)
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, kind, namespace, name))
    }

    /// Merge-patch the status subresource of `obj`.
    ///
    /// The patch carries the `resourceVersion` that was read, so the API
    /// server rejects it with 409 Conflict if the object moved on since.
    async fn patch_status<K, S>(
        &self,
        kind: &'static str,
        obj: &K,
        status: &S,
    ) -> Result<K, StoreError>
    where
        K: Resource<Scope = NamespaceResourceScope, DynamicType = ()>
            + Clone
            + DeserializeOwned
            + Debug,
        S: Serialize,
    {
        let namespace = obj.namespace().unwrap_or_else(|| "default".to_string());
        let name = obj.name_any();
        let patch = serde_json::json!({
            "metadata": { "resourceVersion": obj.resource_version() },
            "status": status,
        });

        debug!(
            kind,
            namespace = %namespace,
            name = %name,
            "patching status"
        );

        self.api::<K>(&namespace)
            .patch_status(&name, &PatchParams::apply(FIELD_MANAGER), &Patch::Merge(&patch))
            .await
            .map_err(|e| StoreError::from_kube(e, kind, &namespace, &name))
    }
}

#[async_trait]
impl ResourceStore for KubeStore {
    async fn get_jwt_key(&self, namespace: &str, name: &str) -> Result<JwtKey, StoreError> {
        self.get("JWTKey", namespace, name).await
    }

    async fn get_user(&self, namespace: &str, name: &str) -> Result<User, StoreError> {
        self.get("User", namespace, name).await
    }

    async fn get_service(&self, namespace: &str, name: &str) -> Result<Service, StoreError> {
        self.get("Service", namespace, name).await
    }

    async fn get_deployment(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<Deployment, StoreError> {
        self.get("Deployment", namespace, name).await
    }

    async fn update_jwt_key_status(&self, key: &JwtKey) -> Result<JwtKey, StoreError> {
        self.patch_status("JWTKey", key, &key.status).await
    }

    async fn update_user_status(&self, user: &User) -> Result<User, StoreError> {
        self.patch_status("User", user, &user.status).await
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment, StoreError> {
        let namespace = deployment
            .namespace()
            .unwrap_or_else(|| "default".to_string());
        let name = deployment.name_any();
        let params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..PostParams::default()
        };

        self.api::<Deployment>(&namespace)
            .create(&params, deployment)
            .await
            .map_err(|e| StoreError::from_kube(e, "Deployment", &namespace, &name))
    }
}
