//! # User
//!
//! User identity record. The controller signs an HS256 token for
//! `spec.name` with the JWTKey named by `spec.keyRef` and publishes it to
//! `status.token`.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// User Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: keys.cnauth/v1alpha1
/// kind: User
/// metadata:
///   name: alice
///   namespace: default
/// spec:
///   name: alice
///   keyRef: signing-key
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "keys.cnauth",
    version = "v1alpha1",
    kind = "User",
    plural = "users",
    shortname = "cnuser",
    namespaced,
    derive = "PartialEq",
    status = "UserStatus",
    printcolumn = r#"{"name":"Username", "type":"string", "jsonPath":".spec.name"}, {"name":"Key", "type":"string", "jsonPath":".spec.keyRef"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct UserSpec {
    /// Display name embedded as the `username` claim
    #[serde(default)]
    pub name: String,
    /// Name of a JWTKey in the same namespace
    #[serde(default)]
    pub key_ref: String,
}

/// Observed state of a User
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserStatus {
    /// Signed token, empty until the first successful reconcile
    #[serde(default)]
    pub token: String,
}

impl User {
    /// Token currently published in status (empty when never issued)
    #[must_use]
    pub fn issued_token(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.token.as_str())
    }
}
