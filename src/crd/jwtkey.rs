//! # JWTKey
//!
//! Symmetric signing key record. The controller mirrors `spec.key` into
//! `status.key`; users read the observed value when signing tokens.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// JWTKey Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: keys.cnauth/v1alpha1
/// kind: JWTKey
/// metadata:
///   name: signing-key
///   namespace: default
/// spec:
///   key: s3cr3t
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "keys.cnauth",
    version = "v1alpha1",
    kind = "JWTKey",
    root = "JwtKey",
    plural = "jwtkeys",
    shortname = "jwtk",
    namespaced,
    derive = "PartialEq",
    status = "JwtKeyStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct JwtKeySpec {
    /// Opaque secret used as raw HMAC key material
    #[serde(default)]
    pub key: String,
}

/// Observed state of a JWTKey
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct JwtKeyStatus {
    /// Key material as last materialized by the controller
    #[serde(default)]
    pub key: String,
}

impl JwtKey {
    /// Key material the controller has published, if any
    #[must_use]
    pub fn observed_key(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.key.as_str())
    }

    /// Whether `status.key` already mirrors `spec.key`
    #[must_use]
    pub fn is_materialized(&self) -> bool {
        self.observed_key() == Some(self.spec.key.as_str())
    }
}
