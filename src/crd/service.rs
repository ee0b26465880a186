//! # Service
//!
//! Deployable service record. Its existence causes the controller to
//! provision one workload Deployment from a fixed template; no spec field
//! is consumed.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Service Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: keys.cnauth/v1alpha1
/// kind: Service
/// metadata:
///   name: svc1
///   namespace: ns1
/// spec: {}
/// ```
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[kube(
    group = "keys.cnauth",
    version = "v1alpha1",
    kind = "Service",
    plural = "services",
    shortname = "cnsvc",
    namespaced,
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
#[allow(
    clippy::empty_structs_with_brackets,
    reason = "spec must serialize as an empty object"
)]
pub struct ServiceSpec {}
