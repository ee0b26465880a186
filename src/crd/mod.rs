//! # Custom Resource Definitions
//!
//! CRD types for the CNAuth controller and the registry that lists them.
//!
//! All kinds live in the `keys.cnauth/v1alpha1` API group:
//!
//! - [`JwtKey`] (`JWTKey`): symmetric signing key, mirrored into status
//! - [`User`]: user identity, receives a signed token in status
//! - [`Service`]: deployable service, provisions a workload Deployment
//!
//! The [`ResourceRegistry`] is built once at startup and handed to the parts
//! of the process that need the schema of every kind (CRD generation and the
//! startup queryability check).

mod jwtkey;
mod service;
mod user;

pub use jwtkey::{JwtKey, JwtKeySpec, JwtKeyStatus};
pub use service::{Service, ServiceSpec};
pub use user::{User, UserSpec, UserStatus};

use k8s_openapi::apiextensions_apiserver::pkg::apis::apiextensions::v1::CustomResourceDefinition;
use kube::api::ApiResource;
use kube::CustomResourceExt;
use std::fmt;
use std::str::FromStr;

/// The resource kinds reconciled by this controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    JwtKey,
    User,
    Service,
}

impl ResourceKind {
    /// Every kind, in dependency order (keys before the users that read them)
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::JwtKey,
        ResourceKind::User,
        ResourceKind::Service,
    ];

    /// Kubernetes `kind` name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::JwtKey => "JWTKey",
            ResourceKind::User => "User",
            ResourceKind::Service => "Service",
        }
    }

    /// Plural resource name used in API paths
    #[must_use]
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::JwtKey => "jwtkeys",
            ResourceKind::User => "users",
            ResourceKind::Service => "services",
        }
    }

    /// Descriptor for untyped (`DynamicObject`) access to this kind
    #[must_use]
    pub fn api_resource(self) -> ApiResource {
        match self {
            ResourceKind::JwtKey => ApiResource::erase::<JwtKey>(&()),
            ResourceKind::User => ApiResource::erase::<User>(&()),
            ResourceKind::Service => ApiResource::erase::<Service>(&()),
        }
    }

    /// Generated CustomResourceDefinition for this kind
    #[must_use]
    pub fn crd(self) -> CustomResourceDefinition {
        match self {
            ResourceKind::JwtKey => JwtKey::crd(),
            ResourceKind::User => User::crd(),
            ResourceKind::Service => Service::crd(),
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource kind '{0}' (expected one of: jwtkey, user, service)")]
pub struct UnknownKind(pub String);

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jwtkey" | "jwtkeys" | "jwtk" => Ok(ResourceKind::JwtKey),
            "user" | "users" | "cnuser" => Ok(ResourceKind::User),
            "service" | "services" | "cnsvc" => Ok(ResourceKind::Service),
            _ => Err(UnknownKind(s.to_string())),
        }
    }
}

/// A registered kind together with its generated schema
#[derive(Debug, Clone)]
pub struct RegisteredKind {
    pub kind: ResourceKind,
    pub definition: CustomResourceDefinition,
}

/// Explicit registry of the custom resource kinds this process serves.
///
/// Constructed once at startup and passed by reference; there is no
/// process-wide scheme.
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    entries: Vec<RegisteredKind>,
}

impl ResourceRegistry {
    /// Registry containing every kind in [`ResourceKind::ALL`]
    #[must_use]
    pub fn new() -> Self {
        Self::with_kinds(&ResourceKind::ALL)
    }

    /// Registry restricted to the given kinds (duplicates are ignored)
    #[must_use]
    pub fn with_kinds(kinds: &[ResourceKind]) -> Self {
        let mut entries: Vec<RegisteredKind> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            if entries.iter().any(|e| e.kind == *kind) {
                continue;
            }
            entries.push(RegisteredKind {
                kind: *kind,
                definition: kind.crd(),
            });
        }
        Self { entries }
    }

    #[must_use]
    pub fn get(&self, kind: ResourceKind) -> Option<&RegisteredKind> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    #[must_use]
    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredKind> {
        self.entries.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}
