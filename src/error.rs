//! # Errors
//!
//! Typed errors for store access and reconciliation.
//!
//! [`StoreError`] classifies what the Kubernetes API answered; the
//! reconcilers decide from the variant whether a failure is swallowed (primary
//! resource not found) or returned to the runtime for a retry.

use crate::crd::ResourceKind;
use std::time::Duration;
use thiserror::Error;

/// Result of a single store operation
#[derive(Debug, Error)]
pub enum StoreError {
    /// The resource does not exist (HTTP 404)
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    /// A create hit an existing object (HTTP 409, reason AlreadyExists)
    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: &'static str,
        namespace: String,
        name: String,
    },
    /// The object changed since it was read (HTTP 409, reason Conflict)
    #[error("conflict writing {kind} {namespace}/{name}: {message}")]
    Conflict {
        kind: &'static str,
        namespace: String,
        name: String,
        message: String,
    },
    /// Any other API or transport failure
    #[error("kubernetes API error: {0}")]
    Api(#[from] kube::Error),
}

impl StoreError {
    #[must_use]
    pub fn not_found(kind: &'static str, namespace: &str, name: &str) -> Self {
        Self::NotFound {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn already_exists(kind: &'static str, namespace: &str, name: &str) -> Self {
        Self::AlreadyExists {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    #[must_use]
    pub fn conflict(kind: &'static str, namespace: &str, name: &str, message: &str) -> Self {
        Self::Conflict {
            kind,
            namespace: namespace.to_string(),
            name: name.to_string(),
            message: message.to_string(),
        }
    }

    /// Classify a `kube` client error for the given object
    #[must_use]
    pub fn from_kube(err: kube::Error, kind: &'static str, namespace: &str, name: &str) -> Self {
        match err {
            kube::Error::Api(ref api_err) if api_err.code == 404 => {
                Self::not_found(kind, namespace, name)
            }
            kube::Error::Api(ref api_err)
                if api_err.code == 409 && api_err.reason == "AlreadyExists" =>
            {
                Self::already_exists(kind, namespace, name)
            }
            kube::Error::Api(ref api_err) if api_err.code == 409 => {
                Self::conflict(kind, namespace, name, &api_err.message)
            }
            other => Self::Api(other),
        }
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    #[must_use]
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

/// Reasons a reconcile invocation failed.
///
/// Every variant is retryable: returning it makes the error policy requeue
/// the resource with backoff.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Primary fetch, status persist or workload create failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The JWTKey named by a User could not be fetched
    #[error("failed to resolve JWTKey {namespace}/{name}: {source}")]
    KeyRef {
        namespace: String,
        name: String,
        #[source]
        source: StoreError,
    },

    /// A User without `spec.keyRef`
    #[error("user {namespace}/{name} does not reference a JWTKey")]
    MissingKeyRef { namespace: String, name: String },

    /// The referenced JWTKey has not published any key material yet
    #[error("JWTKey {namespace}/{name} has no observed key material yet")]
    KeyNotReady { namespace: String, name: String },

    /// Token signing failed
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The invocation did not finish before its deadline
    #[error("{kind} reconcile exceeded its deadline of {timeout:?}")]
    DeadlineExceeded {
        kind: ResourceKind,
        timeout: Duration,
    },
}

impl ReconcileError {
    /// Stable, low-cardinality label for metrics and logs
    #[must_use]
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Store(StoreError::NotFound { .. }) => "not_found",
            Self::Store(StoreError::AlreadyExists { .. }) => "already_exists",
            Self::Store(StoreError::Conflict { .. }) => "conflict",
            Self::Store(StoreError::Api(_)) => "api_error",
            Self::KeyRef { .. } => "key_unresolved",
            Self::MissingKeyRef { .. } => "missing_key_ref",
            Self::KeyNotReady { .. } => "key_not_ready",
            Self::Signing(_) => "signing_failed",
            Self::DeadlineExceeded { .. } => "deadline_exceeded",
        }
    }
}
