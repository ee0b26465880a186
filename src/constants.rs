//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable. The workload
//! template values are fixed and deliberately not configurable.

/// API group of all CNAuth custom resources
pub const API_GROUP: &str = "keys.cnauth";

/// API version of all CNAuth custom resources
pub const API_VERSION: &str = "v1alpha1";

/// Field manager used for status patches and creates
pub const FIELD_MANAGER: &str = "cnauth-controller";

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Default deadline for a single reconcile invocation (seconds)
pub const DEFAULT_RECONCILE_TIMEOUT_SECS: u64 = 30;

/// Default first retry delay after a reconcile error (seconds)
pub const DEFAULT_ERROR_BACKOFF_MIN_SECS: u64 = 5;

/// Default retry delay cap after repeated reconcile errors (seconds)
pub const DEFAULT_ERROR_BACKOFF_MAX_SECS: u64 = 300;

/// Requeue used when the backoff state cannot be read (seconds)
pub const DEFAULT_RECONCILIATION_ERROR_REQUEUE_SECS: u64 = 60;

/// Default log filter when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "cnauth_controller=info";

/// Replica count of the provisioned workload
pub const WORKLOAD_REPLICAS: i32 = 1;

/// Container name of the provisioned workload
pub const WORKLOAD_CONTAINER_NAME: &str = "web";

/// Container image of the provisioned workload
pub const WORKLOAD_IMAGE: &str = "lorenzodagostinorad/cnauthserver:0.0.1";

/// Label key used for the workload selector and pod template
pub const WORKLOAD_LABEL_KEY: &str = "app";

/// Label value used for the workload selector and pod template
pub const WORKLOAD_LABEL_VALUE: &str = "demo";
