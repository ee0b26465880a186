//! CNAuth Controller Library
//!
//! Reconcilers, resource types and runtime for the CNAuth credential
//! controller. The binaries (`cnauth-controller`, `crdgen`) are thin
//! wrappers over this crate.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod error;
pub mod observability;
pub mod runtime;
pub mod server;
pub mod store;
