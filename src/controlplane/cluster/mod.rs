//! Cluster Clients
//!
//! Provides `ClusterClient` implementations for:
//! - Kubernetes (kube-rs)
//! - An in-memory simulated cluster

pub mod kubernetes;
pub mod memory;

pub use kubernetes::*;
pub use memory::*;
