//! Compute Providers
//!
//! Provides `ComputeProvider` implementations for:
//! - GKE / GCE via the `gcloud` CLI
//! - An in-memory recording provider

pub mod gcloud;
pub mod memory;

pub use gcloud::*;
pub use memory::*;
