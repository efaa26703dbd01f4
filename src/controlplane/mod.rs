//! Control Plane Module
//!
//! The scaling control loop and the adapters it drives: cluster clients for
//! the orchestrator side and compute providers for the cloud side.

pub mod cluster;
pub mod control_loop;
pub mod platform;

pub use cluster::*;
pub use control_loop::*;
pub use platform::*;
