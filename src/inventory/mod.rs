//! Node inventory
//!
//! Point-in-time cluster snapshot and the critical/candidate partition.

pub mod snapshot;

pub use snapshot::*;
