//! Goal Planners
//!
//! Turn an inventory snapshot into the number of active non-critical nodes
//! the cluster should keep.

pub mod fixed;
pub mod pod_density;

pub use fixed::*;
pub use pod_density::*;

use serde::{Deserialize, Serialize};

/// Options handed to a planner on every invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerOptions {
    /// Workloads one node is expected to carry
    pub pods_per_node: u32,
    /// Extra nodes kept on top of the computed demand
    pub headroom_nodes: usize,
    /// Lower bound on the goal
    pub min_nodes: usize,
    /// Upper bound on the goal
    pub max_nodes: usize,
}

impl Default for PlannerOptions {
    fn default() -> Self {
        Self {
            pods_per_node: 30,
            headroom_nodes: 0,
            min_nodes: 0,
            max_nodes: 100,
        }
    }
}
