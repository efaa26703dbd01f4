//! Domain Ports - Collaborator trait definitions for the scaler
//!
//! These traits define the boundaries between the scaling logic and the
//! orchestrator, the goal planner and the compute provider. Adapters
//! implement them; the control loop only ever sees the traits.

use crate::error::Result;
use crate::inventory::{CandidateNode, InventorySnapshot};
use crate::planner::PlannerOptions;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;

// =============================================================================
// Node Records
// =============================================================================

/// A node as listed by the orchestrator, before any partitioning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node name, stable for the node's lifetime
    pub name: String,
    /// Whether new workloads may be placed on the node
    pub schedulable: bool,
}

impl NodeRecord {
    pub fn new(name: impl Into<String>, schedulable: bool) -> Self {
        Self {
            name: name.into(),
            schedulable,
        }
    }
}

// =============================================================================
// Cluster Client Port
// =============================================================================

/// Port for reading and mutating orchestrator state
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Name of the cluster this client talks to
    fn cluster_name(&self) -> &str;

    /// List every node in the cluster
    async fn list_nodes(&self) -> Result<Vec<NodeRecord>>;

    /// Names of nodes that must never be drained or destroyed
    async fn critical_node_names(&self) -> Result<BTreeSet<String>>;

    /// Number of relocatable workloads currently placed on a node
    async fn pod_count_on_node(&self, name: &str) -> Result<u32>;

    /// Number of workloads waiting for a node
    async fn pending_pod_count(&self) -> Result<u32>;

    /// Mark a candidate node unschedulable; already-unschedulable is success
    async fn mark_unschedulable(&self, node: &CandidateNode) -> Result<()>;
}

// =============================================================================
// Goal Planner Port
// =============================================================================

/// Port for computing the desired number of active non-critical nodes
#[async_trait]
pub trait GoalPlanner: Send + Sync {
    async fn plan_goal(
        &self,
        snapshot: &InventorySnapshot,
        options: &PlannerOptions,
    ) -> Result<usize>;

    /// Planner name, used in logs
    fn planner_name(&self) -> &str;
}

// =============================================================================
// Compute Provider Port
// =============================================================================

/// Port for creating and destroying compute
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Request the cluster be brought to exactly `target_total` nodes
    async fn resize_to(&self, target_total: usize, cluster_name: &str) -> Result<()>;

    /// Destroy the instance backing a candidate node
    async fn terminate_node(&self, node: &CandidateNode) -> Result<()>;

    /// Provider name, used in logs
    fn provider_name(&self) -> &str;
}

// =============================================================================
// Type Aliases for Arc'd Traits
// =============================================================================

pub type ClusterClientRef = Arc<dyn ClusterClient>;
pub type GoalPlannerRef = Arc<dyn GoalPlanner>;
pub type ComputeProviderRef = Arc<dyn ComputeProvider>;
