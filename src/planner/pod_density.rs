//! Pod density planner
//!
//! Sizes the pool from the number of workloads running on candidate nodes
//! plus those still waiting for a node.

use super::PlannerOptions;
use crate::domain::ports::GoalPlanner;
use crate::error::{Error, Result};
use crate::inventory::InventorySnapshot;
use async_trait::async_trait;
use tracing::debug;

/// Planner that divides total demand by a fixed per-node density
#[derive(Debug, Clone, Default)]
pub struct PodDensityPlanner;

impl PodDensityPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Compute the goal from raw demand
    pub fn goal_for_demand(demand: u64, options: &PlannerOptions) -> Result<usize> {
        if options.pods_per_node == 0 {
            return Err(Error::Planning {
                reason: "pods_per_node must be greater than 0".into(),
            });
        }
        if options.min_nodes > options.max_nodes {
            return Err(Error::Planning {
                reason: format!(
                    "min_nodes ({}) exceeds max_nodes ({})",
                    options.min_nodes, options.max_nodes
                ),
            });
        }

        let per_node = options.pods_per_node as u64;
        let needed = demand.div_ceil(per_node) as usize;
        let goal = needed
            .saturating_add(options.headroom_nodes)
            .clamp(options.min_nodes, options.max_nodes);

        Ok(goal)
    }
}

#[async_trait]
impl GoalPlanner for PodDensityPlanner {
    async fn plan_goal(
        &self,
        snapshot: &InventorySnapshot,
        options: &PlannerOptions,
    ) -> Result<usize> {
        let demand = snapshot.running_pods() + snapshot.pending_pods() as u64;
        let goal = Self::goal_for_demand(demand, options)?;

        debug!(
            running = snapshot.running_pods(),
            pending = snapshot.pending_pods(),
            pods_per_node = options.pods_per_node,
            goal,
            "Planned node goal from pod density"
        );

        Ok(goal)
    }

    fn planner_name(&self) -> &str {
        "pod-density"
    }
}
