//! Fixed goal planner
//!
//! Returns an operator-supplied goal, bounded by the configured limits.

use super::PlannerOptions;
use crate::domain::ports::GoalPlanner;
use crate::error::Result;
use crate::inventory::InventorySnapshot;
use async_trait::async_trait;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
pub struct FixedGoalPlanner {
    goal: usize,
}

impl FixedGoalPlanner {
    pub fn new(goal: usize) -> Self {
        Self { goal }
    }
}

#[async_trait]
impl GoalPlanner for FixedGoalPlanner {
    async fn plan_goal(
        &self,
        _snapshot: &InventorySnapshot,
        options: &PlannerOptions,
    ) -> Result<usize> {
        let bounded = self.goal.clamp(options.min_nodes, options.max_nodes.max(options.min_nodes));
        if bounded != self.goal {
            warn!(requested = self.goal, bounded, "Fixed goal outside configured bounds");
        }
        Ok(bounded)
    }

    fn planner_name(&self) -> &str {
        "fixed"
    }
}
