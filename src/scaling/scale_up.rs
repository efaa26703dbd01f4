//! Scale-Up Trigger
//!
//! Requests an absolute cluster size of `critical + goal` when that exceeds
//! the current node count. The provider computes the delta; the loop never
//! waits for new nodes to join.

use super::{ActionOutcome, ExecutionMode};
use crate::domain::ports::ComputeProvider;
use crate::inventory::{CandidateNode, CriticalNode};
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Outcome of the scale-up step
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScaleUpReport {
    pub required_total: usize,
    pub current_total: usize,
    /// Present only when a resize was decided
    pub resize: Option<ResizeAction>,
}

/// A decided resize and what happened to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResizeAction {
    pub target: usize,
    pub outcome: ActionOutcome,
}

impl ScaleUpReport {
    pub fn failed(&self) -> bool {
        self.resize
            .as_ref()
            .map(|r| r.outcome.is_failed())
            .unwrap_or(false)
    }
}

/// Total node count needed to give the planner its goal
pub fn required_total(critical_count: usize, goal: usize) -> usize {
    critical_count.saturating_add(goal)
}

/// Target size to request, if the cluster is too small
pub fn resize_target(
    critical: &[CriticalNode],
    candidates: &[CandidateNode],
    goal: usize,
) -> Option<usize> {
    let required = required_total(critical.len(), goal);
    let current = critical.len() + candidates.len();
    (required > current).then_some(required)
}

/// Issue at most one resize request
pub async fn trigger_scale_up(
    provider: &dyn ComputeProvider,
    cluster_name: &str,
    critical: &[CriticalNode],
    candidates: &[CandidateNode],
    goal: usize,
    mode: ExecutionMode,
) -> ScaleUpReport {
    let required_total = required_total(critical.len(), goal);
    let current_total = critical.len() + candidates.len();

    let Some(target) = resize_target(critical, candidates, goal) else {
        debug!(required_total, current_total, "Cluster large enough, no resize");
        return ScaleUpReport {
            required_total,
            current_total,
            resize: None,
        };
    };

    info!(
        cluster = %cluster_name,
        target,
        current_total,
        "Resize the cluster to satisfy demand"
    );

    let outcome = if mode.is_dry_run() {
        warn!(cluster = %cluster_name, target, "Dry run: resize not requested");
        ActionOutcome::Skipped
    } else {
        match provider.resize_to(target, cluster_name).await {
            Ok(()) => ActionOutcome::Applied,
            Err(e) => {
                error!(cluster = %cluster_name, target, error = %e, "Resize request failed");
                ActionOutcome::Failed(e.to_string())
            }
        }
    };

    ScaleUpReport {
        required_total,
        current_total,
        resize: Some(ResizeAction { target, outcome }),
    }
}
