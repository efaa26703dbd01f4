//! Drain Selector
//!
//! Picks `len(candidates) - goal` candidate nodes to mark unschedulable.
//!
//! Selection order is deterministic:
//! 1. nodes that are already unschedulable
//! 2. fewer running pods
//! 3. name, ascending
//!
//! Re-running against an unchanged cluster therefore re-selects the same
//! nodes, and re-marking them is a no-op.

use super::{ActionOutcome, NodeAction};
use crate::domain::ports::ClusterClient;
use crate::inventory::CandidateNode;
use serde::Serialize;
use tracing::{debug, error, info};

/// Outcome of the drain step
#[derive(Debug, Clone, Default, Serialize)]
pub struct DrainReport {
    /// Candidate count minus goal; may be negative
    pub excess: i64,
    pub actions: Vec<NodeAction>,
}

impl DrainReport {
    pub fn failures(&self) -> usize {
        self.actions.iter().filter(|a| a.outcome.is_failed()).count()
    }
}

/// Number of candidates above the goal
pub fn excess(candidate_count: usize, goal: usize) -> i64 {
    candidate_count as i64 - goal as i64
}

/// Choose the nodes to mark unschedulable, at most `candidates.len()`
pub fn select_for_drain(candidates: &[CandidateNode], goal: usize) -> Vec<&CandidateNode> {
    let excess = excess(candidates.len(), goal);
    if excess <= 0 {
        return Vec::new();
    }

    let mut ordered: Vec<&CandidateNode> = candidates.iter().collect();
    ordered.sort_by(|a, b| {
        a.is_schedulable()
            .cmp(&b.is_schedulable())
            .then(a.running_pod_count().cmp(&b.running_pod_count()))
            .then(a.name().cmp(b.name()))
    });
    ordered.truncate(excess as usize);
    ordered
}

/// Mark the selected nodes unschedulable, one call per node.
///
/// A failed mark is recorded and the remaining nodes are still attempted.
pub async fn drain_excess(
    client: &dyn ClusterClient,
    candidates: &[CandidateNode],
    goal: usize,
) -> DrainReport {
    let excess = excess(candidates.len(), goal);
    let selected = select_for_drain(candidates, goal);

    if selected.is_empty() {
        debug!(excess, "No excess nodes to drain");
        return DrainReport {
            excess,
            actions: Vec::new(),
        };
    }

    info!(excess, selected = selected.len(), "Marking excess nodes unschedulable");

    let mut actions = Vec::with_capacity(selected.len());
    for node in selected {
        let outcome = match client.mark_unschedulable(node).await {
            Ok(()) => {
                if node.is_schedulable() {
                    info!(node = %node, pods = node.running_pod_count(), "Marked node unschedulable");
                } else {
                    debug!(node = %node, "Node already unschedulable");
                }
                ActionOutcome::Applied
            }
            Err(e) => {
                error!(node = %node, error = %e, "Failed to mark node unschedulable");
                ActionOutcome::Failed(e.to_string())
            }
        };
        actions.push(NodeAction::new(node.name(), outcome));
    }

    DrainReport { excess, actions }
}
