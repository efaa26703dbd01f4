//! Shutdown Sweeper
//!
//! Terminates candidate nodes that are unschedulable and observed empty.
//! Schedulable nodes and nodes still running workloads are never touched.

use super::{ActionOutcome, ExecutionMode, NodeAction};
use crate::domain::ports::ComputeProvider;
use crate::inventory::CandidateNode;
use serde::Serialize;
use tracing::{debug, error, info, warn};

/// Outcome of the sweep step
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepReport {
    pub actions: Vec<NodeAction>,
}

impl SweepReport {
    pub fn failures(&self) -> usize {
        self.actions.iter().filter(|a| a.outcome.is_failed()).count()
    }
}

/// Candidates that are safe to terminate
pub fn select_for_shutdown(candidates: &[CandidateNode]) -> Vec<&CandidateNode> {
    candidates.iter().filter(|n| n.is_drained()).collect()
}

/// Terminate every drained, empty candidate.
///
/// A failed termination is recorded and the remaining nodes are still attempted.
pub async fn sweep_empty_nodes(
    provider: &dyn ComputeProvider,
    candidates: &[CandidateNode],
    mode: ExecutionMode,
) -> SweepReport {
    let targets = select_for_shutdown(candidates);
    if targets.is_empty() {
        debug!("No drained empty nodes to shut down");
        return SweepReport::default();
    }

    let mut actions = Vec::with_capacity(targets.len());
    for node in targets {
        let outcome = if mode.is_dry_run() {
            warn!(node = %node, "Dry run: empty node not shut down");
            ActionOutcome::Skipped
        } else {
            info!(node = %node, "Shutting down empty node");
            match provider.terminate_node(node).await {
                Ok(()) => ActionOutcome::Applied,
                Err(e) => {
                    error!(node = %node, error = %e, "Failed to shut down node");
                    ActionOutcome::Failed(e.to_string())
                }
            }
        };
        actions.push(NodeAction::new(node.name(), outcome));
    }

    SweepReport { actions }
}
