//! Scaling decisions
//!
//! The three per-invocation steps that act on the cluster:
//! - [`drain`]: mark excess candidate nodes unschedulable
//! - [`scale_up`]: request a larger cluster when demand exceeds capacity
//! - [`sweeper`]: terminate candidate nodes that are drained and empty
//!
//! Each step has a pure selection function and an async function that
//! applies it through the ports, recording one outcome per action.

pub mod drain;
pub mod scale_up;
pub mod sweeper;

pub use drain::*;
pub use scale_up::*;
pub use sweeper::*;

use serde::Serialize;

/// Whether irreversible provider actions are issued
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Live,
    DryRun,
}

impl ExecutionMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Live
        }
    }

    pub fn is_dry_run(&self) -> bool {
        matches!(self, ExecutionMode::DryRun)
    }
}

/// Result of a single attempted action
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status", content = "reason")]
pub enum ActionOutcome {
    /// The call was issued and succeeded
    Applied,
    /// The decision was made but not issued (dry-run)
    Skipped,
    /// The call was issued and failed
    Failed(String),
}

impl ActionOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, ActionOutcome::Failed(_))
    }

    /// Label used for metrics
    pub fn label(&self) -> &'static str {
        match self {
            ActionOutcome::Applied => "applied",
            ActionOutcome::Skipped => "skipped",
            ActionOutcome::Failed(_) => "failed",
        }
    }
}

/// One action taken against one node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeAction {
    pub node: String,
    pub outcome: ActionOutcome,
}

impl NodeAction {
    pub fn new(node: impl Into<String>, outcome: ActionOutcome) -> Self {
        Self {
            node: node.into(),
            outcome,
        }
    }
}
