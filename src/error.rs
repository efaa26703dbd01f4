//! Error types for the node pool scaler
//!
//! Provides structured error types for inventory reads, goal planning,
//! per-node mutations, provisioning and the provider command runner.

use thiserror::Error;

/// Unified error type for the scaler
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Internal Errors
    // =========================================================================
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // =========================================================================
    // Kubernetes Errors
    // =========================================================================
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Kubeconfig error: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("No kubeconfig context matches segment: {segment}")]
    ContextNotFound { segment: String },

    #[error("Context segment {segment} is ambiguous, matches: {matches}")]
    AmbiguousContext { segment: String, matches: String },

    // =========================================================================
    // Inventory & Planning Errors
    // =========================================================================
    #[error("Inventory read failed: {0}")]
    Inventory(String),

    #[error("Goal planning failed: {reason}")]
    Planning { reason: String },

    // =========================================================================
    // Per-Node Mutation Errors
    // =========================================================================
    #[error("Failed to mark node {node} unschedulable: {reason}")]
    MarkUnschedulable { node: String, reason: String },

    #[error("Failed to terminate node {node}: {reason}")]
    Termination { node: String, reason: String },

    // =========================================================================
    // Provider Errors
    // =========================================================================
    #[error("Resize of cluster {cluster} to {target} nodes failed: {reason}")]
    Provisioning {
        cluster: String,
        target: usize,
        reason: String,
    },

    #[error("Provider command failed: {command} - {reason}")]
    CommandFailed { command: String, reason: String },

    #[error("Provider command timed out after {secs}s: {command}")]
    CommandTimeout { command: String, secs: u64 },

    // =========================================================================
    // Invocation Outcome
    // =========================================================================
    #[error("Scaling run finished with {failures} failed action(s)")]
    PartialFailure { failures: usize },

    // =========================================================================
    // Parse Errors
    // =========================================================================
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Metrics error: {0}")]
    Metrics(#[from] prometheus::Error),

    // =========================================================================
    // IO Errors
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What the caller should do about an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorAction {
    /// Let the external scheduler re-run the loop
    RetryNextRun,
    /// Retrying will not help until an operator fixes something
    RequiresOperator,
}

impl Error {
    /// Determine what action to take for this error
    pub fn action(&self) -> ErrorAction {
        match self {
            Error::Configuration(_)
            | Error::Kubeconfig(_)
            | Error::ContextNotFound { .. }
            | Error::AmbiguousContext { .. }
            | Error::YamlParse(_) => ErrorAction::RequiresOperator,

            _ => ErrorAction::RetryNextRun,
        }
    }

    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self.action(), ErrorAction::RequiresOperator)
    }

    /// Check if this error is transient
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Kube(_) | Error::CommandTimeout { .. } | Error::Inventory(_)
        )
    }
}

/// Result type alias for the scaler
pub type Result<T> = std::result::Result<T, Error>;
