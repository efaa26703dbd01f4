//! Node Pool Scaler
//!
//! A one-shot control loop that keeps a Kubernetes worker pool sized to
//! demand while never draining or destroying a configured set of critical
//! nodes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                       Cluster Control Loop                           │
//! │                                                                      │
//! │   snapshot ──► plan ──► drain ──► scale up ──► sweep                 │
//! │      │          │         │           │           │                  │
//! │      │          │         │     (skipped in dry-run, decisions       │
//! │      │          │         │      still logged)                       │
//! ├──────┼──────────┼─────────┼───────────┼───────────┼──────────────────┤
//! │  ┌───┴──────────┴───┐  ┌──┴───────────┴─┐  ┌──────┴──────────────┐   │
//! │  │  ClusterClient   │  │  GoalPlanner   │  │  ComputeProvider    │   │
//! │  │  (kube / memory) │  │ (density/fixed)│  │  (gcloud / memory)  │   │
//! │  └──────────────────┘  └────────────────┘  └─────────────────────┘   │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`controlplane`]: the control loop, cluster clients and compute providers
//! - [`inventory`]: snapshot and critical/candidate partition
//! - [`scaling`]: drain selector, scale-up trigger, shutdown sweeper
//! - [`planner`]: goal planners
//! - [`domain`]: collaborator ports
//! - [`settings`], [`telemetry`], [`metrics`]: configuration, logging, metrics
//! - [`error`]: error types and handling

pub mod controlplane;
pub mod domain;
pub mod error;
pub mod inventory;
pub mod metrics;
pub mod planner;
pub mod scaling;
pub mod settings;
pub mod telemetry;

// Re-export commonly used types
pub use controlplane::{
    ClusterControlLoop, ControlLoopConfig, ScaleReport,
    GcloudProvider, InMemoryProvider,
    InMemoryCluster, KubeClusterClient,
};

pub use domain::ports::{
    ClusterClient, ComputeProvider, GoalPlanner, NodeRecord,
    ClusterClientRef, ComputeProviderRef, GoalPlannerRef,
};

pub use error::{Error, ErrorAction, Result};

pub use inventory::{CandidateNode, CriticalNode, InventorySnapshot};

pub use planner::{FixedGoalPlanner, PlannerOptions, PodDensityPlanner};

pub use scaling::{ActionOutcome, ExecutionMode, NodeAction};

pub use settings::Settings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
