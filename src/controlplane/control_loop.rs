//! Cluster Control Loop
//!
//! Runs one scaling invocation, strictly in order:
//! 1. capture the inventory snapshot and partition it
//! 2. plan the goal (failure aborts before any action)
//! 3. drain excess candidates
//! 4. request a resize if the cluster is too small
//! 5. sweep drained, empty candidates
//!
//! In dry-run mode steps 4 and 5 decide but issue no provider calls; step 3
//! still cordons, since that is reversible.

use crate::domain::ports::{ClusterClientRef, ComputeProviderRef, GoalPlannerRef};
use crate::error::{Error, Result};
use crate::inventory::InventorySnapshot;
use crate::planner::PlannerOptions;
use crate::scaling::{
    drain_excess, sweep_empty_nodes, trigger_scale_up, DrainReport, ExecutionMode, ScaleUpReport,
    SweepReport,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the control loop
#[derive(Debug, Clone)]
pub struct ControlLoopConfig {
    pub mode: ExecutionMode,
    pub planner: PlannerOptions,
}

impl Default for ControlLoopConfig {
    fn default() -> Self {
        Self {
            mode: ExecutionMode::Live,
            planner: PlannerOptions::default(),
        }
    }
}

// =============================================================================
// Report
// =============================================================================

/// Everything one invocation observed and did
#[derive(Debug, Clone, Serialize)]
pub struct ScaleReport {
    pub cluster: String,
    pub mode: ExecutionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub total_nodes: usize,
    pub critical_nodes: usize,
    pub candidate_nodes: usize,
    pub goal: usize,
    pub drain: DrainReport,
    pub scale_up: ScaleUpReport,
    pub sweep: SweepReport,
}

impl ScaleReport {
    /// Number of actions that were issued and failed
    pub fn failures(&self) -> usize {
        self.drain.failures() + self.sweep.failures() + usize::from(self.scale_up.failed())
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

// =============================================================================
// Control Loop
// =============================================================================

/// One-shot scaling loop over injected collaborators
pub struct ClusterControlLoop {
    config: ControlLoopConfig,
    cluster: ClusterClientRef,
    planner: GoalPlannerRef,
    provider: ComputeProviderRef,
}

impl ClusterControlLoop {
    pub fn new(
        config: ControlLoopConfig,
        cluster: ClusterClientRef,
        planner: GoalPlannerRef,
        provider: ComputeProviderRef,
    ) -> Self {
        Self {
            config,
            cluster,
            planner,
            provider,
        }
    }

    /// Run a single invocation.
    ///
    /// Returns `Err` only when the snapshot or the plan could not be produced,
    /// in which case nothing was changed. Per-node and provisioning failures
    /// are carried in the report.
    pub async fn run_once(&self) -> Result<ScaleReport> {
        let span = info_span!(
            "scale",
            cluster = %self.cluster.cluster_name(),
            dry_run = self.config.mode.is_dry_run()
        );
        self.run_inner().instrument(span).await
    }

    async fn run_inner(&self) -> Result<ScaleReport> {
        let started_at = Utc::now();
        let cluster_name = self.cluster.cluster_name().to_string();
        let mode = self.config.mode;

        info!("Scaling on cluster {}", cluster_name);

        // 1. Snapshot
        let snapshot = InventorySnapshot::capture(self.cluster.as_ref()).await?;

        // 2. Plan
        let goal = self
            .planner
            .plan_goal(&snapshot, &self.config.planner)
            .await
            .map_err(|e| {
                error!(planner = %self.planner.planner_name(), error = %e, "Goal planning failed, no action taken");
                match e {
                    Error::Planning { .. } => e,
                    other => Error::Planning {
                        reason: other.to_string(),
                    },
                }
            })?;

        info!(
            planner = %self.planner.planner_name(),
            provider = %self.provider.provider_name(),
            total = snapshot.total_node_count(),
            critical = snapshot.critical_count(),
            candidates = snapshot.candidate_count(),
            goal,
            "Planned goal for non-critical nodes"
        );

        // 3. Drain
        let drain = drain_excess(self.cluster.as_ref(), snapshot.candidates(), goal).await;

        // 4. Scale up
        let scale_up = trigger_scale_up(
            self.provider.as_ref(),
            &cluster_name,
            snapshot.critical_nodes(),
            snapshot.candidates(),
            goal,
            mode,
        )
        .await;

        // 5. Sweep
        let sweep = sweep_empty_nodes(self.provider.as_ref(), snapshot.candidates(), mode).await;

        let report = ScaleReport {
            cluster: cluster_name,
            mode,
            started_at,
            finished_at: Utc::now(),
            total_nodes: snapshot.total_node_count(),
            critical_nodes: snapshot.critical_count(),
            candidate_nodes: snapshot.candidate_count(),
            goal,
            drain,
            scale_up,
            sweep,
        };

        info!(
            drained = report.drain.actions.len(),
            resize = ?report.scale_up.resize.as_ref().map(|r| r.target),
            swept = report.sweep.actions.len(),
            failures = report.failures(),
            "Scaling run complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controlplane::cluster::InMemoryCluster;
    use crate::controlplane::platform::InMemoryProvider;
    use crate::domain::ports::GoalPlanner;
    use crate::planner::{FixedGoalPlanner, PodDensityPlanner};
    use crate::scaling::{ActionOutcome, NodeAction};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct FailingPlanner;

    #[async_trait]
    impl GoalPlanner for FailingPlanner {
        async fn plan_goal(
            &self,
            _snapshot: &InventorySnapshot,
            _options: &PlannerOptions,
        ) -> Result<usize> {
            Err(Error::Inventory("metrics unavailable".into()))
        }

        fn planner_name(&self) -> &str {
            "failing"
        }
    }

    /// `total` nodes named node-00.., the first `critical` of them critical
    fn cluster(total: usize, critical: usize, pods: impl Fn(usize) -> u32) -> InMemoryCluster {
        let mut c = InMemoryCluster::new("test");
        for i in 0..total {
            c = c.with_node(&format!("node-{:02}", i), true, pods(i));
        }
        c.with_critical((0..critical).map(|i| format!("node-{:02}", i)))
    }

    fn control_loop(
        cluster: Arc<InMemoryCluster>,
        provider: Arc<InMemoryProvider>,
        goal: usize,
        mode: ExecutionMode,
    ) -> ClusterControlLoop {
        let config = ControlLoopConfig {
            mode,
            ..Default::default()
        };
        ClusterControlLoop::new(config, cluster, Arc::new(FixedGoalPlanner::new(goal)), provider)
    }

    fn critical_names(critical: usize) -> Vec<String> {
        (0..critical).map(|i| format!("node-{:02}", i)).collect()
    }

    #[tokio::test]
    async fn test_scenario_ten_nodes_goal_five() {
        // Every node busy so nothing is swept this run
        let cluster = Arc::new(cluster(10, 2, |_| 3));
        let provider = Arc::new(InMemoryProvider::new());
        let lp = control_loop(cluster.clone(), provider.clone(), 5, ExecutionMode::Live);

        let report = lp.run_once().await.unwrap();

        assert_eq!(report.candidate_nodes, 8);
        assert_eq!(report.drain.excess, 3);
        assert_eq!(cluster.marked().len(), 3);
        assert!(report.scale_up.resize.is_none());
        assert!(provider.resize_calls().is_empty());
        assert!(provider.terminated().is_empty());
        assert!(!report.has_failures());
    }

    #[tokio::test]
    async fn test_scenario_four_nodes_goal_five() {
        let cluster = Arc::new(cluster(4, 2, |_| 0));
        let provider = Arc::new(InMemoryProvider::new());
        let lp = control_loop(cluster.clone(), provider.clone(), 5, ExecutionMode::Live);

        let report = lp.run_once().await.unwrap();

        assert_eq!(report.drain.excess, -3);
        assert!(cluster.mark_attempts().is_empty());
        assert_eq!(provider.resize_calls(), vec![(7, "test".to_string())]);
        assert!(provider.terminated().is_empty());
    }

    #[tokio::test]
    async fn test_critical_nodes_never_touched() {
        for goal in 0..6 {
            // Critical nodes are cordoned and empty: the most tempting targets
            let cluster = Arc::new(
                InMemoryCluster::new("test")
                    .with_node("core-0", false, 0)
                    .with_node("core-1", false, 0)
                    .with_node("w-0", false, 0)
                    .with_node("w-1", true, 0)
                    .with_node("w-2", true, 4)
                    .with_critical(["core-0", "core-1"]),
            );
            let provider = Arc::new(InMemoryProvider::new());
            let lp = control_loop(cluster.clone(), provider.clone(), goal, ExecutionMode::Live);

            lp.run_once().await.unwrap();

            for name in ["core-0", "core-1"] {
                assert!(!cluster.mark_attempts().contains(&name.to_string()));
                assert!(!cluster.pod_count_queries().contains(&name.to_string()));
                assert!(!provider.terminated().contains(&name.to_string()));
            }
        }
    }

    #[tokio::test]
    async fn test_drain_count_property() {
        for n in 0..6usize {
            for goal in 0..8usize {
                let cluster = Arc::new(cluster(n + 1, 1, |_| 1));
                let provider = Arc::new(InMemoryProvider::new());
                let lp = control_loop(cluster.clone(), provider, goal, ExecutionMode::Live);

                lp.run_once().await.unwrap();

                assert_eq!(cluster.mark_attempts().len(), n.saturating_sub(goal));
            }
        }
    }

    #[tokio::test]
    async fn test_sweeper_respects_drain_before_destroy() {
        let cluster = Arc::new(
            InMemoryCluster::new("test")
                .with_node("open-empty", true, 0)
                .with_node("open-busy", true, 5)
                .with_node("cordoned-busy", false, 2)
                .with_node("cordoned-empty", false, 0),
        );
        let provider = Arc::new(InMemoryProvider::new());
        let lp = control_loop(cluster.clone(), provider.clone(), 4, ExecutionMode::Live);

        lp.run_once().await.unwrap();

        assert_eq!(provider.terminated(), vec!["cordoned-empty".to_string()]);
    }

    #[tokio::test]
    async fn test_dry_run_never_calls_provider() {
        for goal in 0..8 {
            let cluster = Arc::new(
                cluster(5, 1, |i| if i % 2 == 0 { 0 } else { 2 })
                    .with_node("drained-a", false, 0)
                    .with_node("drained-b", false, 0),
            );
            let provider = Arc::new(InMemoryProvider::new());
            let lp = control_loop(cluster.clone(), provider.clone(), goal, ExecutionMode::DryRun);

            let report = lp.run_once().await.unwrap();

            assert_eq!(provider.call_count(), 0);
            assert!(report
                .sweep
                .actions
                .iter()
                .all(|a| a.outcome == ActionOutcome::Skipped));
        }

        // Cordoning still happens
        let cluster = Arc::new(cluster(4, 0, |_| 1));
        let provider = Arc::new(InMemoryProvider::new());
        control_loop(cluster.clone(), provider.clone(), 1, ExecutionMode::DryRun)
            .run_once()
            .await
            .unwrap();
        assert_eq!(cluster.marked().len(), 3);
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_idempotent_second_run() {
        let cluster = Arc::new(cluster(7, 2, |_| 1));
        let provider = Arc::new(InMemoryProvider::new());
        let lp = control_loop(cluster.clone(), provider.clone(), 3, ExecutionMode::Live);

        let first = lp.run_once().await.unwrap();
        let first_marked: Vec<_> = first.drain.actions.iter().map(|a| a.node.clone()).collect();
        let second = lp.run_once().await.unwrap();
        let second_marked: Vec<_> = second.drain.actions.iter().map(|a| a.node.clone()).collect();

        assert_eq!(first_marked.len(), 2);
        assert_eq!(first_marked, second_marked);
        assert!(!second.has_failures());
        // critical + goal == 5 < 7
        assert!(provider.resize_calls().is_empty());
    }

    #[tokio::test]
    async fn test_no_resize_when_exactly_sized() {
        let cluster = Arc::new(cluster(7, 2, |_| 1));
        let provider = Arc::new(InMemoryProvider::new());
        let lp = control_loop(cluster, provider.clone(), 5, ExecutionMode::Live);

        lp.run_once().await.unwrap();
        lp.run_once().await.unwrap();

        assert!(provider.resize_calls().is_empty());
    }

    #[tokio::test]
    async fn test_planning_failure_takes_no_action() {
        let cluster = Arc::new(cluster(6, 1, |_| 0).with_node("drained", false, 0));
        let provider = Arc::new(InMemoryProvider::new());
        let lp = ClusterControlLoop::new(
            ControlLoopConfig::default(),
            cluster.clone(),
            Arc::new(FailingPlanner),
            provider.clone(),
        );

        let result = lp.run_once().await;

        assert_matches!(result, Err(Error::Planning { .. }));
        assert!(cluster.mark_attempts().is_empty());
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_inventory_failure_aborts() {
        let cluster = Arc::new(InMemoryCluster::new("test").fail_list());
        let provider = Arc::new(InMemoryProvider::new());
        let lp = control_loop(cluster, provider.clone(), 3, ExecutionMode::Live);

        assert_matches!(lp.run_once().await, Err(Error::Inventory(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resize_failure_does_not_block_sweep() {
        let cluster = Arc::new(
            InMemoryCluster::new("test")
                .with_node("w-0", true, 3)
                .with_node("w-1", false, 0),
        );
        let provider = Arc::new(InMemoryProvider::new().fail_resize());
        let lp = control_loop(cluster, provider.clone(), 5, ExecutionMode::Live);

        let report = lp.run_once().await.unwrap();

        assert!(report.scale_up.failed());
        assert_eq!(provider.terminated(), vec!["w-1".to_string()]);
        assert_eq!(report.failures(), 1);
    }

    #[tokio::test]
    async fn test_converges_over_runs() {
        let cluster = Arc::new(cluster(6, 1, |_| 2));
        let provider = Arc::new(InMemoryProvider::attached(cluster.clone()));
        let lp = control_loop(cluster.clone(), provider.clone(), 2, ExecutionMode::Live);

        // Run 1: cordon three busy nodes, nothing to sweep yet
        let first = lp.run_once().await.unwrap();
        assert_eq!(first.drain.actions.len(), 3);
        assert!(provider.terminated().is_empty());

        // Workloads relocate off the cordoned nodes
        for action in &first.drain.actions {
            cluster.set_pod_count(&action.node, 0);
        }

        // Run 2: the cordoned nodes are now empty and get terminated
        let second = lp.run_once().await.unwrap();
        assert_eq!(second.sweep.actions.len(), 3);
        assert_eq!(cluster.node_count(), 3);
        assert!(cluster.node_names().contains(&critical_names(1)[0]));

        // Run 3: steady state
        let third = lp.run_once().await.unwrap();
        assert_eq!(third.drain.excess, 0);
        assert!(third.sweep.actions.is_empty());
        assert!(provider.resize_calls().is_empty());
    }

    #[tokio::test]
    async fn test_scale_up_joins_nodes_next_run() {
        let cluster = Arc::new(cluster(2, 1, |_| 0));
        let provider = Arc::new(InMemoryProvider::attached(cluster.clone()));
        let lp = control_loop(cluster.clone(), provider.clone(), 4, ExecutionMode::Live);

        lp.run_once().await.unwrap();
        assert_eq!(cluster.node_count(), 5);

        let second = lp.run_once().await.unwrap();
        assert_eq!(second.candidate_nodes, 4);
        assert!(second.scale_up.resize.is_none());
        assert_eq!(provider.resize_calls().len(), 1);
    }

    fn density_loop(
        cluster: Arc<InMemoryCluster>,
        provider: Arc<InMemoryProvider>,
        pods_per_node: u32,
    ) -> ClusterControlLoop {
        let config = ControlLoopConfig {
            mode: ExecutionMode::Live,
            planner: PlannerOptions {
                pods_per_node,
                ..Default::default()
            },
        };
        ClusterControlLoop::new(config, cluster, Arc::new(PodDensityPlanner::new()), provider)
    }

    #[tokio::test]
    async fn test_node_cordoned_this_run_is_not_swept_until_next_run() {
        let cluster = Arc::new(
            InMemoryCluster::new("test")
                .with_node("a", true, 0)
                .with_node("b", true, 0),
        );
        let provider = Arc::new(InMemoryProvider::attached(cluster.clone()));
        let lp = control_loop(cluster.clone(), provider.clone(), 1, ExecutionMode::Live);

        let first = lp.run_once().await.unwrap();
        assert_eq!(cluster.marked(), vec!["a".to_string()]);
        assert!(first.sweep.actions.is_empty());
        assert!(provider.terminated().is_empty());
        assert_eq!(cluster.node_count(), 2);

        let second = lp.run_once().await.unwrap();
        assert_eq!(second.sweep.actions, vec![NodeAction::new("a", ActionOutcome::Applied)]);
        assert_eq!(provider.terminated(), vec!["a".to_string()]);
        assert_eq!(cluster.node_names(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn test_pod_density_goal_includes_pending_pods() {
        let cluster = Arc::new(
            InMemoryCluster::new("test")
                .with_node("a", true, 10)
                .with_pending(25),
        );
        let provider = Arc::new(InMemoryProvider::new());
        let lp = density_loop(cluster.clone(), provider.clone(), 10);

        let report = lp.run_once().await.unwrap();

        // (10 running + 25 pending) / 10 per node
        assert_eq!(report.goal, 4);
        assert_eq!(report.scale_up.required_total, 4);
        assert_eq!(provider.resize_calls(), vec![(4, "test".to_string())]);
        assert!(cluster.mark_attempts().is_empty());

        // Once the pending pods are placed the pool is oversized
        cluster.set_pending(0);
        let report = lp.run_once().await.unwrap();
        assert_eq!(report.goal, 1);
        assert!(report.scale_up.resize.is_none());
        assert_eq!(provider.resize_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_pending_pod_failure_aborts_before_any_action() {
        let cluster = Arc::new(
            InMemoryCluster::new("test")
                .with_node("a", true, 0)
                .with_node("b", false, 0)
                .fail_pending(),
        );
        let provider = Arc::new(InMemoryProvider::new());
        let lp = density_loop(cluster.clone(), provider.clone(), 10);

        assert_matches!(lp.run_once().await, Err(Error::Inventory(_)));
        assert!(cluster.mark_attempts().is_empty());
        assert_eq!(provider.call_count(), 0);
    }
}
