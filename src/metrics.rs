//! Scaling run metrics
//!
//! A private Prometheus registry filled from a [`ScaleReport`]. The run is
//! one-shot, so metrics are written in text exposition format to a file for
//! the node-exporter textfile collector instead of being served.

use crate::controlplane::ScaleReport;
use chrono::{DateTime, Utc};
use crate::error::Result;
use crate::scaling::NodeAction;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::path::Path;
use tracing::debug;

/// Metrics for one scaling run
pub struct ScaleMetrics {
    registry: Registry,
    nodes_total: IntGauge,
    nodes_critical: IntGauge,
    nodes_candidate: IntGauge,
    goal: IntGauge,
    last_run_timestamp: IntGauge,
    last_run_aborted: IntGauge,
    actions: IntCounterVec,
}

impl ScaleMetrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("node_pool_scaler".into()), None)?;

        let nodes_total = IntGauge::new("nodes_total", "Nodes observed in the snapshot")?;
        let nodes_critical = IntGauge::new("nodes_critical", "Critical nodes observed")?;
        let nodes_candidate = IntGauge::new("nodes_candidate", "Non-critical nodes observed")?;
        let goal = IntGauge::new("goal_nodes", "Planned active non-critical nodes")?;
        let last_run_timestamp = IntGauge::new(
            "last_run_timestamp_seconds",
            "Unix time the last run finished",
        )?;
        let last_run_aborted = IntGauge::new(
            "last_run_aborted",
            "1 if the last run aborted before taking any action",
        )?;
        let actions = IntCounterVec::new(
            Opts::new("actions_total", "Scaling actions by kind and outcome"),
            &["action", "outcome"],
        )?;

        registry.register(Box::new(nodes_total.clone()))?;
        registry.register(Box::new(nodes_critical.clone()))?;
        registry.register(Box::new(nodes_candidate.clone()))?;
        registry.register(Box::new(goal.clone()))?;
        registry.register(Box::new(last_run_timestamp.clone()))?;
        registry.register(Box::new(last_run_aborted.clone()))?;
        registry.register(Box::new(actions.clone()))?;

        Ok(Self {
            registry,
            nodes_total,
            nodes_critical,
            nodes_candidate,
            goal,
            last_run_timestamp,
            last_run_aborted,
            actions,
        })
    }

    fn record_actions(&self, action: &str, actions: &[NodeAction]) {
        for a in actions {
            self.actions
                .with_label_values(&[action, a.outcome.label()])
                .inc();
        }
    }

    /// Populate every metric from a finished run
    pub fn observe(&self, report: &ScaleReport) {
        self.nodes_total.set(report.total_nodes as i64);
        self.nodes_critical.set(report.critical_nodes as i64);
        self.nodes_candidate.set(report.candidate_nodes as i64);
        self.goal.set(report.goal as i64);
        self.last_run_timestamp.set(report.finished_at.timestamp());
        self.last_run_aborted.set(0);

        self.record_actions("cordon", &report.drain.actions);
        self.record_actions("terminate", &report.sweep.actions);
        if let Some(resize) = &report.scale_up.resize {
            self.actions
                .with_label_values(&["resize", resize.outcome.label()])
                .inc();
        }
    }

    /// Record a run that aborted on its snapshot or plan
    pub fn observe_abort(&self, at: DateTime<Utc>) {
        self.last_run_timestamp.set(at.timestamp());
        self.last_run_aborted.set(1);
    }

    /// Text exposition of the registry
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }

    /// Write atomically: render to a sibling temp file, then rename over `path`
    pub fn write_textfile(&self, path: &Path) -> Result<()> {
        let body = self.render()?;
        let tmp = path.with_extension("prom.tmp");
        std::fs::write(&tmp, body)?;
        std::fs::rename(&tmp, path)?;
        debug!(path = %path.display(), "Wrote metrics textfile");
        Ok(())
    }
}
