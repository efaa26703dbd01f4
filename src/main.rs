//! Node Pool Scaler
//!
//! Runs one scaling invocation against the cluster selected by a kubeconfig
//! context segment. Intended to be triggered periodically by an external
//! scheduler, one invocation per cluster at a time.

use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

use node_pool_scaler::metrics::ScaleMetrics;
use node_pool_scaler::telemetry::{init_logging, LogConfig};
use node_pool_scaler::{
    ClusterControlLoop, ControlLoopConfig, Error, ExecutionMode, FixedGoalPlanner,
    GcloudProvider, GoalPlannerRef, KubeClusterClient, PodDensityPlanner, Result, Settings,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Node Pool Scaler - size a worker pool to demand, never touching critical nodes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// A unique segment of the kubeconfig context name to use
    #[arg(short, long)]
    context: String,

    /// Show verbose output (debug)
    #[arg(short, long)]
    verbose: bool,

    /// Decide and cordon, but never resize or terminate
    #[arg(long, alias = "test")]
    dry_run: bool,

    /// Settings file (YAML)
    #[arg(long, env = "SCALER_SETTINGS")]
    settings: Option<PathBuf>,

    /// Use this goal instead of planning one from pod density
    #[arg(long)]
    goal: Option<usize>,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Write run metrics in Prometheus text format to this file
    #[arg(long, env = "METRICS_TEXTFILE")]
    metrics_textfile: Option<PathBuf>,
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&LogConfig::from_verbosity(args.verbose, args.log_json))?;

    let mode = ExecutionMode::from_dry_run(args.dry_run);
    if mode.is_dry_run() {
        warn!("Running in dry-run mode, no nodes will be provisioned or terminated");
    }

    info!("Starting node pool scaler {}", node_pool_scaler::VERSION);

    let settings = Settings::load(args.settings.as_deref())?;
    settings.validate(mode)?;

    let cluster = KubeClusterClient::connect(
        &args.context,
        settings.critical_set(),
        settings.cluster.clone(),
    )
    .await?;

    let planner: GoalPlannerRef = match args.goal {
        Some(goal) => Arc::new(FixedGoalPlanner::new(goal)),
        None => Arc::new(PodDensityPlanner::new()),
    };

    let config = ControlLoopConfig {
        mode,
        planner: settings.planner.clone(),
    };
    let control_loop = ClusterControlLoop::new(
        config,
        Arc::new(cluster),
        planner,
        Arc::new(GcloudProvider::new(settings.provider.clone())),
    );

    let outcome = control_loop.run_once().await;

    if let Some(path) = &args.metrics_textfile {
        let metrics = ScaleMetrics::new()?;
        match &outcome {
            Ok(report) => metrics.observe(report),
            Err(_) => metrics.observe_abort(Utc::now()),
        }
        metrics.write_textfile(path)?;
    }

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, retryable = e.is_retryable(), "Scaling run aborted");
            return Err(e);
        }
    };

    if report.has_failures() {
        return Err(Error::PartialFailure {
            failures: report.failures(),
        });
    }

    Ok(())
}
