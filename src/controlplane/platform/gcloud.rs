//! GKE / GCE Provider
//!
//! Resizes a GKE node pool and deletes instances from its managed instance
//! group through the `gcloud` CLI.

use crate::domain::ports::ComputeProvider;
use crate::error::{Error, Result};
use crate::inventory::CandidateNode;
use crate::settings::ProviderSettings;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

/// Strip the `gke_<project>_<zone>_` prefix kubeconfig puts on GKE clusters
pub fn gke_cluster_name(cluster: &str) -> &str {
    if cluster.starts_with("gke_") {
        let parts: Vec<&str> = cluster.splitn(4, '_').collect();
        if let [_, _, _, name] = parts.as_slice() {
            if !name.is_empty() {
                return *name;
            }
        }
    }
    cluster
}

/// Provider that shells out to `gcloud`
#[derive(Debug, Clone)]
pub struct GcloudProvider {
    settings: ProviderSettings,
}

impl GcloudProvider {
    pub fn new(settings: ProviderSettings) -> Self {
        Self { settings }
    }

    fn with_location(&self, mut args: Vec<String>) -> Vec<String> {
        args.push("--zone".into());
        args.push(self.settings.zone.clone());
        if let Some(project) = &self.settings.project {
            args.push("--project".into());
            args.push(project.clone());
        }
        args.push("--quiet".into());
        args
    }

    /// Arguments for resizing the node pool to `target` nodes
    pub fn resize_args(&self, target: usize, cluster_name: &str) -> Vec<String> {
        self.with_location(vec![
            "container".into(),
            "clusters".into(),
            "resize".into(),
            gke_cluster_name(cluster_name).to_string(),
            "--node-pool".into(),
            self.settings.node_pool.clone(),
            "--num-nodes".into(),
            target.to_string(),
        ])
    }

    /// Arguments for deleting one instance from the managed group
    pub fn delete_instance_args(&self, node: &str) -> Vec<String> {
        self.with_location(vec![
            "compute".into(),
            "instance-groups".into(),
            "managed".into(),
            "delete-instances".into(),
            self.settings.instance_group.clone(),
            format!("--instances={}", node),
        ])
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        let command = format!("{} {}", self.settings.gcloud_path, args.join(" "));
        let secs = self.settings.command_timeout_secs;
        debug!(command = %command, "Running provider command");

        let mut cmd = Command::new(&self.settings.gcloud_path);
        cmd.args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(Duration::from_secs(secs), cmd.output())
            .await
            .map_err(|_| Error::CommandTimeout {
                command: command.clone(),
                secs,
            })?
            .map_err(|e| Error::CommandFailed {
                command: command.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed {
                command,
                reason: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(())
    }
}

#[async_trait]
impl ComputeProvider for GcloudProvider {
    async fn resize_to(&self, target_total: usize, cluster_name: &str) -> Result<()> {
        info!(
            cluster = %cluster_name,
            node_pool = %self.settings.node_pool,
            target = target_total,
            "Requesting node pool resize"
        );
        self.run(self.resize_args(target_total, cluster_name))
            .await
            .map_err(|e| Error::Provisioning {
                cluster: cluster_name.to_string(),
                target: target_total,
                reason: e.to_string(),
            })
    }

    async fn terminate_node(&self, node: &CandidateNode) -> Result<()> {
        info!(
            node = %node,
            instance_group = %self.settings.instance_group,
            "Deleting instance"
        );
        self.run(self.delete_instance_args(node.name()))
            .await
            .map_err(|e| Error::Termination {
                node: node.name().to_string(),
                reason: e.to_string(),
            })
    }

    fn provider_name(&self) -> &str {
        "gcloud"
    }
}
