//! In-memory compute provider
//!
//! Records resize and terminate requests. When attached to an
//! [`InMemoryCluster`], resizes join new nodes and terminations remove them,
//! so consecutive loop runs observe the effects.

use crate::controlplane::cluster::InMemoryCluster;
use crate::domain::ports::ComputeProvider;
use crate::error::{Error, Result};
use crate::inventory::CandidateNode;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Default)]
struct ProviderState {
    resize_calls: Vec<(usize, String)>,
    terminate_attempts: usize,
    terminated: Vec<String>,
    fail_resize: bool,
    failing_terminations: BTreeSet<String>,
}

/// Provider double that records every call
#[derive(Debug, Default)]
pub struct InMemoryProvider {
    cluster: Option<Arc<InMemoryCluster>>,
    state: Mutex<ProviderState>,
}

impl InMemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply resizes and terminations to a simulated cluster
    pub fn attached(cluster: Arc<InMemoryCluster>) -> Self {
        Self {
            cluster: Some(cluster),
            state: Mutex::new(ProviderState::default()),
        }
    }

    pub fn fail_resize(mut self) -> Self {
        self.state.get_mut().fail_resize = true;
        self
    }

    pub fn fail_terminate(mut self, name: &str) -> Self {
        self.state
            .get_mut()
            .failing_terminations
            .insert(name.to_string());
        self
    }

    /// `(target, cluster)` for every resize request
    pub fn resize_calls(&self) -> Vec<(usize, String)> {
        self.state.lock().resize_calls.clone()
    }

    /// Nodes successfully terminated, in call order
    pub fn terminated(&self) -> Vec<String> {
        self.state.lock().terminated.clone()
    }

    pub fn terminate_attempts(&self) -> usize {
        self.state.lock().terminate_attempts
    }

    /// Total number of provider calls issued
    pub fn call_count(&self) -> usize {
        let state = self.state.lock();
        state.resize_calls.len() + state.terminate_attempts
    }
}

#[async_trait]
impl ComputeProvider for InMemoryProvider {
    async fn resize_to(&self, target_total: usize, cluster_name: &str) -> Result<()> {
        let fail = {
            let mut state = self.state.lock();
            state
                .resize_calls
                .push((target_total, cluster_name.to_string()));
            state.fail_resize
        };
        if fail {
            return Err(Error::Provisioning {
                cluster: cluster_name.to_string(),
                target: target_total,
                reason: "injected failure".into(),
            });
        }

        if let Some(cluster) = &self.cluster {
            while cluster.node_count() < target_total {
                let name = cluster.provision_node();
                debug!(node = %name, "Simulated node joined");
            }
        }
        Ok(())
    }

    async fn terminate_node(&self, node: &CandidateNode) -> Result<()> {
        {
            let mut state = self.state.lock();
            state.terminate_attempts += 1;
            if state.failing_terminations.contains(node.name()) {
                return Err(Error::Termination {
                    node: node.name().to_string(),
                    reason: "injected failure".into(),
                });
            }
        }

        if let Some(cluster) = &self.cluster {
            if !cluster.remove_node(node.name()) {
                return Err(Error::Termination {
                    node: node.name().to_string(),
                    reason: "instance not found".into(),
                });
            }
        }

        self.state.lock().terminated.push(node.name().to_string());
        Ok(())
    }

    fn provider_name(&self) -> &str {
        "in-memory"
    }
}
