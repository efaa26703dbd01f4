//! In-memory cluster
//!
//! A `ClusterClient` backed by a map of simulated nodes. Every call is
//! recorded so callers can assert exactly what the loop read and mutated,
//! and failures can be injected per node.

use crate::domain::ports::{ClusterClient, NodeRecord};
use crate::error::{Error, Result};
use crate::inventory::CandidateNode;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

#[derive(Debug, Clone)]
struct SimNode {
    schedulable: bool,
    pods: u32,
}

#[derive(Debug, Default)]
struct ClusterState {
    nodes: BTreeMap<String, SimNode>,
    critical: BTreeSet<String>,
    pending: u32,
    fail_list: bool,
    fail_pending: bool,
    failing_marks: BTreeSet<String>,
    failing_pod_counts: BTreeSet<String>,
    mark_attempts: Vec<String>,
    marked: Vec<String>,
    pod_count_queries: Vec<String>,
    provisioned: usize,
}

/// Simulated cluster that records every call
#[derive(Debug)]
pub struct InMemoryCluster {
    name: String,
    state: Mutex<ClusterState>,
}

impl InMemoryCluster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(ClusterState::default()),
        }
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    pub fn with_node(mut self, name: &str, schedulable: bool, pods: u32) -> Self {
        self.state
            .get_mut()
            .nodes
            .insert(name.to_string(), SimNode { schedulable, pods });
        self
    }

    pub fn with_critical<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .get_mut()
            .critical
            .extend(names.into_iter().map(Into::into));
        self
    }

    pub fn with_pending(mut self, pending: u32) -> Self {
        self.state.get_mut().pending = pending;
        self
    }

    pub fn fail_list(mut self) -> Self {
        self.state.get_mut().fail_list = true;
        self
    }

    pub fn fail_pending(mut self) -> Self {
        self.state.get_mut().fail_pending = true;
        self
    }

    pub fn fail_mark(mut self, name: &str) -> Self {
        self.state.get_mut().failing_marks.insert(name.to_string());
        self
    }

    pub fn fail_pod_count(mut self, name: &str) -> Self {
        self.state
            .get_mut()
            .failing_pod_counts
            .insert(name.to_string());
        self
    }

    // -------------------------------------------------------------------------
    // Mutation hooks
    // -------------------------------------------------------------------------

    /// Join a fresh schedulable, empty node and return its name
    pub fn provision_node(&self) -> String {
        let mut state = self.state.lock();
        state.provisioned += 1;
        let name = format!("{}-provisioned-{}", self.name, state.provisioned);
        state.nodes.insert(
            name.clone(),
            SimNode {
                schedulable: true,
                pods: 0,
            },
        );
        name
    }

    /// Remove a node; returns false when it did not exist
    pub fn remove_node(&self, name: &str) -> bool {
        self.state.lock().nodes.remove(name).is_some()
    }

    pub fn set_pod_count(&self, name: &str, pods: u32) {
        if let Some(node) = self.state.lock().nodes.get_mut(name) {
            node.pods = pods;
        }
    }

    pub fn set_pending(&self, pending: u32) {
        self.state.lock().pending = pending;
    }

    // -------------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------------

    pub fn node_count(&self) -> usize {
        self.state.lock().nodes.len()
    }

    pub fn node_names(&self) -> Vec<String> {
        self.state.lock().nodes.keys().cloned().collect()
    }

    pub fn is_schedulable(&self, name: &str) -> bool {
        self.state
            .lock()
            .nodes
            .get(name)
            .map(|n| n.schedulable)
            .unwrap_or(false)
    }

    /// Every node passed to `mark_unschedulable`, in call order
    pub fn mark_attempts(&self) -> Vec<String> {
        self.state.lock().mark_attempts.clone()
    }

    /// Nodes successfully marked, in call order
    pub fn marked(&self) -> Vec<String> {
        self.state.lock().marked.clone()
    }

    /// Every node whose pod count was queried
    pub fn pod_count_queries(&self) -> Vec<String> {
        self.state.lock().pod_count_queries.clone()
    }
}

#[async_trait]
impl ClusterClient for InMemoryCluster {
    fn cluster_name(&self) -> &str {
        &self.name
    }

    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        let state = self.state.lock();
        if state.fail_list {
            return Err(Error::Internal("injected node list failure".into()));
        }
        Ok(state
            .nodes
            .iter()
            .map(|(name, node)| NodeRecord::new(name.clone(), node.schedulable))
            .collect())
    }

    async fn critical_node_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.state.lock().critical.clone())
    }

    async fn pod_count_on_node(&self, name: &str) -> Result<u32> {
        let mut state = self.state.lock();
        state.pod_count_queries.push(name.to_string());
        if state.failing_pod_counts.contains(name) {
            return Err(Error::Internal(format!("injected pod count failure on {}", name)));
        }
        state
            .nodes
            .get(name)
            .map(|n| n.pods)
            .ok_or_else(|| Error::Inventory(format!("node {} not found", name)))
    }

    async fn pending_pod_count(&self) -> Result<u32> {
        let state = self.state.lock();
        if state.fail_pending {
            return Err(Error::Internal("injected pending pod failure".into()));
        }
        Ok(state.pending)
    }

    async fn mark_unschedulable(&self, node: &CandidateNode) -> Result<()> {
        let mut state = self.state.lock();
        state.mark_attempts.push(node.name().to_string());

        if state.critical.contains(node.name()) {
            return Err(Error::Internal(format!(
                "refusing to cordon critical node {}",
                node.name()
            )));
        }
        if state.failing_marks.contains(node.name()) {
            return Err(Error::MarkUnschedulable {
                node: node.name().to_string(),
                reason: "injected failure".into(),
            });
        }

        let sim = state.nodes.get_mut(node.name()).ok_or_else(|| {
            Error::MarkUnschedulable {
                node: node.name().to_string(),
                reason: "node not found".into(),
            }
        })?;
        sim.schedulable = false;
        state.marked.push(node.name().to_string());
        debug!(node = %node, "Simulated cordon");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::InventorySnapshot;

    #[tokio::test]
    async fn test_list_and_mark() {
        let cluster = InMemoryCluster::new("sim")
            .with_node("a", true, 1)
            .with_node("b", true, 0);

        let snap = InventorySnapshot::capture(&cluster).await.unwrap();
        cluster.mark_unschedulable(&snap.candidates()[0]).await.unwrap();
        // Idempotent
        cluster.mark_unschedulable(&snap.candidates()[0]).await.unwrap();

        assert!(!cluster.is_schedulable("a"));
        assert!(cluster.is_schedulable("b"));
        assert_eq!(cluster.marked(), vec!["a".to_string(), "a".to_string()]);
    }

    #[tokio::test]
    async fn test_provision_and_remove() {
        let cluster = InMemoryCluster::new("sim");
        let name = cluster.provision_node();
        assert_eq!(name, "sim-provisioned-1");
        assert!(cluster.is_schedulable(&name));
        assert!(cluster.remove_node(&name));
        assert!(!cluster.remove_node(&name));
        assert_eq!(cluster.node_count(), 0);
    }

    #[tokio::test]
    async fn test_fail_list() {
        let cluster = InMemoryCluster::new("sim").fail_list();
        assert!(cluster.list_nodes().await.is_err());
    }
}
