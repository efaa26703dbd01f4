//! Node Inventory Snapshot
//!
//! A point-in-time read of the cluster's nodes, split once into critical and
//! candidate views. `CandidateNode` has no public constructor: the only way to
//! obtain one is through [`partition`], which never yields a node whose name
//! is in the critical set. Every mutating port takes `&CandidateNode`, so a
//! critical node cannot reach a drain or terminate call.

use crate::domain::ports::{ClusterClient, NodeRecord};
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

// =============================================================================
// Node Views
// =============================================================================

/// A node in the protected set. Only its name is ever observed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CriticalNode {
    name: String,
}

impl CriticalNode {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A non-critical node whose pod count has not been read yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateRecord {
    record: NodeRecord,
}

impl CandidateRecord {
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Attach the observed workload count, producing a decision-ready node
    pub fn with_pod_count(self, running_pod_count: u32) -> CandidateNode {
        CandidateNode {
            name: self.record.name,
            schedulable: self.record.schedulable,
            running_pod_count,
        }
    }
}

/// A non-critical node eligible for drain and termination decisions
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CandidateNode {
    name: String,
    schedulable: bool,
    running_pod_count: u32,
}

impl CandidateNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_schedulable(&self) -> bool {
        self.schedulable
    }

    pub fn running_pod_count(&self) -> u32 {
        self.running_pod_count
    }

    /// Unschedulable and observed empty
    pub fn is_drained(&self) -> bool {
        !self.schedulable && self.running_pod_count == 0
    }
}

impl std::fmt::Display for CandidateNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// =============================================================================
// Partition
// =============================================================================

/// Result of splitting a node list by critical-name membership
#[derive(Debug, Clone, Default)]
pub struct Partition {
    pub critical: Vec<CriticalNode>,
    pub candidates: Vec<CandidateRecord>,
}

/// Split nodes into disjoint critical and candidate views, each sorted by name
pub fn partition(records: Vec<NodeRecord>, critical_names: &BTreeSet<String>) -> Partition {
    let mut out = Partition::default();

    for record in records {
        if critical_names.contains(&record.name) {
            out.critical.push(CriticalNode { name: record.name });
        } else {
            out.candidates.push(CandidateRecord { record });
        }
    }

    out.critical.sort_by(|a, b| a.name.cmp(&b.name));
    out.candidates.sort_by(|a, b| a.record.name.cmp(&b.record.name));
    out
}

// =============================================================================
// Snapshot
// =============================================================================

/// Immutable view of the cluster for one invocation
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    critical: Vec<CriticalNode>,
    candidates: Vec<CandidateNode>,
    pending_pods: u32,
    taken_at: DateTime<Utc>,
}

impl InventorySnapshot {
    /// Read the cluster once and partition it.
    ///
    /// Pod counts are only queried for candidate nodes. Any read failure
    /// aborts the capture; a partial inventory is never returned.
    pub async fn capture(client: &dyn ClusterClient) -> Result<Self> {
        let records = client
            .list_nodes()
            .await
            .map_err(|e| Error::Inventory(format!("listing nodes: {}", e)))?;
        let critical_names = client
            .critical_node_names()
            .await
            .map_err(|e| Error::Inventory(format!("reading critical node names: {}", e)))?;

        let Partition {
            critical,
            candidates,
        } = partition(records, &critical_names);

        for name in &critical_names {
            if !critical.iter().any(|n| &n.name == name) {
                warn!(node = %name, "Critical node not present in cluster inventory");
            }
        }

        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let count = client.pod_count_on_node(candidate.name()).await.map_err(|e| {
                Error::Inventory(format!("counting pods on {}: {}", candidate.name(), e))
            })?;
            debug!(node = %candidate.name(), pods = count, "Observed candidate node");
            resolved.push(candidate.with_pod_count(count));
        }

        let pending_pods = client
            .pending_pod_count()
            .await
            .map_err(|e| Error::Inventory(format!("counting pending pods: {}", e)))?;

        Ok(Self {
            critical,
            candidates: resolved,
            pending_pods,
            taken_at: Utc::now(),
        })
    }

    /// Build a snapshot from already-known data. Nodes missing from
    /// `pod_counts` are treated as empty.
    pub fn from_parts(
        records: Vec<NodeRecord>,
        critical_names: &BTreeSet<String>,
        pod_counts: &BTreeMap<String, u32>,
        pending_pods: u32,
    ) -> Self {
        let Partition {
            critical,
            candidates,
        } = partition(records, critical_names);

        let candidates = candidates
            .into_iter()
            .map(|c| {
                let count = pod_counts.get(c.name()).copied().unwrap_or(0);
                c.with_pod_count(count)
            })
            .collect();

        Self {
            critical,
            candidates,
            pending_pods,
            taken_at: Utc::now(),
        }
    }

    pub fn critical_nodes(&self) -> &[CriticalNode] {
        &self.critical
    }

    pub fn candidates(&self) -> &[CandidateNode] {
        &self.candidates
    }

    pub fn critical_count(&self) -> usize {
        self.critical.len()
    }

    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    /// Critical plus candidate nodes, regardless of schedulability
    pub fn total_node_count(&self) -> usize {
        self.critical.len() + self.candidates.len()
    }

    /// Sum of running pods across candidate nodes
    pub fn running_pods(&self) -> u64 {
        self.candidates
            .iter()
            .map(|n| n.running_pod_count as u64)
            .sum()
    }

    pub fn pending_pods(&self) -> u32 {
        self.pending_pods
    }

    pub fn taken_at(&self) -> DateTime<Utc> {
        self.taken_at
    }
}
