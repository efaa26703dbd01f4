//! Kubernetes cluster client
//!
//! Reads nodes and pods through the Kubernetes API and cordons nodes with a
//! merge patch on `spec.unschedulable`.

use crate::domain::ports::{ClusterClient, NodeRecord};
use crate::error::{Error, Result};
use crate::inventory::CandidateNode;
use crate::settings::ClusterSettings;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::api::{Api, ListParams, Patch, PatchParams};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Annotation carried by mirror pods of static manifests
const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";

// =============================================================================
// Context Selection
// =============================================================================

/// A resolved kubeconfig context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedContext {
    pub context: String,
    pub cluster: String,
}

/// Find the single context whose name contains `segment`
pub fn select_context(kubeconfig: &Kubeconfig, segment: &str) -> Result<SelectedContext> {
    let matches: Vec<_> = kubeconfig
        .contexts
        .iter()
        .filter(|c| c.name.contains(segment))
        .collect();

    match matches.as_slice() {
        [] => Err(Error::ContextNotFound {
            segment: segment.to_string(),
        }),
        [named] => {
            let cluster = named
                .context
                .as_ref()
                .map(|c| c.cluster.clone())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| named.name.clone());
            Ok(SelectedContext {
                context: named.name.clone(),
                cluster,
            })
        }
        many => Err(Error::AmbiguousContext {
            segment: segment.to_string(),
            matches: many
                .iter()
                .map(|c| c.name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }),
    }
}

// =============================================================================
// Object Helpers
// =============================================================================

/// Convert an API node into a record; nameless nodes are skipped
pub fn node_record(node: &Node) -> Option<NodeRecord> {
    let name = node.metadata.name.clone()?;
    let unschedulable = node
        .spec
        .as_ref()
        .and_then(|s| s.unschedulable)
        .unwrap_or(false);
    Some(NodeRecord::new(name, !unschedulable))
}

/// Whether a pod counts as a workload that must move before its node dies.
///
/// System namespaces, DaemonSet pods and mirror pods are bound to the node
/// and never relocate.
pub fn is_relocatable(pod: &Pod, system_namespaces: &[String]) -> bool {
    let meta = &pod.metadata;

    if let Some(ns) = &meta.namespace {
        if system_namespaces.iter().any(|s| s == ns) {
            return false;
        }
    }

    let daemonset_owned = meta
        .owner_references
        .as_ref()
        .map(|refs| refs.iter().any(|r| r.kind == "DaemonSet"))
        .unwrap_or(false);
    if daemonset_owned {
        return false;
    }

    let mirror = meta
        .annotations
        .as_ref()
        .map(|a| a.contains_key(MIRROR_POD_ANNOTATION))
        .unwrap_or(false);
    !mirror
}

/// Field selector for live pods placed on a node
pub fn pods_on_node_selector(node: &str) -> String {
    format!(
        "spec.nodeName={},status.phase!=Succeeded,status.phase!=Failed",
        node
    )
}

/// Field selector for pods not yet bound to any node
pub const PENDING_POD_SELECTOR: &str = "status.phase=Pending,spec.nodeName=";

// =============================================================================
// Kube Cluster Client
// =============================================================================

/// `ClusterClient` backed by the Kubernetes API
pub struct KubeClusterClient {
    client: Client,
    cluster_name: String,
    critical_nodes: BTreeSet<String>,
    settings: ClusterSettings,
}

impl KubeClusterClient {
    /// Connect using the kubeconfig context matching `segment`
    pub async fn connect(
        segment: &str,
        critical_nodes: BTreeSet<String>,
        settings: ClusterSettings,
    ) -> Result<Self> {
        let kubeconfig = Kubeconfig::read()?;
        let selected = select_context(&kubeconfig, segment)?;

        info!(
            context = %selected.context,
            cluster = %selected.cluster,
            "Using kubeconfig context"
        );

        let options = KubeConfigOptions {
            context: Some(selected.context.clone()),
            ..Default::default()
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options).await?;
        let client = Client::try_from(config)?;

        Ok(Self::new(client, selected.cluster, critical_nodes, settings))
    }

    pub fn new(
        client: Client,
        cluster_name: String,
        critical_nodes: BTreeSet<String>,
        settings: ClusterSettings,
    ) -> Self {
        Self {
            client,
            cluster_name,
            critical_nodes,
            settings,
        }
    }

    fn nodes(&self) -> Api<Node> {
        Api::all(self.client.clone())
    }

    fn pods(&self) -> Api<Pod> {
        Api::all(self.client.clone())
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    fn cluster_name(&self) -> &str {
        &self.cluster_name
    }

    async fn list_nodes(&self) -> Result<Vec<NodeRecord>> {
        let list = self.nodes().list(&ListParams::default()).await?;
        Ok(list.items.iter().filter_map(node_record).collect())
    }

    async fn critical_node_names(&self) -> Result<BTreeSet<String>> {
        Ok(self.critical_nodes.clone())
    }

    async fn pod_count_on_node(&self, name: &str) -> Result<u32> {
        let params = ListParams::default().fields(&pods_on_node_selector(name));
        let list = self.pods().list(&params).await?;
        let count = list
            .items
            .iter()
            .filter(|p| is_relocatable(p, &self.settings.system_namespaces))
            .count();
        debug!(node = %name, total = list.items.len(), counted = count, "Counted pods on node");
        Ok(count as u32)
    }

    async fn pending_pod_count(&self) -> Result<u32> {
        let params = ListParams::default().fields(PENDING_POD_SELECTOR);
        let list = self.pods().list(&params).await?;
        Ok(list
            .items
            .iter()
            .filter(|p| is_relocatable(p, &self.settings.system_namespaces))
            .count() as u32)
    }

    async fn mark_unschedulable(&self, node: &CandidateNode) -> Result<()> {
        let patch = json!({ "spec": { "unschedulable": true } });
        self.nodes()
            .patch(node.name(), &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::MarkUnschedulable {
                node: node.name().to_string(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
