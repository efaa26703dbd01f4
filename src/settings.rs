//! Scaler settings
//!
//! Loaded from a YAML file. Every section has defaults, so a partial file
//! (or none at all) is valid input.

use crate::error::{Error, Result};
use crate::planner::PlannerOptions;
use crate::scaling::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

// =============================================================================
// Sections
// =============================================================================

/// Orchestrator-side settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSettings {
    /// Pods in these namespaces never count as relocatable workloads
    pub system_namespaces: Vec<String>,
}

impl Default for ClusterSettings {
    fn default() -> Self {
        Self {
            system_namespaces: vec!["kube-system".to_string()],
        }
    }
}

/// `gcloud` provider settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    pub gcloud_path: String,
    pub project: Option<String>,
    pub zone: String,
    pub node_pool: String,
    /// Managed instance group backing the node pool
    pub instance_group: String,
    pub command_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            gcloud_path: "gcloud".to_string(),
            project: None,
            zone: String::new(),
            node_pool: "default-pool".to_string(),
            instance_group: String::new(),
            command_timeout_secs: 300,
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Complete scaler configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Nodes that are never drained or destroyed
    pub critical_nodes: Vec<String>,
    pub cluster: ClusterSettings,
    pub planner: PlannerOptions,
    pub provider: ProviderSettings,
}

impl Settings {
    /// Load from a file, or fall back to defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                let settings = Self::from_yaml(&text)?;
                info!(path = %path.display(), "Loaded settings");
                Ok(settings)
            }
            None => {
                warn!("No settings file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// The critical set, de-duplicated
    pub fn critical_set(&self) -> BTreeSet<String> {
        self.critical_nodes.iter().cloned().collect()
    }

    /// Reject settings the loop cannot run with. Provider fields are only
    /// required when provider calls will actually be issued.
    pub fn validate(&self, mode: ExecutionMode) -> Result<()> {
        if self.planner.pods_per_node == 0 {
            return Err(Error::Configuration(
                "planner.pods_per_node must be greater than 0".into(),
            ));
        }
        if self.planner.min_nodes > self.planner.max_nodes {
            return Err(Error::Configuration(format!(
                "planner.min_nodes ({}) exceeds planner.max_nodes ({})",
                self.planner.min_nodes, self.planner.max_nodes
            )));
        }
        if self.provider.command_timeout_secs == 0 {
            return Err(Error::Configuration(
                "provider.command_timeout_secs must be greater than 0".into(),
            ));
        }

        if !mode.is_dry_run() {
            if self.provider.zone.is_empty() {
                return Err(Error::Configuration("provider.zone is required".into()));
            }
            if self.provider.instance_group.is_empty() {
                return Err(Error::Configuration(
                    "provider.instance_group is required".into(),
                ));
            }
        }

        if self.critical_nodes.is_empty() {
            warn!("No critical nodes configured; every node is a scaling candidate");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const FULL: &str = r#"
critical_nodes:
  - core-0
  - core-1
  - core-0
cluster:
  system_namespaces: [kube-system, monitoring]
planner:
  pods_per_node: 20
  headroom_nodes: 1
  max_nodes: 40
provider:
  project: acme
  zone: us-central1-a
  node_pool: workers
  instance_group: gke-prod-workers-grp
"#;

    #[test]
    fn test_parse_full() {
        let settings = Settings::from_yaml(FULL).unwrap();
        assert_eq!(settings.critical_set().len(), 2);
        assert_eq!(settings.cluster.system_namespaces.len(), 2);
        assert_eq!(settings.planner.pods_per_node, 20);
        assert_eq!(settings.planner.min_nodes, 0);
        assert_eq!(settings.provider.gcloud_path, "gcloud");
        assert_eq!(settings.provider.command_timeout_secs, 300);
        settings.validate(ExecutionMode::Live).unwrap();
    }

    #[test]
    fn test_defaults_valid_for_dry_run_only() {
        let settings = Settings::default();
        settings.validate(ExecutionMode::DryRun).unwrap();
        assert_matches!(
            settings.validate(ExecutionMode::Live),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_rejects_bad_planner() {
        let mut settings = Settings::from_yaml(FULL).unwrap();
        settings.planner.pods_per_node = 0;
        assert_matches!(
            settings.validate(ExecutionMode::DryRun),
            Err(Error::Configuration(_))
        );

        let mut settings = Settings::from_yaml(FULL).unwrap();
        settings.planner.min_nodes = 50;
        assert_matches!(
            settings.validate(ExecutionMode::DryRun),
            Err(Error::Configuration(_))
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(FULL.as_bytes()).unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.provider.node_pool, "workers");

        assert_matches!(Settings::load(None), Ok(s) if s == Settings::default());
    }

    #[test]
    fn test_invalid_yaml() {
        assert_matches!(
            Settings::from_yaml("critical_nodes: {not: a list}"),
            Err(Error::YamlParse(_))
        );
    }
}
