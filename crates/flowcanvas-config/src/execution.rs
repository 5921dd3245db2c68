//! Test execution results as returned by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a single node in a test execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeResultStatus {
  Success,
  Failed,
  Skipped,
  /// The node is paused (e.g. a wait node) and has not completed yet.
  Waiting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeResult {
  pub node_id: String,
  #[serde(default)]
  pub node_type: String,
  pub status: NodeResultStatus,
  /// Outcome of a condition node.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub condition_result: Option<bool>,
  /// Branch taken by a branch node.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub selected_branch: Option<String>,
  /// Reported in milliseconds; fractional values are rounded.
  #[serde(
    default,
    deserialize_with = "crate::number::round_whole",
    skip_serializing_if = "Option::is_none"
  )]
  pub duration_ms: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub output: Option<serde_json::Value>,
}

impl NodeResult {
  pub fn new(node_id: impl Into<String>, status: NodeResultStatus) -> Self {
    Self {
      node_id: node_id.into(),
      node_type: String::new(),
      status,
      condition_result: None,
      selected_branch: None,
      duration_ms: None,
      error: None,
      output: None,
    }
  }
}

/// Result of an on-demand dry run of a workflow.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TestExecution {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub execution_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub status: Option<String>,
  #[serde(default)]
  pub node_results: Vec<NodeResult>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub started_at: Option<DateTime<Utc>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub completed_at: Option<DateTime<Utc>>,
}

impl TestExecution {
  /// The result recorded for a node. Later entries win over earlier ones.
  pub fn result_for(&self, node_id: &str) -> Option<&NodeResult> {
    self.node_results.iter().rev().find(|r| r.node_id == node_id)
  }
}
