//! Mapping of test execution results onto the static graph.

use std::collections::HashMap;

use flowcanvas_config::{
  Edge, Node, NodeData, NodeResult, NodeResultStatus, TestExecution, condition_handle,
};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

/// Visual execution state of a node or edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
  #[default]
  Idle,
  /// Not reached yet; the upstream node is still waiting.
  Pending,
  Running,
  Success,
  Failed,
  Skipped,
}

impl From<NodeResultStatus> for ExecutionStatus {
  fn from(status: NodeResultStatus) -> Self {
    match status {
      NodeResultStatus::Success => ExecutionStatus::Success,
      NodeResultStatus::Failed => ExecutionStatus::Failed,
      NodeResultStatus::Skipped => ExecutionStatus::Skipped,
      NodeResultStatus::Waiting => ExecutionStatus::Running,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeOverlay {
  pub node_id: String,
  pub status: ExecutionStatus,
  /// Only set for successful nodes.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeOverlay {
  pub edge_id: String,
  pub status: ExecutionStatus,
  /// Whether the edge lies on the path the execution actually took.
  pub taken: bool,
  /// Duration of the source node, only set when the edge was taken.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
}

/// Per-node and per-edge execution state, in graph order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Overlay {
  pub nodes: Vec<NodeOverlay>,
  pub edges: Vec<EdgeOverlay>,
}

impl Overlay {
  pub fn node(&self, node_id: &str) -> Option<&NodeOverlay> {
    self.nodes.iter().find(|n| n.node_id == node_id)
  }

  pub fn edge(&self, edge_id: &str) -> Option<&EdgeOverlay> {
    self.edges.iter().find(|e| e.edge_id == edge_id)
  }

  pub fn node_status(&self, node_id: &str) -> ExecutionStatus {
    self.node(node_id).map(|n| n.status).unwrap_or_default()
  }

  pub fn edge_status(&self, edge_id: &str) -> ExecutionStatus {
    self.edge(edge_id).map(|e| e.status).unwrap_or_default()
  }
}

/// Path recorded by a node that chooses between outputs.
enum TakenPath<'a> {
  Branch(&'a str),
  Condition(bool),
}

/// Merge a test execution onto the graph.
///
/// Results for nodes that are no longer in the graph are ignored. While a
/// test is running, the entry trigger is shown as running until its result
/// arrives.
pub fn map_overlay(
  nodes: &[Node],
  edges: &[Edge],
  execution: Option<&TestExecution>,
  test_running: bool,
) -> Overlay {
  let graph = Graph::new(nodes, edges);

  let mut results: HashMap<&str, &NodeResult> = HashMap::new();
  if let Some(execution) = execution {
    for result in &execution.node_results {
      results.insert(result.node_id.as_str(), result);
    }
  }

  let entry = graph.entry_trigger();
  let node_overlays = nodes
    .iter()
    .map(|node| match results.get(node.id.as_str()) {
      Some(result) => {
        let status = ExecutionStatus::from(result.status);
        NodeOverlay {
          node_id: node.id.clone(),
          status,
          duration_ms: success_duration(status, result),
          error: result.error.clone(),
        }
      }
      None => {
        let status = if test_running && entry == Some(node.id.as_str()) {
          ExecutionStatus::Running
        } else {
          ExecutionStatus::Idle
        };
        NodeOverlay {
          node_id: node.id.clone(),
          status,
          duration_ms: None,
          error: None,
        }
      }
    })
    .collect();

  let edge_overlays = edges
    .iter()
    .map(|edge| {
      let source = graph.node(&edge.source);
      let result = source.and_then(|_| results.get(edge.source.as_str()).copied());
      let status = edge_status(edge, source, result);
      EdgeOverlay {
        edge_id: edge.id.clone(),
        status,
        taken: status == ExecutionStatus::Success,
        duration_ms: result.and_then(|r| success_duration(status, r)),
      }
    })
    .collect();

  Overlay {
    nodes: node_overlays,
    edges: edge_overlays,
  }
}

fn success_duration(status: ExecutionStatus, result: &NodeResult) -> Option<u64> {
  match status {
    ExecutionStatus::Success => result.duration_ms,
    _ => None,
  }
}

fn edge_status(edge: &Edge, source: Option<&Node>, result: Option<&NodeResult>) -> ExecutionStatus {
  let Some(result) = result else {
    return ExecutionStatus::Idle;
  };

  match result.status {
    NodeResultStatus::Failed => ExecutionStatus::Failed,
    NodeResultStatus::Skipped => ExecutionStatus::Skipped,
    NodeResultStatus::Waiting => ExecutionStatus::Pending,
    NodeResultStatus::Success => match taken_path(result) {
      None => ExecutionStatus::Success,
      Some(path) if handle_matches(edge.source_handle.as_deref(), &path, source) => {
        ExecutionStatus::Success
      }
      Some(_) => ExecutionStatus::Skipped,
    },
  }
}

fn taken_path(result: &NodeResult) -> Option<TakenPath<'_>> {
  if let Some(branch) = result.selected_branch.as_deref() {
    return Some(TakenPath::Branch(branch));
  }
  result.condition_result.map(TakenPath::Condition)
}

fn handle_matches(handle: Option<&str>, path: &TakenPath<'_>, source: Option<&Node>) -> bool {
  let Some(handle) = handle else {
    return false;
  };

  match path {
    TakenPath::Condition(outcome) => handle == condition_handle(*outcome),
    TakenPath::Branch(selected) => {
      if let Some(Node {
        data: NodeData::Branch(config),
        ..
      }) = source
        && let (Some(a), Some(b)) = (config.resolve_handle(handle), config.resolve_handle(selected))
      {
        return a == b;
      }
      handle == *selected
    }
  }
}
