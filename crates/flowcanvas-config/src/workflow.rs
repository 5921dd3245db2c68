use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::edge::Edge;
use crate::node::Node;

/// Pan/zoom state of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
  pub x: f64,
  pub y: f64,
  pub zoom: f64,
}

impl Default for Viewport {
  fn default() -> Self {
    Self {
      x: 0.0,
      y: 0.0,
      zoom: 1.0,
    }
  }
}

/// The persisted form of a workflow graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct WorkflowDocument {
  #[serde(default)]
  pub nodes: Vec<Node>,
  #[serde(default)]
  pub edges: Vec<Edge>,
  #[serde(default)]
  pub viewport: Viewport,
  /// Incremented by the backend on every save.
  #[serde(default)]
  pub version: u32,
}

impl WorkflowDocument {
  /// The save payload for this document.
  pub fn draft(&self) -> DocumentDraft {
    DocumentDraft {
      nodes: self.nodes.clone(),
      edges: self.edges.clone(),
      viewport: self.viewport,
    }
  }

  pub fn get_node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }
}

/// The graph state sent to the backend on save.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentDraft {
  pub nodes: Vec<Node>,
  pub edges: Vec<Edge>,
  #[serde(default)]
  pub viewport: Viewport,
}

/// One entry of a workflow's version history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionSummary {
  pub version: u32,
  pub created_at: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub created_by: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub note: Option<String>,
}
