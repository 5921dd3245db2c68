use serde::{Deserialize, Serialize};

use crate::node::NodeId;

pub type EdgeId = String;

/// Source handle of a condition node's "true" output.
pub const CONDITION_TRUE_HANDLE: &str = "true";
/// Source handle of a condition node's "false" output.
pub const CONDITION_FALSE_HANDLE: &str = "false";

/// The condition handle for a boolean outcome.
pub fn condition_handle(outcome: bool) -> &'static str {
  if outcome {
    CONDITION_TRUE_HANDLE
  } else {
    CONDITION_FALSE_HANDLE
  }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
  pub id: EdgeId,
  pub source: NodeId,
  pub target: NodeId,
  /// Which output of the source node this edge leaves from.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub target_handle: Option<String>,
}

impl Edge {
  pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
    Self {
      id: id.into(),
      source: source.into(),
      target: target.into(),
      source_handle: None,
      target_handle: None,
    }
  }

  pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
    self.source_handle = Some(handle.into());
    self
  }

  /// Whether the edge starts or ends at the given node.
  pub fn touches(&self, node_id: &str) -> bool {
    self.source == node_id || self.target == node_id
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_handles_use_camel_case() {
    let edge = Edge::new("e1", "c1", "a1").with_source_handle("true");
    let value = serde_json::to_value(&edge).unwrap();
    assert_eq!(value["sourceHandle"], "true");
    assert!(value.get("targetHandle").is_none());
  }

  #[test]
  fn test_null_handles_accepted() {
    let edge: Edge = serde_json::from_value(json!({
      "id": "e1",
      "source": "t1",
      "target": "a1",
      "sourceHandle": null,
      "targetHandle": null,
      "animated": true
    }))
    .unwrap();
    assert_eq!(edge.source_handle, None);
    assert!(edge.touches("t1"));
    assert!(edge.touches("a1"));
    assert!(!edge.touches("x"));
  }
}
