use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::enums::{ConditionLogic, DurationUnit, JoinType, WaitType};
use crate::error::DataError;

pub type NodeId = String;

/// Position of a node in graph space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
  pub x: f64,
  pub y: f64,
}

impl Position {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// The closed set of node types a workflow graph may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
  Trigger,
  Action,
  Condition,
  Wait,
  Agent,
  Branch,
  Join,
}

impl NodeKind {
  /// All node kinds, in palette order.
  pub fn all() -> &'static [NodeKind] {
    &[
      NodeKind::Trigger,
      NodeKind::Action,
      NodeKind::Condition,
      NodeKind::Wait,
      NodeKind::Agent,
      NodeKind::Branch,
      NodeKind::Join,
    ]
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      NodeKind::Trigger => "trigger",
      NodeKind::Action => "action",
      NodeKind::Condition => "condition",
      NodeKind::Wait => "wait",
      NodeKind::Agent => "agent",
      NodeKind::Branch => "branch",
      NodeKind::Join => "join",
    }
  }

  /// Human readable name, used when a node has no explicit label.
  pub fn title(&self) -> &'static str {
    match self {
      NodeKind::Trigger => "Trigger",
      NodeKind::Action => "Action",
      NodeKind::Condition => "Condition",
      NodeKind::Wait => "Wait",
      NodeKind::Agent => "AI Agent",
      NodeKind::Branch => "Branch",
      NodeKind::Join => "Join",
    }
  }
}

impl fmt::Display for NodeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for NodeKind {
  type Err = DataError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    NodeKind::all()
      .iter()
      .copied()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| DataError::UnknownNodeKind(s.to_string()))
  }
}

/// A single step of a workflow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
  pub id: NodeId,
  #[serde(default)]
  pub position: Position,
  /// Type tag and type-specific configuration (`"type"` + `"data"` on the wire).
  #[serde(flatten)]
  pub data: NodeData,
}

impl Node {
  pub fn new(id: impl Into<NodeId>, position: Position, data: NodeData) -> Self {
    Self {
      id: id.into(),
      position,
      data,
    }
  }

  pub fn kind(&self) -> NodeKind {
    self.data.kind()
  }

  /// The node's explicit label, falling back to its type name.
  pub fn display_label(&self) -> String {
    self
      .data
      .label()
      .map(str::to_string)
      .unwrap_or_else(|| self.kind().title().to_string())
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum NodeData {
  Trigger(TriggerConfig),
  Action(ActionConfig),
  Condition(ConditionConfig),
  Wait(WaitConfig),
  Agent(AgentConfig),
  Branch(BranchConfig),
  Join(JoinConfig),
}

impl NodeData {
  /// Default data for a freshly created node.
  ///
  /// `subtype` seeds the trigger type, action type or agent id of the new
  /// node (as picked from the palette) and is ignored for other kinds.
  pub fn defaults(kind: NodeKind, subtype: Option<&str>) -> Self {
    let subtype = subtype.map(str::to_string).unwrap_or_default();
    match kind {
      NodeKind::Trigger => NodeData::Trigger(TriggerConfig {
        trigger_type: subtype,
        ..Default::default()
      }),
      NodeKind::Action => NodeData::Action(ActionConfig {
        action_type: subtype,
        ..Default::default()
      }),
      NodeKind::Condition => NodeData::Condition(ConditionConfig::default()),
      NodeKind::Wait => NodeData::Wait(WaitConfig {
        wait_type: WaitType::Duration,
        duration_value: Some(1),
        duration_unit: Some(DurationUnit::Days),
        ..Default::default()
      }),
      NodeKind::Agent => NodeData::Agent(AgentConfig {
        agent_id: subtype,
        ..Default::default()
      }),
      NodeKind::Branch => NodeData::Branch(BranchConfig {
        branches: vec![
          BranchDescriptor::new("branch_1", "Branch 1"),
          BranchDescriptor::new("branch_2", "Branch 2"),
        ],
        ..Default::default()
      }),
      NodeKind::Join => NodeData::Join(JoinConfig::default()),
    }
  }

  pub fn kind(&self) -> NodeKind {
    match self {
      NodeData::Trigger(_) => NodeKind::Trigger,
      NodeData::Action(_) => NodeKind::Action,
      NodeData::Condition(_) => NodeKind::Condition,
      NodeData::Wait(_) => NodeKind::Wait,
      NodeData::Agent(_) => NodeKind::Agent,
      NodeData::Branch(_) => NodeKind::Branch,
      NodeData::Join(_) => NodeKind::Join,
    }
  }

  pub fn label(&self) -> Option<&str> {
    let label = match self {
      NodeData::Trigger(c) => &c.label,
      NodeData::Action(c) => &c.label,
      NodeData::Condition(c) => &c.label,
      NodeData::Wait(c) => &c.label,
      NodeData::Agent(c) => &c.label,
      NodeData::Branch(c) => &c.label,
      NodeData::Join(c) => &c.label,
    };
    label.as_deref()
  }

  /// The type-specific configuration as a JSON value (the wire `data` field).
  pub fn to_value(&self) -> Result<Value, DataError> {
    let result = match self {
      NodeData::Trigger(c) => serde_json::to_value(c),
      NodeData::Action(c) => serde_json::to_value(c),
      NodeData::Condition(c) => serde_json::to_value(c),
      NodeData::Wait(c) => serde_json::to_value(c),
      NodeData::Agent(c) => serde_json::to_value(c),
      NodeData::Branch(c) => serde_json::to_value(c),
      NodeData::Join(c) => serde_json::to_value(c),
    };
    result.map_err(|source| DataError::InvalidData {
      kind: self.kind(),
      source,
    })
  }

  /// Read the configuration of the given kind from a JSON value.
  pub fn from_value(kind: NodeKind, value: Value) -> Result<Self, DataError> {
    let result = match kind {
      NodeKind::Trigger => serde_json::from_value(value).map(NodeData::Trigger),
      NodeKind::Action => serde_json::from_value(value).map(NodeData::Action),
      NodeKind::Condition => serde_json::from_value(value).map(NodeData::Condition),
      NodeKind::Wait => serde_json::from_value(value).map(NodeData::Wait),
      NodeKind::Agent => serde_json::from_value(value).map(NodeData::Agent),
      NodeKind::Branch => serde_json::from_value(value).map(NodeData::Branch),
      NodeKind::Join => serde_json::from_value(value).map(NodeData::Join),
    };
    result.map_err(|source| DataError::InvalidData { kind, source })
  }

  /// Shallow-merge `patch` into the current configuration.
  ///
  /// Top-level keys of `patch` replace the existing keys. Keys without a
  /// typed field land in the config's `extra` map. The node kind never
  /// changes; on error the data is left untouched.
  pub fn merge(&mut self, patch: &Value) -> Result<(), DataError> {
    let patch = patch.as_object().ok_or(DataError::PatchNotObject)?;
    let kind = self.kind();

    let mut current = match self.to_value()? {
      Value::Object(map) => map,
      _ => Map::new(),
    };
    for (key, value) in patch {
      current.insert(key.clone(), value.clone());
    }

    *self = NodeData::from_value(kind, Value::Object(current))?;
    Ok(())
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
  /// Event that fires the workflow, e.g. "record_created". Empty when unset.
  pub trigger_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Map::is_empty")]
  pub config: Map<String, Value>,
  /// Keys this crate does not model, kept as-is.
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl TriggerConfig {
  pub fn is_configured(&self) -> bool {
    !self.trigger_type.trim().is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
  /// Action to perform, e.g. "send_email". Empty when unset.
  pub action_type: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Map::is_empty")]
  pub config: Map<String, Value>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl ActionConfig {
  pub fn is_configured(&self) -> bool {
    !self.action_type.trim().is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  pub logic: ConditionLogic,
  pub rules: Vec<ConditionRule>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionRule {
  pub field: String,
  pub operator: String,
  #[serde(default)]
  pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  pub wait_type: WaitType,
  #[serde(
    deserialize_with = "crate::number::round_whole",
    skip_serializing_if = "Option::is_none"
  )]
  pub duration_value: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_unit: Option<DurationUnit>,
  /// RFC 3339 timestamp for `wait_type = "datetime"`.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub datetime: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub event_type: Option<String>,
  #[serde(
    deserialize_with = "crate::number::round_whole",
    skip_serializing_if = "Option::is_none"
  )]
  pub timeout_value: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub timeout_unit: Option<DurationUnit>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
  /// Agent to run. Empty when unset.
  pub agent_id: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub instructions: Option<String>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl AgentConfig {
  pub fn is_configured(&self) -> bool {
    !self.agent_id.trim().is_empty()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchDescriptor {
  pub id: String,
  pub label: String,
}

impl BranchDescriptor {
  pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
    Self {
      id: id.into(),
      label: label.into(),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BranchConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  pub branches: Vec<BranchDescriptor>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

impl BranchConfig {
  /// Resolve a source handle to the id of the branch it belongs to.
  ///
  /// Handles may be written as the branch id, the zero-based branch index,
  /// or `branch-<index>`.
  pub fn resolve_handle(&self, handle: &str) -> Option<&str> {
    if let Some(branch) = self.branches.iter().find(|b| b.id == handle) {
      return Some(&branch.id);
    }

    let index = handle
      .strip_prefix("branch-")
      .unwrap_or(handle)
      .parse::<usize>()
      .ok()?;
    self.branches.get(index).map(|b| b.id.as_str())
  }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinConfig {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub label: Option<String>,
  pub join_type: JoinType,
  /// Number of incoming paths to wait for when `join_type = "count"`.
  #[serde(
    deserialize_with = "crate::number::round_whole",
    skip_serializing_if = "Option::is_none"
  )]
  pub expected_count: Option<u32>,
  #[serde(flatten)]
  pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_parse_canvas_node() {
    let node: Node = serde_json::from_value(json!({
      "id": "a1",
      "type": "action",
      "position": { "x": 250, "y": 200.5 },
      "data": { "action_type": "send_email", "config": { "template": "welcome" } },
      "width": 220,
      "selected": false
    }))
    .unwrap();

    assert_eq!(node.id, "a1");
    assert_eq!(node.kind(), NodeKind::Action);
    assert_eq!(node.position, Position::new(250.0, 200.5));
    match &node.data {
      NodeData::Action(c) => {
        assert_eq!(c.action_type, "send_email");
        assert_eq!(c.config["template"], "welcome");
      }
      other => panic!("expected action data, got {:?}", other),
    }
  }

  #[test]
  fn test_serialize_node_shape() {
    let node = Node::new(
      "w1",
      Position::new(10.0, 20.0),
      NodeData::defaults(NodeKind::Wait, None),
    );
    let value = serde_json::to_value(&node).unwrap();

    assert_eq!(value["type"], "wait");
    assert_eq!(value["position"]["x"], 10.0);
    assert_eq!(value["data"]["wait_type"], "duration");
    assert_eq!(value["data"]["duration_value"], 1);
    assert_eq!(value["data"]["duration_unit"], "days");
  }

  #[test]
  fn test_unknown_node_type_rejected() {
    let result: Result<Node, _> = serde_json::from_value(json!({
      "id": "x",
      "type": "loop",
      "position": { "x": 0, "y": 0 },
      "data": {}
    }));
    assert!(result.is_err());
    assert!(matches!(
      "loop".parse::<NodeKind>(),
      Err(DataError::UnknownNodeKind(_))
    ));
  }

  #[test]
  fn test_kind_round_trips_through_str() {
    for kind in NodeKind::all() {
      assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), *kind);
    }
  }

  #[test]
  fn test_defaults_seed_subtype() {
    match NodeData::defaults(NodeKind::Action, Some("send_sms")) {
      NodeData::Action(c) => assert_eq!(c.action_type, "send_sms"),
      other => panic!("expected action data, got {:?}", other),
    }
    match NodeData::defaults(NodeKind::Branch, Some("ignored")) {
      NodeData::Branch(c) => assert_eq!(c.branches.len(), 2),
      other => panic!("expected branch data, got {:?}", other),
    }
  }

  #[test]
  fn test_merge_is_shallow() {
    let mut data = NodeData::Action(ActionConfig {
      action_type: "send_email".to_string(),
      label: Some("Welcome".to_string()),
      config: serde_json::from_value(json!({ "template": "a", "delay": 5 })).unwrap(),
      ..Default::default()
    });

    data.merge(&json!({ "config": { "template": "b" } })).unwrap();

    match &data {
      NodeData::Action(c) => {
        assert_eq!(c.action_type, "send_email");
        assert_eq!(c.label.as_deref(), Some("Welcome"));
        assert_eq!(c.config.get("template"), Some(&json!("b")));
        assert!(c.config.get("delay").is_none());
      }
      other => panic!("expected action data, got {:?}", other),
    }
  }

  #[test]
  fn test_unmodelled_data_keys_survive() {
    let raw = json!({
      "id": "a1",
      "type": "action",
      "position": { "x": 10.0, "y": 20.0 },
      "data": { "action_type": "send_email", "subject": "Hi", "template_id": "t9" }
    });
    let node: Node = serde_json::from_value(raw.clone()).unwrap();

    match &node.data {
      NodeData::Action(c) => assert_eq!(c.extra.get("template_id"), Some(&json!("t9"))),
      other => panic!("expected action data, got {:?}", other),
    }
    assert_eq!(serde_json::to_value(&node).unwrap(), raw);
  }

  #[test]
  fn test_merge_keeps_unmodelled_keys() {
    let mut data = NodeData::defaults(NodeKind::Join, None);
    data.merge(&json!({ "note": "wait for both" })).unwrap();
    data.merge(&json!({ "join_type": "any" })).unwrap();

    let value = data.to_value().unwrap();
    assert_eq!(value["note"], "wait for both");
    assert_eq!(value["join_type"], "any");
  }

  #[test]
  fn test_fractional_counts_are_rounded() {
    let data = NodeData::from_value(
      NodeKind::Wait,
      json!({ "wait_type": "duration", "duration_value": 1.5, "timeout_value": 2.0 }),
    )
    .unwrap();
    match data {
      NodeData::Wait(c) => {
        assert_eq!(c.duration_value, Some(2));
        assert_eq!(c.timeout_value, Some(2));
      }
      other => panic!("expected wait data, got {:?}", other),
    }

    match NodeData::from_value(NodeKind::Join, json!({ "join_type": "count", "expected_count": 2.2 }))
      .unwrap()
    {
      NodeData::Join(c) => assert_eq!(c.expected_count, Some(2)),
      other => panic!("expected join data, got {:?}", other),
    }
  }

  #[test]
  fn test_merge_rejects_invalid_patch() {
    let mut data = NodeData::defaults(NodeKind::Join, None);
    let before = data.clone();

    assert!(matches!(
      data.merge(&json!(["not", "an", "object"])),
      Err(DataError::PatchNotObject)
    ));
    assert!(matches!(
      data.merge(&json!({ "join_type": "most" })),
      Err(DataError::InvalidData {
        kind: NodeKind::Join,
        ..
      })
    ));
    assert_eq!(data, before);
  }

  #[test]
  fn test_branch_handle_resolution() {
    let config = BranchConfig {
      branches: vec![
        BranchDescriptor::new("vip", "VIP"),
        BranchDescriptor::new("regular", "Regular"),
      ],
      ..Default::default()
    };

    assert_eq!(config.resolve_handle("vip"), Some("vip"));
    assert_eq!(config.resolve_handle("1"), Some("regular"));
    assert_eq!(config.resolve_handle("branch-0"), Some("vip"));
    assert_eq!(config.resolve_handle("branch-7"), None);
    assert_eq!(config.resolve_handle("other"), None);
  }

  #[test]
  fn test_display_label_falls_back_to_title() {
    let node = Node::new("g", Position::default(), NodeData::defaults(NodeKind::Agent, None));
    assert_eq!(node.display_label(), "AI Agent");
  }
}
