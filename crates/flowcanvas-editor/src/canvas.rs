//! Editable workflow graph.
//!
//! [`Canvas`] owns the working copy of a workflow: nodes, edges, viewport,
//! selection and open panels. Every graph mutation goes through it and marks
//! the canvas dirty. Validation, overlays and the render model are derived
//! on demand from the current state.

use flowcanvas_config::{
  DataError, DocumentDraft, Edge, EdgeId, Node, NodeData, NodeId, NodeKind, Position,
  TestExecution, Viewport, WorkflowDocument,
};
use flowcanvas_workflow::{
  ExecutionStatus, Graph, Overlay, ValidationIssue, ValidationReport, map_overlay, validate,
};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::EditorConfig;
use crate::drop::PalettePayload;
use crate::keymap::{Command, FocusTarget, ShortcutContext};
use crate::viewport::{self, Rect, ScreenPoint};

/// A requested edge, as produced by dragging from one handle to another.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connection {
  pub source: NodeId,
  pub target: NodeId,
  pub source_handle: Option<String>,
  pub target_handle: Option<String>,
}

impl Connection {
  pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
      ..Default::default()
    }
  }

  pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
    self.source_handle = Some(handle.into());
    self
  }
}

/// Why a connection was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConnectError {
  #[error("node not found: {0}")]
  UnknownNode(NodeId),

  #[error("node {0} cannot connect to itself")]
  SelfLoop(NodeId),

  #[error("connection from {from} to {to} already exists")]
  Duplicate { from: NodeId, to: NodeId },

  #[error("connecting {from} to {to} would create a cycle")]
  Cycle { from: NodeId, to: NodeId },
}

#[derive(Debug, thiserror::Error)]
pub enum CanvasError {
  #[error("node not found: {0}")]
  NodeNotFound(NodeId),

  #[error("edge not found: {0}")]
  EdgeNotFound(EdgeId),

  #[error(transparent)]
  Data(#[from] DataError),
}

/// Side panels, stacked in the order they were opened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "panel", content = "node_id", rename_all = "snake_case")]
pub enum Panel {
  /// Configuration of a single node.
  NodeSettings(NodeId),
  TestResults,
  VersionHistory,
}

/// A node as it should be drawn.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeView {
  pub id: NodeId,
  pub kind: NodeKind,
  pub label: String,
  pub position: Position,
  pub data: NodeData,
  pub selected: bool,
  pub issues: Vec<ValidationIssue>,
  pub has_error: bool,
  pub status: ExecutionStatus,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub duration_ms: Option<u64>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeView {
  pub id: EdgeId,
  pub source: NodeId,
  pub target: NodeId,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub source_handle: Option<String>,
  pub status: ExecutionStatus,
  pub taken: bool,
}

/// Render model: graph data merged with validation and execution state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanvasView {
  pub nodes: Vec<NodeView>,
  pub edges: Vec<EdgeView>,
  pub viewport: Viewport,
}

pub struct Canvas {
  nodes: Vec<Node>,
  edges: Vec<Edge>,
  viewport: Viewport,
  bounds: Rect,
  selected: Option<NodeId>,
  panels: Vec<Panel>,
  has_changes: bool,
  config: EditorConfig,
}

impl Canvas {
  pub fn new(config: EditorConfig) -> Self {
    Self {
      nodes: Vec::new(),
      edges: Vec::new(),
      viewport: Viewport::default(),
      bounds: Rect::default(),
      selected: None,
      panels: Vec::new(),
      has_changes: false,
      config,
    }
  }

  pub fn from_document(document: WorkflowDocument, config: EditorConfig) -> Self {
    let mut canvas = Self::new(config);
    canvas.load_document(document);
    canvas
  }

  /// Replace the whole graph, e.g. after a fetch, import or restore.
  ///
  /// Selection and panels are reset and the canvas is marked clean.
  pub fn load_document(&mut self, document: WorkflowDocument) {
    self.nodes = document.nodes;
    self.edges = document.edges;
    self.viewport = document.viewport;
    self.selected = None;
    self.panels.clear();
    self.has_changes = false;
  }

  pub fn nodes(&self) -> &[Node] {
    &self.nodes
  }

  pub fn edges(&self) -> &[Edge] {
    &self.edges
  }

  pub fn node(&self, node_id: &str) -> Option<&Node> {
    self.nodes.iter().find(|n| n.id == node_id)
  }

  pub fn viewport(&self) -> Viewport {
    self.viewport
  }

  pub fn config(&self) -> &EditorConfig {
    &self.config
  }

  pub fn has_changes(&self) -> bool {
    self.has_changes
  }

  pub fn mark_clean(&mut self) {
    self.has_changes = false;
  }

  /// The save payload for the current graph.
  pub fn draft(&self) -> DocumentDraft {
    DocumentDraft {
      nodes: self.nodes.clone(),
      edges: self.edges.clone(),
      viewport: self.viewport,
    }
  }

  // --- Nodes ---

  /// Add a node with default data for its kind.
  ///
  /// Without a position the node is stacked below the existing nodes.
  pub fn add_node(
    &mut self,
    kind: NodeKind,
    subtype: Option<&str>,
    position: Option<Position>,
  ) -> NodeId {
    let position = position.unwrap_or_else(|| self.next_stack_position());
    let node = Node::new(
      Uuid::new_v4().to_string(),
      position,
      NodeData::defaults(kind, subtype),
    );
    let id = node.id.clone();
    debug!(node_id = %id, kind = %kind, "node added");

    self.nodes.push(node);
    self.has_changes = true;
    id
  }

  fn next_stack_position(&self) -> Position {
    let layout = &self.config.layout;
    Position::new(
      layout.stack_origin.x,
      layout.stack_origin.y + self.nodes.len() as f64 * layout.stack_spacing,
    )
  }

  /// Handle a palette item dropped at `point` (screen coordinates).
  ///
  /// Malformed payloads are logged and ignored.
  pub fn drop_payload(&mut self, raw: &str, point: ScreenPoint) -> Option<NodeId> {
    let payload = match PalettePayload::parse(raw) {
      Ok(payload) => payload,
      Err(e) => {
        warn!(error = %e, payload = raw, "ignoring malformed drop payload");
        return None;
      }
    };
    let position = self.screen_to_graph(point);
    Some(self.add_node(payload.kind, payload.subtype.as_deref(), Some(position)))
  }

  /// Shallow-merge `patch` into a node's data.
  pub fn update_node_data(
    &mut self,
    node_id: &str,
    patch: &serde_json::Value,
  ) -> Result<(), CanvasError> {
    let node = self.node_mut(node_id)?;
    node.data.merge(patch)?;
    self.has_changes = true;
    Ok(())
  }

  pub fn move_node(&mut self, node_id: &str, position: Position) -> Result<(), CanvasError> {
    self.node_mut(node_id)?.position = position;
    self.has_changes = true;
    Ok(())
  }

  /// Remove a node together with every edge that references it.
  pub fn delete_node(&mut self, node_id: &str) -> Result<Node, CanvasError> {
    let index = self
      .nodes
      .iter()
      .position(|n| n.id == node_id)
      .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))?;
    let node = self.nodes.remove(index);

    let before = self.edges.len();
    self.edges.retain(|e| !e.touches(node_id));
    debug!(node_id, removed_edges = before - self.edges.len(), "node deleted");

    if self.selected.as_deref() == Some(node_id) {
      self.selected = None;
    }
    self
      .panels
      .retain(|p| !matches!(p, Panel::NodeSettings(id) if id == node_id));
    self.has_changes = true;
    Ok(node)
  }

  fn node_mut(&mut self, node_id: &str) -> Result<&mut Node, CanvasError> {
    self
      .nodes
      .iter_mut()
      .find(|n| n.id == node_id)
      .ok_or_else(|| CanvasError::NodeNotFound(node_id.to_string()))
  }

  // --- Edges ---

  /// Create an edge for `connection`.
  pub fn connect(&mut self, connection: Connection) -> Result<EdgeId, ConnectError> {
    for id in [&connection.source, &connection.target] {
      if self.node(id).is_none() {
        return Err(ConnectError::UnknownNode(id.clone()));
      }
    }
    if connection.source == connection.target {
      return Err(ConnectError::SelfLoop(connection.source));
    }

    let duplicate = self.edges.iter().any(|e| {
      e.source == connection.source
        && e.target == connection.target
        && e.source_handle == connection.source_handle
        && e.target_handle == connection.target_handle
    });
    if duplicate {
      return Err(ConnectError::Duplicate {
        from: connection.source,
        to: connection.target,
      });
    }

    if !self.config.connect.allow_cycles
      && Graph::new(&self.nodes, &self.edges).reaches(&connection.target, &connection.source)
    {
      return Err(ConnectError::Cycle {
        from: connection.source,
        to: connection.target,
      });
    }

    let edge = Edge {
      id: Uuid::new_v4().to_string(),
      source: connection.source,
      target: connection.target,
      source_handle: connection.source_handle,
      target_handle: connection.target_handle,
    };
    let id = edge.id.clone();
    debug!(edge_id = %id, source = %edge.source, target = %edge.target, "edge added");

    self.edges.push(edge);
    self.has_changes = true;
    Ok(id)
  }

  pub fn disconnect(&mut self, edge_id: &str) -> Result<Edge, CanvasError> {
    let index = self
      .edges
      .iter()
      .position(|e| e.id == edge_id)
      .ok_or_else(|| CanvasError::EdgeNotFound(edge_id.to_string()))?;
    self.has_changes = true;
    Ok(self.edges.remove(index))
  }

  // --- Selection and panels ---

  pub fn selected(&self) -> Option<&str> {
    self.selected.as_deref()
  }

  pub fn select(&mut self, node_id: &str) -> Result<(), CanvasError> {
    if self.node(node_id).is_none() {
      return Err(CanvasError::NodeNotFound(node_id.to_string()));
    }
    self.selected = Some(node_id.to_string());
    Ok(())
  }

  pub fn clear_selection(&mut self) {
    self.selected = None;
  }

  pub fn panels(&self) -> &[Panel] {
    &self.panels
  }

  /// Open a panel on top of the stack. An already open panel moves to the top.
  pub fn open_panel(&mut self, panel: Panel) {
    self.panels.retain(|p| *p != panel);
    self.panels.push(panel);
  }

  pub fn close_top_panel(&mut self) -> Option<Panel> {
    self.panels.pop()
  }

  // --- Viewport ---

  pub fn bounds(&self) -> Rect {
    self.bounds
  }

  /// Set where the canvas is drawn on screen.
  pub fn set_bounds(&mut self, bounds: Rect) {
    self.bounds = bounds;
  }

  pub fn set_viewport(&mut self, viewport: Viewport) {
    self.viewport = viewport;
  }

  pub fn screen_to_graph(&self, point: ScreenPoint) -> Position {
    viewport::screen_to_graph(point, &self.bounds, &self.viewport)
  }

  /// Zoom and pan so that every node is visible. Returns false for an empty graph.
  pub fn fit_view(&mut self) -> bool {
    let fitted = viewport::fit_view(
      self.nodes.iter().map(|n| n.position),
      &self.bounds,
      &self.config.layout,
      &self.config.fit_view,
    );
    match fitted {
      Some(viewport) => {
        self.viewport = viewport;
        true
      }
      None => false,
    }
  }

  // --- Derived state ---

  pub fn validation(&self) -> ValidationReport {
    validate(&self.nodes, &self.edges)
  }

  pub fn overlay(&self, execution: Option<&TestExecution>, test_running: bool) -> Overlay {
    map_overlay(&self.nodes, &self.edges, execution, test_running)
  }

  /// Merge node data, validation issues and execution status for drawing.
  pub fn view(&self, execution: Option<&TestExecution>, test_running: bool) -> CanvasView {
    let report = self.validation();
    let overlay = self.overlay(execution, test_running);

    let nodes = self
      .nodes
      .iter()
      .map(|node| {
        let issues: Vec<ValidationIssue> =
          report.node_issues(&node.id).into_iter().cloned().collect();
        let run = overlay.node(&node.id);
        NodeView {
          id: node.id.clone(),
          kind: node.kind(),
          label: node.display_label(),
          position: node.position,
          data: node.data.clone(),
          selected: self.selected.as_deref() == Some(node.id.as_str()),
          has_error: !report.node_errors(&node.id).is_empty(),
          issues,
          status: run.map(|r| r.status).unwrap_or_default(),
          duration_ms: run.and_then(|r| r.duration_ms),
          error: run.and_then(|r| r.error.clone()),
        }
      })
      .collect();

    let edges = self
      .edges
      .iter()
      .map(|edge| {
        let run = overlay.edge(&edge.id);
        EdgeView {
          id: edge.id.clone(),
          source: edge.source.clone(),
          target: edge.target.clone(),
          source_handle: edge.source_handle.clone(),
          status: run.map(|r| r.status).unwrap_or_default(),
          taken: run.is_some_and(|r| r.taken),
        }
      })
      .collect();

    CanvasView {
      nodes,
      edges,
      viewport: self.viewport,
    }
  }

  // --- Shortcuts ---

  /// The shortcut context for the canvas state. Save and test flags are
  /// owned by the session and left unset.
  pub fn shortcut_context(&self, focus: FocusTarget) -> ShortcutContext {
    ShortcutContext {
      focus,
      has_selection: self.selected.is_some(),
      has_open_panel: !self.panels.is_empty(),
      has_changes: self.has_changes,
      ..Default::default()
    }
  }

  /// Perform a command that only affects the canvas.
  ///
  /// Returns false for commands that need the backend (save, test) and for
  /// commands with nothing to act on.
  pub fn apply_command(&mut self, command: Command) -> bool {
    match command {
      Command::DeleteSelection => match self.selected.clone() {
        Some(node_id) => self.delete_node(&node_id).is_ok(),
        None => false,
      },
      Command::ClosePanel => self.close_top_panel().is_some(),
      Command::ClearSelection => self.selected.take().is_some(),
      Command::FitView => self.fit_view(),
      Command::Save | Command::Test => false,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::ConnectPolicy;
  use flowcanvas_config::{NodeResult, NodeResultStatus, WaitType};
  use serde_json::json;

  fn canvas() -> Canvas {
    Canvas::new(EditorConfig::default())
  }

  /// trigger -> action -> condition
  fn chain(canvas: &mut Canvas) -> (NodeId, NodeId, NodeId) {
    let t = canvas.add_node(NodeKind::Trigger, Some("record_created"), None);
    let a = canvas.add_node(NodeKind::Action, Some("send_email"), None);
    let c = canvas.add_node(NodeKind::Condition, None, None);
    canvas.connect(Connection::new(&t, &a)).unwrap();
    canvas.connect(Connection::new(&a, &c)).unwrap();
    (t, a, c)
  }

  #[test]
  fn test_add_node_defaults_and_stack() {
    let mut canvas = canvas();
    let first = canvas.add_node(NodeKind::Wait, None, None);
    let second = canvas.add_node(NodeKind::Action, Some("send_sms"), None);

    assert!(canvas.has_changes());
    assert!(!first.is_empty());
    assert_ne!(first, second);

    let wait = canvas.node(&first).unwrap();
    assert_eq!(wait.position, Position::new(250.0, 100.0));
    match &wait.data {
      NodeData::Wait(w) => {
        assert_eq!(w.wait_type, WaitType::Duration);
        assert_eq!(w.duration_value, Some(1));
      }
      other => panic!("unexpected data {:?}", other),
    }

    let action = canvas.node(&second).unwrap();
    assert_eq!(action.position, Position::new(250.0, 250.0));
    assert!(matches!(&action.data, NodeData::Action(a) if a.action_type == "send_sms"));
  }

  #[test]
  fn test_add_node_explicit_position() {
    let mut canvas = canvas();
    let id = canvas.add_node(NodeKind::Join, None, Some(Position::new(-5.0, 7.5)));
    assert_eq!(canvas.node(&id).unwrap().position, Position::new(-5.0, 7.5));
  }

  #[test]
  fn test_drop_payload_translates_coordinates() {
    let mut canvas = canvas();
    canvas.set_bounds(Rect::new(200.0, 60.0, 1000.0, 700.0));
    canvas.set_viewport(Viewport {
      x: 100.0,
      y: 40.0,
      zoom: 0.5,
    });

    let id = canvas
      .drop_payload(
        r#"{"type":"agent","subtype":"agent_42"}"#,
        ScreenPoint::new(400.0, 200.0),
      )
      .unwrap();
    let node = canvas.node(&id).unwrap();
    assert_eq!(node.position, Position::new(200.0, 200.0));
    assert!(matches!(&node.data, NodeData::Agent(a) if a.agent_id == "agent_42"));
  }

  #[test]
  fn test_malformed_drop_is_ignored() {
    let mut canvas = canvas();
    assert!(canvas.drop_payload("not json", ScreenPoint::default()).is_none());
    assert!(canvas.drop_payload(r#"{"type":"portal"}"#, ScreenPoint::default()).is_none());
    assert!(canvas.nodes().is_empty());
    assert!(!canvas.has_changes());
  }

  #[test]
  fn test_update_node_data() {
    let mut canvas = canvas();
    let id = canvas.add_node(NodeKind::Action, None, None);
    canvas.mark_clean();

    canvas
      .update_node_data(&id, &json!({ "action_type": "create_task", "label": "Follow up" }))
      .unwrap();
    assert!(canvas.has_changes());
    let node = canvas.node(&id).unwrap();
    assert_eq!(node.display_label(), "Follow up");
    assert!(matches!(&node.data, NodeData::Action(a) if a.action_type == "create_task"));
  }

  #[test]
  fn test_update_node_data_keeps_unknown_keys() {
    let mut canvas = canvas();
    let id = canvas.add_node(NodeKind::Action, Some("send_email"), None);

    canvas.update_node_data(&id, &json!({ "subject": "Hi" })).unwrap();
    canvas
      .update_node_data(&id, &json!({ "label": "Welcome" }))
      .unwrap();

    let data = canvas.node(&id).unwrap().data.to_value().unwrap();
    assert_eq!(data["subject"], "Hi");
    assert_eq!(data["label"], "Welcome");
    assert_eq!(data["action_type"], "send_email");
  }

  #[test]
  fn test_update_node_data_rejects_bad_patch() {
    let mut canvas = canvas();
    let id = canvas.add_node(NodeKind::Join, None, None);
    let before = canvas.node(&id).unwrap().data.clone();

    let err = canvas
      .update_node_data(&id, &json!({ "join_type": "most" }))
      .unwrap_err();
    assert!(matches!(err, CanvasError::Data(_)));
    assert_eq!(canvas.node(&id).unwrap().data, before);

    assert!(matches!(
      canvas.update_node_data("missing", &json!({})),
      Err(CanvasError::NodeNotFound(_))
    ));
  }

  #[test]
  fn test_move_node() {
    let mut canvas = canvas();
    let id = canvas.add_node(NodeKind::Branch, None, None);
    canvas.mark_clean();

    canvas.move_node(&id, Position::new(10.0, 20.0)).unwrap();
    assert_eq!(canvas.node(&id).unwrap().position, Position::new(10.0, 20.0));
    assert!(canvas.has_changes());
    assert!(canvas.move_node("ghost", Position::default()).is_err());
  }

  #[test]
  fn test_delete_node_cascades() {
    let mut canvas = canvas();
    let (t, a, c) = chain(&mut canvas);
    canvas.select(&a).unwrap();
    canvas.open_panel(Panel::NodeSettings(a.clone()));
    canvas.open_panel(Panel::TestResults);

    canvas.delete_node(&a).unwrap();
    assert!(canvas.edges().iter().all(|e| !e.touches(&a)));
    assert!(canvas.edges().is_empty());
    assert_eq!(canvas.selected(), None);
    assert_eq!(canvas.panels(), &[Panel::TestResults]);
    assert!(canvas.node(&t).is_some());
    assert!(canvas.node(&c).is_some());
  }

  #[test]
  fn test_delete_unknown_node() {
    let mut canvas = canvas();
    assert!(matches!(
      canvas.delete_node("ghost"),
      Err(CanvasError::NodeNotFound(id)) if id == "ghost"
    ));
  }

  #[test]
  fn test_connect_rejections() {
    let mut canvas = canvas();
    let (t, a, _) = chain(&mut canvas);

    assert_eq!(
      canvas.connect(Connection::new(&t, "ghost")),
      Err(ConnectError::UnknownNode("ghost".to_string()))
    );
    assert_eq!(
      canvas.connect(Connection::new(&a, &a)),
      Err(ConnectError::SelfLoop(a.clone()))
    );
    assert!(matches!(
      canvas.connect(Connection::new(&t, &a)),
      Err(ConnectError::Duplicate { .. })
    ));
    assert_eq!(canvas.edges().len(), 2);
  }

  #[test]
  fn test_connect_handles_are_distinct() {
    let mut canvas = canvas();
    let (_, _, c) = chain(&mut canvas);
    let next = canvas.add_node(NodeKind::Action, Some("send_sms"), None);

    canvas
      .connect(Connection::new(&c, &next).with_source_handle("true"))
      .unwrap();
    canvas
      .connect(Connection::new(&c, &next).with_source_handle("false"))
      .unwrap();
    assert!(matches!(
      canvas.connect(Connection::new(&c, &next).with_source_handle("true")),
      Err(ConnectError::Duplicate { .. })
    ));
  }

  #[test]
  fn test_cycle_policy() {
    let mut canvas = canvas();
    let (t, _, c) = chain(&mut canvas);
    assert!(canvas.connect(Connection::new(&c, &t)).is_ok());

    let mut strict = Canvas::new(EditorConfig {
      connect: ConnectPolicy {
        allow_cycles: false,
      },
      ..Default::default()
    });
    let (t, _, c) = chain(&mut strict);
    assert!(matches!(
      strict.connect(Connection::new(&c, &t)),
      Err(ConnectError::Cycle { .. })
    ));
  }

  #[test]
  fn test_disconnect() {
    let mut canvas = canvas();
    let (t, a, _) = chain(&mut canvas);
    canvas.mark_clean();

    let edge_id = canvas
      .edges()
      .iter()
      .find(|e| e.source == t && e.target == a)
      .map(|e| e.id.clone())
      .unwrap();
    canvas.disconnect(&edge_id).unwrap();
    assert_eq!(canvas.edges().len(), 1);
    assert!(canvas.has_changes());
    assert!(matches!(
      canvas.disconnect(&edge_id),
      Err(CanvasError::EdgeNotFound(_))
    ));
  }

  #[test]
  fn test_panels_stack() {
    let mut canvas = canvas();
    canvas.open_panel(Panel::VersionHistory);
    canvas.open_panel(Panel::TestResults);
    canvas.open_panel(Panel::VersionHistory);

    assert_eq!(canvas.panels(), &[Panel::TestResults, Panel::VersionHistory]);
    assert_eq!(canvas.close_top_panel(), Some(Panel::VersionHistory));
    assert_eq!(canvas.close_top_panel(), Some(Panel::TestResults));
    assert_eq!(canvas.close_top_panel(), None);
  }

  #[test]
  fn test_load_document_resets_state() {
    let mut canvas = canvas();
    let (t, _, _) = chain(&mut canvas);
    canvas.select(&t).unwrap();
    canvas.open_panel(Panel::TestResults);

    canvas.load_document(WorkflowDocument {
      version: 4,
      ..Default::default()
    });
    assert!(canvas.nodes().is_empty());
    assert!(canvas.edges().is_empty());
    assert_eq!(canvas.selected(), None);
    assert!(canvas.panels().is_empty());
    assert!(!canvas.has_changes());
  }

  #[test]
  fn test_validation_tracks_mutations() {
    let mut canvas = canvas();
    let (_, _, c) = chain(&mut canvas);
    assert!(canvas.validation().has_errors());

    for handle in ["true", "false"] {
      let next = canvas.add_node(NodeKind::Action, Some("send_email"), None);
      canvas
        .connect(Connection::new(&c, &next).with_source_handle(handle))
        .unwrap();
    }
    let report = canvas.validation();
    assert!(!report.has_errors(), "{:?}", report);
  }

  #[test]
  fn test_view_merges_state() {
    let mut canvas = canvas();
    let (t, a, c) = chain(&mut canvas);
    canvas.select(&a).unwrap();

    let mut result = NodeResult::new(&t, NodeResultStatus::Success);
    result.duration_ms = Some(4);
    let exec = TestExecution {
      node_results: vec![result],
      ..Default::default()
    };

    let view = canvas.view(Some(&exec), false);
    assert_eq!(view.nodes.len(), 3);

    let trigger = &view.nodes[0];
    assert_eq!(trigger.status, ExecutionStatus::Success);
    assert_eq!(trigger.duration_ms, Some(4));
    assert!(!trigger.selected);

    let action = &view.nodes[1];
    assert!(action.selected);
    assert_eq!(action.status, ExecutionStatus::Idle);

    let condition = view.nodes.iter().find(|n| n.id == c).unwrap();
    assert!(condition.has_error);
    assert!(!condition.issues.is_empty());

    let first_edge = &view.edges[0];
    assert_eq!(first_edge.status, ExecutionStatus::Success);
    assert!(first_edge.taken);
  }

  #[test]
  fn test_view_running_highlights_entry_trigger() {
    let mut canvas = canvas();
    let (t, _, _) = chain(&mut canvas);
    let view = canvas.view(None, true);
    let trigger = view.nodes.iter().find(|n| n.id == t).unwrap();
    assert_eq!(trigger.status, ExecutionStatus::Running);
  }

  #[test]
  fn test_apply_command() {
    let mut canvas = canvas();
    let (_, a, _) = chain(&mut canvas);

    assert!(!canvas.apply_command(Command::DeleteSelection));
    canvas.select(&a).unwrap();
    assert!(canvas.apply_command(Command::DeleteSelection));
    assert!(canvas.node(&a).is_none());

    canvas.open_panel(Panel::TestResults);
    assert!(canvas.apply_command(Command::ClosePanel));
    assert!(canvas.panels().is_empty());

    assert!(canvas.apply_command(Command::FitView));
    assert!(!canvas.apply_command(Command::Save));
    assert!(!canvas.apply_command(Command::Test));
  }

  #[test]
  fn test_fit_view_empty_graph() {
    let mut canvas = canvas();
    let before = canvas.viewport();
    assert!(!canvas.fit_view());
    assert_eq!(canvas.viewport(), before);
  }

  #[test]
  fn test_shortcut_context() {
    let mut canvas = canvas();
    let id = canvas.add_node(NodeKind::Trigger, None, None);
    canvas.select(&id).unwrap();

    let ctx = canvas.shortcut_context(FocusTarget::TextInput);
    assert_eq!(ctx.focus, FocusTarget::TextInput);
    assert!(ctx.has_selection);
    assert!(ctx.has_changes);
    assert!(!ctx.has_open_panel);
  }
}
