//! Structural and configuration checks for the editor.
//!
//! [`validate`] is recomputed after every change to the graph. Errors block
//! publishing; warnings are advisory.

use std::collections::HashSet;

use flowcanvas_config::{
  BranchConfig, CONDITION_FALSE_HANDLE, CONDITION_TRUE_HANDLE, ConditionConfig, Edge, JoinConfig,
  JoinType, Node, NodeData, WaitConfig, WaitType,
};
use serde::{Deserialize, Serialize};

use crate::graph::Graph;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
  Error,
  Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationIssue {
  pub node_id: String,
  pub severity: Severity,
  pub message: String,
}

/// Issues found in a graph, split by severity.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
  pub errors: Vec<ValidationIssue>,
  pub warnings: Vec<ValidationIssue>,
}

impl ValidationReport {
  pub fn has_errors(&self) -> bool {
    !self.errors.is_empty()
  }

  pub fn is_empty(&self) -> bool {
    self.errors.is_empty() && self.warnings.is_empty()
  }

  /// All issues attached to a node, errors first.
  pub fn node_issues(&self, node_id: &str) -> Vec<&ValidationIssue> {
    self
      .errors
      .iter()
      .chain(self.warnings.iter())
      .filter(|issue| issue.node_id == node_id)
      .collect()
  }

  /// Errors attached to a node.
  pub fn node_errors(&self, node_id: &str) -> Vec<&ValidationIssue> {
    self
      .errors
      .iter()
      .filter(|issue| issue.node_id == node_id)
      .collect()
  }
}

/// Validate a graph.
///
/// Issues are reported in node order, and for each node in a fixed check
/// order, so the same graph always yields the same report.
pub fn validate(nodes: &[Node], edges: &[Edge]) -> ValidationReport {
  let graph = Graph::new(nodes, edges);
  let reachable = graph.reachable_from_triggers();
  let entry = graph.entry_trigger();

  let mut issues = Issues::default();
  for node in nodes {
    let mut scope = issues.scope(&node.id);

    if let NodeData::Trigger(_) = node.data
      && entry != Some(node.id.as_str())
    {
      scope.warning("Additional trigger: only the first trigger starts test runs");
    }

    check_configuration(node, &mut scope);

    match &node.data {
      NodeData::Condition(config) => check_condition(node, config, &graph, &mut scope),
      NodeData::Branch(config) => check_branch(node, config, &graph, &mut scope),
      NodeData::Join(config) => check_join(node, config, &graph, &mut scope),
      _ => {}
    }

    check_dangling(node, &graph, &mut scope);
    check_reachable(node, &reachable, &mut scope);
  }

  issues.into_report()
}

fn check_configuration(node: &Node, scope: &mut Scope<'_>) {
  match &node.data {
    NodeData::Trigger(c) if !c.is_configured() => scope.error("Trigger type is not configured"),
    NodeData::Action(c) if !c.is_configured() => scope.error("Action type is not configured"),
    NodeData::Agent(c) if !c.is_configured() => scope.error("Agent is not selected"),
    NodeData::Wait(c) => check_wait(c, scope),
    _ => {}
  }
}

fn check_wait(config: &WaitConfig, scope: &mut Scope<'_>) {
  match config.wait_type {
    WaitType::Duration => {
      if config.duration_value.unwrap_or(0) < 1 {
        scope.error("Wait duration must be at least 1");
      }
    }
    WaitType::Datetime => {
      if is_blank(config.datetime.as_deref()) {
        scope.error("Wait date and time is not set");
      }
    }
    WaitType::Event => {
      if is_blank(config.event_type.as_deref()) {
        scope.error("Wait event is not set");
      }
    }
  }
}

fn check_condition(node: &Node, config: &ConditionConfig, graph: &Graph<'_>, scope: &mut Scope<'_>) {
  if config.rules.is_empty() {
    scope.warning("Condition has no rules");
  }

  for handle in [CONDITION_TRUE_HANDLE, CONDITION_FALSE_HANDLE] {
    let connected = graph
      .outgoing(&node.id)
      .iter()
      .any(|e| e.source_handle.as_deref() == Some(handle));
    if !connected {
      scope.error(format!("Missing '{}' path", handle));
    }
  }
}

fn check_branch(node: &Node, config: &BranchConfig, graph: &Graph<'_>, scope: &mut Scope<'_>) {
  if config.branches.is_empty() {
    scope.error("Branch has no paths defined");
    return;
  }

  let connected: HashSet<&str> = graph
    .outgoing(&node.id)
    .iter()
    .filter_map(|e| e.source_handle.as_deref())
    .filter_map(|handle| config.resolve_handle(handle))
    .collect();

  for branch in &config.branches {
    if !connected.contains(branch.id.as_str()) {
      scope.error(format!(
        "Branch '{}' has no outgoing connection",
        branch.label
      ));
    }
  }
}

fn check_join(node: &Node, config: &JoinConfig, graph: &Graph<'_>, scope: &mut Scope<'_>) {
  let incoming = graph.incoming(&node.id).len();

  if config.join_type == JoinType::Count {
    match config.expected_count {
      None | Some(0) => scope.error("Join count must be at least 1"),
      Some(expected) if expected as usize > incoming => scope.error(format!(
        "Join expects {} incoming paths but only {} connected",
        expected, incoming
      )),
      Some(_) => {}
    }
  }

  if incoming < 2 {
    scope.warning("Join has fewer than two incoming connections");
  }
}

fn check_dangling(node: &Node, graph: &Graph<'_>, scope: &mut Scope<'_>) {
  for edge in graph.dangling_edges() {
    if edge.source == node.id && !graph.contains(&edge.target) {
      scope.error(format!("Connection references missing node '{}'", edge.target));
    } else if edge.target == node.id && !graph.contains(&edge.source) {
      scope.error(format!("Connection references missing node '{}'", edge.source));
    }
  }
}

fn check_reachable(node: &Node, reachable: &HashSet<&str>, scope: &mut Scope<'_>) {
  if !matches!(node.data, NodeData::Trigger(_)) && !reachable.contains(node.id.as_str()) {
    scope.warning("Node is not reachable from a trigger");
  }
}

fn is_blank(value: Option<&str>) -> bool {
  value.is_none_or(|v| v.trim().is_empty())
}

/// Accumulates issues in emission order.
#[derive(Default)]
struct Issues {
  items: Vec<ValidationIssue>,
}

impl Issues {
  fn scope<'a>(&'a mut self, node_id: &'a str) -> Scope<'a> {
    Scope {
      issues: self,
      node_id,
    }
  }

  fn into_report(self) -> ValidationReport {
    let (errors, warnings) = self
      .items
      .into_iter()
      .partition(|issue| issue.severity == Severity::Error);
    ValidationReport { errors, warnings }
  }
}

/// Issues for a single node.
struct Scope<'a> {
  issues: &'a mut Issues,
  node_id: &'a str,
}

impl Scope<'_> {
  fn error(&mut self, message: impl Into<String>) {
    self.push(Severity::Error, message.into());
  }

  fn warning(&mut self, message: impl Into<String>) {
    self.push(Severity::Warning, message.into());
  }

  fn push(&mut self, severity: Severity, message: String) {
    self.issues.items.push(ValidationIssue {
      node_id: self.node_id.to_string(),
      severity,
      message,
    });
  }
}
