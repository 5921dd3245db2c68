use std::collections::{HashMap, HashSet, VecDeque};

use flowcanvas_config::{Edge, Node, NodeKind};

/// Graph structure for traversal and analysis.
///
/// Borrows the node and edge slices it was built from. Edges whose source or
/// target is not a known node are kept out of the adjacency lists and
/// reported by [`Graph::dangling_edges`].
#[derive(Debug, Clone)]
pub struct Graph<'a> {
  nodes: HashMap<&'a str, &'a Node>,
  /// Outgoing edges per node, in edge order.
  outgoing: HashMap<&'a str, Vec<&'a Edge>>,
  /// Incoming edges per node, in edge order.
  incoming: HashMap<&'a str, Vec<&'a Edge>>,
  /// Trigger nodes in insertion order.
  triggers: Vec<&'a str>,
  dangling: Vec<&'a Edge>,
}

impl<'a> Graph<'a> {
  /// Build a graph from nodes and edges.
  pub fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
    let mut by_id: HashMap<&str, &Node> = HashMap::with_capacity(nodes.len());
    let mut outgoing: HashMap<&str, Vec<&Edge>> = HashMap::new();
    let mut incoming: HashMap<&str, Vec<&Edge>> = HashMap::new();

    // Initialize all nodes
    for node in nodes {
      by_id.insert(node.id.as_str(), node);
      outgoing.entry(node.id.as_str()).or_default();
      incoming.entry(node.id.as_str()).or_default();
    }

    let mut dangling = Vec::new();
    for edge in edges {
      if !by_id.contains_key(edge.source.as_str()) || !by_id.contains_key(edge.target.as_str()) {
        dangling.push(edge);
        continue;
      }
      outgoing.entry(edge.source.as_str()).or_default().push(edge);
      incoming.entry(edge.target.as_str()).or_default().push(edge);
    }

    let triggers = nodes
      .iter()
      .filter(|n| n.kind() == NodeKind::Trigger)
      .map(|n| n.id.as_str())
      .collect();

    Self {
      nodes: by_id,
      outgoing,
      incoming,
      triggers,
      dangling,
    }
  }

  pub fn node(&self, node_id: &str) -> Option<&'a Node> {
    self.nodes.get(node_id).copied()
  }

  pub fn contains(&self, node_id: &str) -> bool {
    self.nodes.contains_key(node_id)
  }

  /// Get outgoing edges for a given node.
  pub fn outgoing(&self, node_id: &str) -> &[&'a Edge] {
    self
      .outgoing
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Get incoming edges for a given node.
  pub fn incoming(&self, node_id: &str) -> &[&'a Edge] {
    self
      .incoming
      .get(node_id)
      .map(|v| v.as_slice())
      .unwrap_or(&[])
  }

  /// Trigger nodes, in insertion order.
  pub fn triggers(&self) -> &[&'a str] {
    &self.triggers
  }

  /// The trigger used as the entry point of a test run: the first one added.
  pub fn entry_trigger(&self) -> Option<&'a str> {
    self.triggers.first().copied()
  }

  /// Edges whose source or target is not part of the graph.
  pub fn dangling_edges(&self) -> &[&'a Edge] {
    &self.dangling
  }

  /// All nodes reachable from any trigger, triggers included.
  pub fn reachable_from_triggers(&self) -> HashSet<&'a str> {
    self.reachable_from(self.triggers.iter().copied())
  }

  /// Check whether `to` can be reached from `from` by following edges.
  pub fn reaches(&self, from: &str, to: &str) -> bool {
    match self.nodes.get_key_value(from) {
      Some((&start, _)) => self.reachable_from([start]).contains(to),
      None => false,
    }
  }

  fn reachable_from(&self, starts: impl IntoIterator<Item = &'a str>) -> HashSet<&'a str> {
    let mut seen: HashSet<&'a str> = HashSet::new();
    let mut queue: VecDeque<&'a str> = VecDeque::new();

    for start in starts {
      if seen.insert(start) {
        queue.push_back(start);
      }
    }

    while let Some(current) = queue.pop_front() {
      for edge in self.outgoing(current) {
        let target = edge.target.as_str();
        if seen.insert(target) {
          queue.push_back(target);
        }
      }
    }

    seen
  }
}
