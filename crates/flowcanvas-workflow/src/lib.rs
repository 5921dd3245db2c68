//! Flowcanvas Workflow
//!
//! Derived views over a workflow graph. Everything in this crate is a pure
//! function of `(nodes, edges)` (plus a test execution for overlays):
//!
//! - [`Graph`] indexes nodes and edges for traversal
//! - [`validate`] derives errors and warnings for the editor
//! - [`map_overlay`] merges a test execution onto the graph
//!
//! Nothing here mutates the graph; callers recompute after every change.

mod graph;
mod overlay;
mod validate;

pub use graph::Graph;
pub use overlay::{EdgeOverlay, ExecutionStatus, NodeOverlay, Overlay, map_overlay};
pub use validate::{Severity, ValidationIssue, ValidationReport, validate};
