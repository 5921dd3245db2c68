//! Flowcanvas Config
//!
//! This crate contains the serializable workflow graph types for flowcanvas.
//! The JSON shape follows what the canvas writes and the backend stores:
//!
//! ```json
//! {
//!   "nodes": [
//!     { "id": "t1", "type": "trigger", "position": { "x": 250, "y": 50 },
//!       "data": { "trigger_type": "record_created" } }
//!   ],
//!   "edges": [
//!     { "id": "e1", "source": "t1", "target": "a1", "sourceHandle": null }
//!   ],
//!   "viewport": { "x": 0, "y": 0, "zoom": 1 },
//!   "version": 3
//! }
//! ```
//!
//! Node `data` is modelled as [`NodeData`], one variant per node type, so the
//! valid field set of each type is explicit and matches can be exhaustive.

mod edge;
mod enums;
mod error;
mod execution;
mod node;
mod number;
mod workflow;

pub use edge::{CONDITION_FALSE_HANDLE, CONDITION_TRUE_HANDLE, Edge, EdgeId, condition_handle};
pub use enums::{ConditionLogic, DurationUnit, JoinType, WaitType};
pub use error::DataError;
pub use execution::{NodeResult, NodeResultStatus, TestExecution};
pub use node::{
  ActionConfig, AgentConfig, BranchConfig, BranchDescriptor, ConditionConfig, ConditionRule,
  JoinConfig, Node, NodeData, NodeId, NodeKind, Position, TriggerConfig, WaitConfig,
};
pub use workflow::{DocumentDraft, VersionSummary, Viewport, WorkflowDocument};
