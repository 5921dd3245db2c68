use thiserror::Error;

use crate::node::NodeKind;

/// Errors produced while reading or changing node data.
#[derive(Debug, Error)]
pub enum DataError {
  #[error("unknown node type: {0}")]
  UnknownNodeKind(String),

  #[error("node data patch must be a JSON object")]
  PatchNotObject,

  #[error("invalid {kind} node data: {source}")]
  InvalidData {
    kind: NodeKind,
    #[source]
    source: serde_json::Error,
  },
}
