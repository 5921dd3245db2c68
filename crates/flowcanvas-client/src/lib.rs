//! Flowcanvas Client
//!
//! This crate provides the backend trait and implementations the editor uses
//! to persist and test workflow graphs. The backend owns the authoritative
//! [`WorkflowDocument`]; the editor only holds a working copy.
//!
//! The [`WorkflowBackend`] trait defines operations for:
//! - Fetching, saving, exporting and importing workflow documents
//! - Running test executions
//! - Publishing and unpublishing
//! - Listing and restoring versions
//!
//! Implementations:
//! - [`HttpBackend`] talks to the REST API
//! - [`MemoryBackend`] keeps everything in process (tests, offline use)

mod config;
mod http;
mod memory;

pub use config::ClientConfig;
pub use http::HttpBackend;
pub use memory::MemoryBackend;

use async_trait::async_trait;
use flowcanvas_config::{DocumentDraft, TestExecution, VersionSummary, WorkflowDocument};

/// Error type for backend operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  /// The workflow does not exist.
  #[error("workflow not found: {0}")]
  NotFound(String),

  /// The requested version does not exist.
  #[error("version {version} not found for workflow {workflow_id}")]
  VersionNotFound { workflow_id: String, version: u32 },

  /// The backend answered with a non-success status.
  #[error("backend returned {status}: {body}")]
  Status { status: u16, body: String },

  /// No test execution is available.
  #[error("no test execution available for workflow {0}")]
  NoTestExecution(String),

  /// The configured base URL cannot be used.
  #[error("invalid base url: {0}")]
  InvalidBaseUrl(String),

  /// Transport error.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The payload is not a valid workflow document.
  #[error("invalid document: {0}")]
  InvalidDocument(#[from] serde_json::Error),
}

/// Backend operations for a workflow's graph.
#[async_trait]
pub trait WorkflowBackend: Send + Sync {
  /// Get the current document of a workflow.
  async fn fetch_document(&self, workflow_id: &str) -> Result<WorkflowDocument, ClientError>;

  /// Get the exportable JSON of a workflow, exactly as the backend serves it.
  async fn export_document(&self, workflow_id: &str) -> Result<serde_json::Value, ClientError>;

  /// Save the graph. Returns the new version number.
  async fn save_document(
    &self,
    workflow_id: &str,
    draft: &DocumentDraft,
  ) -> Result<u32, ClientError>;

  /// Replace the graph with an imported document. The backend may remap ids.
  async fn import_document(
    &self,
    workflow_id: &str,
    document: &serde_json::Value,
  ) -> Result<(), ClientError>;

  /// Run a test execution, optionally against a sample record.
  async fn run_test(
    &self,
    workflow_id: &str,
    record_id: Option<&str>,
  ) -> Result<TestExecution, ClientError>;

  /// Publish the workflow.
  async fn publish(&self, workflow_id: &str) -> Result<(), ClientError>;

  /// Unpublish the workflow.
  async fn unpublish(&self, workflow_id: &str) -> Result<(), ClientError>;

  /// List saved versions, newest first.
  async fn list_versions(&self, workflow_id: &str) -> Result<Vec<VersionSummary>, ClientError>;

  /// Make a saved version the current graph.
  async fn restore_version(&self, workflow_id: &str, version: u32) -> Result<(), ClientError>;
}
