use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use chrono::Utc;
use flowcanvas_config::{DocumentDraft, NodeId, TestExecution, VersionSummary, WorkflowDocument};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{ClientError, WorkflowBackend};

#[derive(Default)]
struct StoredWorkflow {
  current: WorkflowDocument,
  history: Vec<(VersionSummary, WorkflowDocument)>,
  published: bool,
  tests: VecDeque<TestExecution>,
}

impl StoredWorkflow {
  /// Replace the current graph and record it as a new version.
  fn commit(&mut self, draft: DocumentDraft, note: Option<String>) -> u32 {
    let version = self.current.version + 1;
    self.current = WorkflowDocument {
      nodes: draft.nodes,
      edges: draft.edges,
      viewport: draft.viewport,
      version,
    };
    let summary = VersionSummary {
      version,
      created_at: Utc::now(),
      created_by: None,
      note,
    };
    self.history.push((summary, self.current.clone()));
    version
  }
}

#[derive(Default)]
struct State {
  workflows: HashMap<String, StoredWorkflow>,
  offline: bool,
}

/// In-process [`WorkflowBackend`].
///
/// Keeps one document per workflow plus a snapshot of every saved version.
/// Test executions are not computed; they are queued with
/// [`queue_test`](Self::queue_test) and handed out in order.
#[derive(Default)]
pub struct MemoryBackend {
  state: Mutex<State>,
}

impl MemoryBackend {
  pub fn new() -> Self {
    Self::default()
  }

  /// Seed a workflow. The document's version is recorded as the first history entry.
  pub async fn insert(&self, workflow_id: &str, document: WorkflowDocument) {
    let mut state = self.state.lock().await;
    let summary = VersionSummary {
      version: document.version,
      created_at: Utc::now(),
      created_by: None,
      note: None,
    };
    let stored = StoredWorkflow {
      history: vec![(summary, document.clone())],
      current: document,
      ..Default::default()
    };
    state.workflows.insert(workflow_id.to_string(), stored);
  }

  /// Queue the result of the next `run_test` call for a workflow.
  pub async fn queue_test(
    &self,
    workflow_id: &str,
    execution: TestExecution,
  ) -> Result<(), ClientError> {
    let mut state = self.state.lock().await;
    let stored = state
      .workflows
      .get_mut(workflow_id)
      .ok_or_else(|| ClientError::NotFound(workflow_id.to_string()))?;
    stored.tests.push_back(execution);
    Ok(())
  }

  /// The current document, bypassing the offline switch.
  pub async fn document(&self, workflow_id: &str) -> Option<WorkflowDocument> {
    let state = self.state.lock().await;
    state.workflows.get(workflow_id).map(|w| w.current.clone())
  }

  pub async fn is_published(&self, workflow_id: &str) -> bool {
    let state = self.state.lock().await;
    state.workflows.get(workflow_id).is_some_and(|w| w.published)
  }

  /// While offline every backend call fails with a 503 status.
  pub async fn set_offline(&self, offline: bool) {
    self.state.lock().await.offline = offline;
  }

  async fn with_workflow<T>(
    &self,
    workflow_id: &str,
    f: impl FnOnce(&mut StoredWorkflow) -> Result<T, ClientError> + Send,
  ) -> Result<T, ClientError> {
    let mut state = self.state.lock().await;
    if state.offline {
      return Err(ClientError::Status {
        status: 503,
        body: "backend offline".to_string(),
      });
    }
    let stored = state
      .workflows
      .get_mut(workflow_id)
      .ok_or_else(|| ClientError::NotFound(workflow_id.to_string()))?;
    f(stored)
  }
}

/// Give every node and edge of an imported document a fresh id.
///
/// Edges whose endpoints are not part of the document are dropped.
fn remap_ids(document: WorkflowDocument) -> DocumentDraft {
  let mut ids: HashMap<NodeId, NodeId> = HashMap::new();
  let nodes = document
    .nodes
    .into_iter()
    .map(|mut node| {
      let id = Uuid::new_v4().to_string();
      ids.insert(std::mem::replace(&mut node.id, id.clone()), id);
      node
    })
    .collect();

  let edges = document
    .edges
    .into_iter()
    .filter_map(|mut edge| {
      edge.source = ids.get(&edge.source)?.clone();
      edge.target = ids.get(&edge.target)?.clone();
      edge.id = Uuid::new_v4().to_string();
      Some(edge)
    })
    .collect();

  DocumentDraft {
    nodes,
    edges,
    viewport: document.viewport,
  }
}

#[async_trait]
impl WorkflowBackend for MemoryBackend {
  async fn fetch_document(&self, workflow_id: &str) -> Result<WorkflowDocument, ClientError> {
    self
      .with_workflow(workflow_id, |w| Ok(w.current.clone()))
      .await
  }

  async fn export_document(&self, workflow_id: &str) -> Result<serde_json::Value, ClientError> {
    self
      .with_workflow(workflow_id, |w| Ok(serde_json::to_value(&w.current)?))
      .await
  }

  async fn save_document(
    &self,
    workflow_id: &str,
    draft: &DocumentDraft,
  ) -> Result<u32, ClientError> {
    let draft = draft.clone();
    let version = self
      .with_workflow(workflow_id, |w| Ok(w.commit(draft, None)))
      .await?;
    debug!(workflow_id, version, "saved workflow document");
    Ok(version)
  }

  async fn import_document(
    &self,
    workflow_id: &str,
    document: &serde_json::Value,
  ) -> Result<(), ClientError> {
    let document: WorkflowDocument = serde_json::from_value(document.clone())?;
    let draft = remap_ids(document);
    let version = self
      .with_workflow(workflow_id, |w| Ok(w.commit(draft, Some("import".to_string()))))
      .await?;
    debug!(workflow_id, version, "imported workflow document");
    Ok(())
  }

  async fn run_test(
    &self,
    workflow_id: &str,
    record_id: Option<&str>,
  ) -> Result<TestExecution, ClientError> {
    debug!(workflow_id, record_id = ?record_id, "replaying queued test execution");
    self
      .with_workflow(workflow_id, |w| {
        w.tests
          .pop_front()
          .ok_or_else(|| ClientError::NoTestExecution(workflow_id.to_string()))
      })
      .await
  }

  async fn publish(&self, workflow_id: &str) -> Result<(), ClientError> {
    self
      .with_workflow(workflow_id, |w| {
        w.published = true;
        Ok(())
      })
      .await
  }

  async fn unpublish(&self, workflow_id: &str) -> Result<(), ClientError> {
    self
      .with_workflow(workflow_id, |w| {
        w.published = false;
        Ok(())
      })
      .await
  }

  async fn list_versions(&self, workflow_id: &str) -> Result<Vec<VersionSummary>, ClientError> {
    self
      .with_workflow(workflow_id, |w| {
        Ok(w.history.iter().rev().map(|(s, _)| s.clone()).collect())
      })
      .await
  }

  async fn restore_version(&self, workflow_id: &str, version: u32) -> Result<(), ClientError> {
    self
      .with_workflow(workflow_id, |w| {
        let snapshot = w
          .history
          .iter()
          .find(|(s, _)| s.version == version)
          .map(|(_, doc)| doc.draft())
          .ok_or_else(|| ClientError::VersionNotFound {
            workflow_id: workflow_id.to_string(),
            version,
          })?;
        w.commit(snapshot, Some(format!("restored from version {}", version)));
        Ok(())
      })
      .await
  }
}
