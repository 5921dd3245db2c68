//! Editing session for a single workflow.
//!
//! [`WorkflowSession`] connects a [`Canvas`] to a [`WorkflowBackend`]: it
//! loads and saves the graph, runs tests, publishes, and moves documents in
//! and out through export, import and version restore.
//!
//! Backend failures are logged and returned. The session state is left as it
//! was before the failed call, except that a failed test run always clears
//! the running flag.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use flowcanvas_client::{ClientError, WorkflowBackend};
use flowcanvas_config::{TestExecution, VersionSummary};
use tracing::{debug, error, info, instrument, warn};

use crate::canvas::{Canvas, CanvasView, Panel};
use crate::config::EditorConfig;
use crate::keymap::{Command, FocusTarget, KeyEvent};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
  #[error(transparent)]
  Client(#[from] ClientError),

  #[error("workflow has {errors} validation error(s)")]
  Invalid { errors: usize },

  #[error("invalid workflow JSON: {0}")]
  InvalidJson(#[from] serde_json::Error),

  #[error("failed to write {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Identifies a test run started with [`WorkflowSession::begin_test`].
///
/// Only the most recent run may deliver results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRun(u64);

pub struct WorkflowSession {
  workflow_id: String,
  backend: Arc<dyn WorkflowBackend>,
  canvas: Canvas,
  version: u32,
  is_published: bool,
  is_saving: bool,
  is_test_running: bool,
  current_run: u64,
  last_execution: Option<TestExecution>,
}

impl WorkflowSession {
  pub fn new(
    workflow_id: impl Into<String>,
    backend: Arc<dyn WorkflowBackend>,
    config: EditorConfig,
  ) -> Self {
    Self {
      workflow_id: workflow_id.into(),
      backend,
      canvas: Canvas::new(config),
      version: 0,
      is_published: false,
      is_saving: false,
      is_test_running: false,
      current_run: 0,
      last_execution: None,
    }
  }

  pub fn workflow_id(&self) -> &str {
    &self.workflow_id
  }

  pub fn canvas(&self) -> &Canvas {
    &self.canvas
  }

  pub fn canvas_mut(&mut self) -> &mut Canvas {
    &mut self.canvas
  }

  pub fn version(&self) -> u32 {
    self.version
  }

  pub fn is_published(&self) -> bool {
    self.is_published
  }

  pub fn is_saving(&self) -> bool {
    self.is_saving
  }

  pub fn is_test_running(&self) -> bool {
    self.is_test_running
  }

  pub fn last_execution(&self) -> Option<&TestExecution> {
    self.last_execution.as_ref()
  }

  /// Render model including the latest test result.
  pub fn view(&self) -> CanvasView {
    self
      .canvas
      .view(self.last_execution.as_ref(), self.is_test_running)
  }

  /// Fetch the workflow and replace the canvas contents.
  #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
  pub async fn load(&mut self) -> Result<(), SessionError> {
    self.reload().await?;
    info!(version = self.version, nodes = self.canvas.nodes().len(), "workflow loaded");
    Ok(())
  }

  async fn reload(&mut self) -> Result<(), SessionError> {
    let document = self
      .backend
      .fetch_document(&self.workflow_id)
      .await
      .inspect_err(|e| error!(workflow_id = %self.workflow_id, error = %e, "fetch failed"))?;
    self.version = document.version;
    self.canvas.load_document(document);
    Ok(())
  }

  /// Save the graph if it has unsaved changes.
  ///
  /// Returns the new version, or `None` when there was nothing to save or a
  /// save is already in progress.
  #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
  pub async fn save(&mut self) -> Result<Option<u32>, SessionError> {
    if !self.canvas.has_changes() || self.is_saving {
      debug!("nothing to save");
      return Ok(None);
    }

    self.is_saving = true;
    let draft = self.canvas.draft();
    let result = self.backend.save_document(&self.workflow_id, &draft).await;
    self.is_saving = false;

    match result {
      Ok(version) => {
        self.version = version;
        self.canvas.mark_clean();
        info!(version, "workflow saved");
        Ok(Some(version))
      }
      Err(e) => {
        error!(error = %e, "save failed");
        Err(e.into())
      }
    }
  }

  /// Mark a test run as started. Any previous result is discarded.
  pub fn begin_test(&mut self) -> TestRun {
    self.current_run += 1;
    self.is_test_running = true;
    self.last_execution = None;
    debug!(workflow_id = %self.workflow_id, run = self.current_run, "test started");
    TestRun(self.current_run)
  }

  /// Deliver the outcome of a test run.
  ///
  /// Returns `Ok(false)` when `run` has been superseded by a newer run; its
  /// outcome is dropped. A failed run clears the running flag and shows no
  /// result.
  pub fn finish_test(
    &mut self,
    run: TestRun,
    result: Result<TestExecution, ClientError>,
  ) -> Result<bool, SessionError> {
    if run.0 != self.current_run {
      debug!(workflow_id = %self.workflow_id, run = run.0, "dropping superseded test result");
      return Ok(false);
    }

    self.is_test_running = false;
    match result {
      Ok(execution) => {
        info!(
          workflow_id = %self.workflow_id,
          execution_id = ?execution.execution_id,
          results = execution.node_results.len(),
          "test finished"
        );
        self.last_execution = Some(execution);
        self.canvas.open_panel(Panel::TestResults);
        Ok(true)
      }
      Err(e) => {
        error!(workflow_id = %self.workflow_id, error = %e, "test failed");
        Err(e.into())
      }
    }
  }

  /// Run a test and wait for its result.
  #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
  pub async fn test(&mut self, record_id: Option<&str>) -> Result<&TestExecution, SessionError> {
    let run = self.begin_test();
    let result = self.backend.run_test(&self.workflow_id, record_id).await;
    self.finish_test(run, result)?;
    self
      .last_execution
      .as_ref()
      .ok_or_else(|| ClientError::NoTestExecution(self.workflow_id.clone()).into())
  }

  /// Close the test results and forget them.
  pub fn dismiss_results(&mut self) {
    self.last_execution = None;
    if self.canvas.panels().last() == Some(&Panel::TestResults) {
      self.canvas.close_top_panel();
    }
  }

  /// Publish the workflow. Refused while validation reports errors.
  #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
  pub async fn publish(&mut self) -> Result<(), SessionError> {
    let report = self.canvas.validation();
    if report.has_errors() {
      warn!(errors = report.errors.len(), "publish blocked by validation errors");
      return Err(SessionError::Invalid {
        errors: report.errors.len(),
      });
    }

    self
      .backend
      .publish(&self.workflow_id)
      .await
      .inspect_err(|e| error!(error = %e, "publish failed"))?;
    self.is_published = true;
    info!("workflow published");
    Ok(())
  }

  #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
  pub async fn unpublish(&mut self) -> Result<(), SessionError> {
    self
      .backend
      .unpublish(&self.workflow_id)
      .await
      .inspect_err(|e| error!(error = %e, "unpublish failed"))?;
    self.is_published = false;
    info!("workflow unpublished");
    Ok(())
  }

  /// Write the backend's export of this workflow to
  /// `dir/workflow-<id>-<YYYY-MM-DD>.json` and return the path.
  #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
  pub async fn export(&self, dir: &Path) -> Result<PathBuf, SessionError> {
    let document = self
      .backend
      .export_document(&self.workflow_id)
      .await
      .inspect_err(|e| error!(error = %e, "export failed"))?;

    let path = dir.join(export_file_name(&self.workflow_id));
    let bytes = serde_json::to_vec_pretty(&document)?;
    tokio::fs::write(&path, bytes)
      .await
      .map_err(|source| SessionError::Io {
        path: path.clone(),
        source,
      })
      .inspect_err(|e| error!(error = %e, "export failed"))?;

    info!(path = %path.display(), "workflow exported");
    Ok(path)
  }

  /// Replace the workflow with an exported document.
  ///
  /// Unsaved local edits are discarded. The canvas is reloaded from the
  /// backend, since it may assign new ids.
  #[instrument(skip(self, json), fields(workflow_id = %self.workflow_id))]
  pub async fn import(&mut self, json: &str) -> Result<(), SessionError> {
    let document: serde_json::Value = serde_json::from_str(json)
      .inspect_err(|e| error!(error = %e, "import payload is not valid JSON"))?;
    self
      .backend
      .import_document(&self.workflow_id, &document)
      .await
      .inspect_err(|e| error!(error = %e, "import failed"))?;
    self.reload().await?;
    info!(version = self.version, "workflow imported");
    Ok(())
  }

  /// Make a saved version current and reload it. Unsaved edits are discarded.
  #[instrument(skip(self), fields(workflow_id = %self.workflow_id))]
  pub async fn restore(&mut self, version: u32) -> Result<(), SessionError> {
    self
      .backend
      .restore_version(&self.workflow_id, version)
      .await
      .inspect_err(|e| error!(error = %e, "restore failed"))?;
    self.reload().await?;
    info!(restored = version, version = self.version, "workflow version restored");
    Ok(())
  }

  pub async fn versions(&self) -> Result<Vec<VersionSummary>, SessionError> {
    let versions = self
      .backend
      .list_versions(&self.workflow_id)
      .await
      .inspect_err(|e| error!(workflow_id = %self.workflow_id, error = %e, "listing versions failed"))?;
    Ok(versions)
  }

  /// Resolve a key press and run the resulting command.
  pub async fn handle_key(
    &mut self,
    event: &KeyEvent,
    focus: FocusTarget,
  ) -> Result<Option<Command>, SessionError> {
    let mut ctx = self.canvas.shortcut_context(focus);
    ctx.is_saving = self.is_saving;
    ctx.is_test_running = self.is_test_running;

    let Some(command) = self.canvas.config().keymap.resolve(event, &ctx) else {
      return Ok(None);
    };
    debug!(workflow_id = %self.workflow_id, ?command, "shortcut");

    match command {
      Command::Save => {
        self.save().await?;
      }
      Command::Test => {
        self.test(None).await?;
      }
      Command::ClosePanel if self.canvas.panels().last() == Some(&Panel::TestResults) => {
        self.dismiss_results();
      }
      _ => {
        self.canvas.apply_command(command);
      }
    }
    Ok(Some(command))
  }
}

fn export_file_name(workflow_id: &str) -> String {
  format!("workflow-{}-{}.json", workflow_id, Utc::now().format("%Y-%m-%d"))
}
