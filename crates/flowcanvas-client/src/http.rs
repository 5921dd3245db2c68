use std::time::Duration;

use async_trait::async_trait;
use flowcanvas_config::{DocumentDraft, TestExecution, VersionSummary, WorkflowDocument};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::ClientConfig;
use crate::{ClientError, WorkflowBackend};

/// REST implementation of [`WorkflowBackend`].
///
/// All routes live under `{base_url}/workflows/{workflow_id}/`:
/// ```text
/// GET  graph                    -> WorkflowDocument
/// PUT  graph                    <- DocumentDraft, -> { "version": n }
/// GET  graph/export             -> raw JSON
/// POST graph/import             <- raw JSON
/// POST test                     <- { "record_id": ... }, -> TestExecution
/// POST publish | unpublish
/// GET  versions                 -> [VersionSummary]
/// POST versions/{n}/restore
/// ```
pub struct HttpBackend {
  client: Client,
  base_url: Url,
  token: Option<String>,
}

#[derive(Serialize)]
struct TestRequest<'a> {
  #[serde(skip_serializing_if = "Option::is_none")]
  record_id: Option<&'a str>,
}

#[derive(Deserialize)]
struct SaveResponse {
  version: u32,
}

impl HttpBackend {
  /// Create a new backend from connection settings.
  pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
    let base_url =
      Url::parse(&config.base_url).map_err(|e| ClientError::InvalidBaseUrl(e.to_string()))?;
    if base_url.cannot_be_a_base() {
      return Err(ClientError::InvalidBaseUrl(config.base_url.clone()));
    }

    let client = Client::builder()
      .timeout(Duration::from_millis(config.timeout_ms))
      .build()?;

    Ok(Self {
      client,
      base_url,
      token: config.token.clone(),
    })
  }

  /// Build the URL of a workflow sub-resource. Segments are percent-encoded.
  fn url(&self, workflow_id: &str, path: &[&str]) -> Result<Url, ClientError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| ClientError::InvalidBaseUrl(self.base_url.to_string()))?
      .pop_if_empty()
      .push("workflows")
      .push(workflow_id)
      .extend(path);
    Ok(url)
  }

  fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
    match &self.token {
      Some(token) => request.bearer_auth(token),
      None => request,
    }
  }

  async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response, ClientError> {
    let response = self.authorize(request).send().await?;
    let status = response.status();
    if !status.is_success() {
      let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
          debug!(error = %e, status = status.as_u16(), "could not read error response body");
          String::new()
        }
      };
      return Err(ClientError::Status {
        status: status.as_u16(),
        body,
      });
    }
    Ok(response)
  }

  async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
    let response = self.send(request).await?;
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
  }
}

#[async_trait]
impl WorkflowBackend for HttpBackend {
  async fn fetch_document(&self, workflow_id: &str) -> Result<WorkflowDocument, ClientError> {
    let url = self.url(workflow_id, &["graph"])?;
    debug!(%url, "fetching workflow document");
    self.send_json(self.client.get(url)).await
  }

  async fn export_document(&self, workflow_id: &str) -> Result<serde_json::Value, ClientError> {
    let url = self.url(workflow_id, &["graph", "export"])?;
    debug!(%url, "exporting workflow document");
    self.send_json(self.client.get(url)).await
  }

  async fn save_document(
    &self,
    workflow_id: &str,
    draft: &DocumentDraft,
  ) -> Result<u32, ClientError> {
    let url = self.url(workflow_id, &["graph"])?;
    debug!(%url, nodes = draft.nodes.len(), edges = draft.edges.len(), "saving workflow document");
    let response: SaveResponse = self.send_json(self.client.put(url).json(draft)).await?;
    Ok(response.version)
  }

  async fn import_document(
    &self,
    workflow_id: &str,
    document: &serde_json::Value,
  ) -> Result<(), ClientError> {
    let url = self.url(workflow_id, &["graph", "import"])?;
    debug!(%url, "importing workflow document");
    self.send(self.client.post(url).json(document)).await?;
    Ok(())
  }

  async fn run_test(
    &self,
    workflow_id: &str,
    record_id: Option<&str>,
  ) -> Result<TestExecution, ClientError> {
    let url = self.url(workflow_id, &["test"])?;
    debug!(%url, record_id = ?record_id, "running test execution");
    self
      .send_json(self.client.post(url).json(&TestRequest { record_id }))
      .await
  }

  async fn publish(&self, workflow_id: &str) -> Result<(), ClientError> {
    let url = self.url(workflow_id, &["publish"])?;
    self.send(self.client.post(url)).await?;
    Ok(())
  }

  async fn unpublish(&self, workflow_id: &str) -> Result<(), ClientError> {
    let url = self.url(workflow_id, &["unpublish"])?;
    self.send(self.client.post(url)).await?;
    Ok(())
  }

  async fn list_versions(&self, workflow_id: &str) -> Result<Vec<VersionSummary>, ClientError> {
    let url = self.url(workflow_id, &["versions"])?;
    self.send_json(self.client.get(url)).await
  }

  async fn restore_version(&self, workflow_id: &str, version: u32) -> Result<(), ClientError> {
    let version = version.to_string();
    let url = self.url(workflow_id, &["versions", &version, "restore"])?;
    debug!(%url, "restoring workflow version");
    self.send(self.client.post(url)).await?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::{Matcher, Server};
  use serde_json::json;

  fn backend(base_url: String) -> HttpBackend {
    HttpBackend::new(&ClientConfig {
      base_url,
      token: Some("secret".to_string()),
      timeout_ms: 5_000,
    })
    .unwrap()
  }

  #[test]
  fn test_url_building() {
    let with_slash = backend("https://app.example.com/api/".to_string());
    let url = with_slash.url("wf 1", &["versions", "3", "restore"]).unwrap();
    assert_eq!(
      url.as_str(),
      "https://app.example.com/api/workflows/wf%201/versions/3/restore"
    );

    let without_slash = backend("https://app.example.com/api".to_string());
    let url = without_slash.url("wf1", &["graph"]).unwrap();
    assert_eq!(url.as_str(), "https://app.example.com/api/workflows/wf1/graph");
  }

  #[test]
  fn test_rejects_non_base_url() {
    let result = HttpBackend::new(&ClientConfig {
      base_url: "mailto:ops@example.com".to_string(),
      ..Default::default()
    });
    assert!(matches!(result, Err(ClientError::InvalidBaseUrl(_))));
  }

  #[tokio::test]
  async fn test_fetch_document() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("GET", "/workflows/wf1/graph")
      .match_header("authorization", "Bearer secret")
      .with_status(200)
      .with_header("content-type", "application/json")
      .with_body(
        json!({
          "nodes": [{ "id": "t1", "type": "trigger", "position": { "x": 0, "y": 0 },
                      "data": { "trigger_type": "record_created" } }],
          "edges": [],
          "viewport": { "x": 0, "y": 0, "zoom": 1 },
          "version": 7
        })
        .to_string(),
      )
      .create_async()
      .await;

    let doc = backend(server.url()).fetch_document("wf1").await.unwrap();
    assert_eq!(doc.version, 7);
    assert_eq!(doc.nodes.len(), 1);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_save_document_returns_version() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("PUT", "/workflows/wf1/graph")
      .match_body(Matcher::PartialJson(json!({ "nodes": [], "edges": [] })))
      .with_status(200)
      .with_body(r#"{ "version": 8 }"#)
      .create_async()
      .await;

    let version = backend(server.url())
      .save_document("wf1", &DocumentDraft::default())
      .await
      .unwrap();
    assert_eq!(version, 8);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_run_test_sends_record_id() {
    let mut server = Server::new_async().await;
    let mock = server
      .mock("POST", "/workflows/wf1/test")
      .match_body(Matcher::Json(json!({ "record_id": "rec_9" })))
      .with_status(200)
      .with_body(
        json!({ "node_results": [{ "node_id": "t1", "status": "success" }] }).to_string(),
      )
      .create_async()
      .await;

    let exec = backend(server.url())
      .run_test("wf1", Some("rec_9"))
      .await
      .unwrap();
    assert_eq!(exec.node_results.len(), 1);
    mock.assert_async().await;
  }

  #[tokio::test]
  async fn test_error_status_is_reported() {
    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/workflows/wf1/publish")
      .with_status(422)
      .with_body("workflow has validation errors")
      .create_async()
      .await;

    let result = backend(server.url()).publish("wf1").await;
    match result {
      Err(ClientError::Status { status, body }) => {
        assert_eq!(status, 422);
        assert_eq!(body, "workflow has validation errors");
      }
      other => panic!("expected status error, got {:?}", other),
    }
  }

  #[tokio::test]
  async fn test_export_is_passthrough() {
    let mut server = Server::new_async().await;
    let body = json!({ "nodes": [], "edges": [], "viewport": { "x": 1, "y": 2, "zoom": 1 },
                       "version": 2, "exported_by": "someone" });
    let _mock = server
      .mock("GET", "/workflows/wf1/graph/export")
      .with_status(200)
      .with_body(body.to_string())
      .create_async()
      .await;

    let exported = backend(server.url()).export_document("wf1").await.unwrap();
    assert_eq!(exported, body);
  }

  #[tokio::test]
  async fn test_export_keeps_key_order() {
    let mut server = Server::new_async().await;
    let body = r#"{"version":2,"nodes":[],"edges":[],"exported_by":"someone"}"#;
    let _mock = server
      .mock("GET", "/workflows/wf1/graph/export")
      .with_status(200)
      .with_body(body)
      .create_async()
      .await;

    let exported = backend(server.url()).export_document("wf1").await.unwrap();
    let keys: Vec<&str> = exported
      .as_object()
      .unwrap()
      .keys()
      .map(String::as_str)
      .collect();
    assert_eq!(keys, ["version", "nodes", "edges", "exported_by"]);
    assert_eq!(serde_json::to_string(&exported).unwrap(), body);
  }

  #[tokio::test]
  async fn test_unreadable_error_body_keeps_status() {
    use std::io::Write;

    let mut server = Server::new_async().await;
    let _mock = server
      .mock("POST", "/workflows/wf1/publish")
      .with_status(500)
      .with_chunked_body(|w| {
        w.write_all(b"partial")?;
        Err(std::io::Error::other("connection dropped"))
      })
      .create_async()
      .await;

    let result = backend(server.url()).publish("wf1").await;
    assert!(matches!(
      result,
      Err(ClientError::Status { status: 500, .. })
    ));
  }
}
