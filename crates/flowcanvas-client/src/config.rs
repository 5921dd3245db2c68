use serde::{Deserialize, Serialize};

fn default_base_url() -> String {
  "http://localhost:8000/api/".to_string()
}

fn default_timeout_ms() -> u64 {
  30_000
}

/// Connection settings for [`HttpBackend`](crate::HttpBackend).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
  /// Base URL of the API, e.g. "https://app.example.com/api/".
  #[serde(default = "default_base_url")]
  pub base_url: String,

  /// Bearer token sent with every request.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub token: Option<String>,

  /// Request timeout in milliseconds.
  #[serde(default = "default_timeout_ms")]
  pub timeout_ms: u64,
}

impl Default for ClientConfig {
  fn default() -> Self {
    Self {
      base_url: default_base_url(),
      token: None,
      timeout_ms: default_timeout_ms(),
    }
  }
}
