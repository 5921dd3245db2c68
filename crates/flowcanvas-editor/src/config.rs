use std::path::{Path, PathBuf};

use flowcanvas_client::ClientConfig;
use flowcanvas_config::Position;
use serde::{Deserialize, Serialize};

use crate::keymap::Keymap;

/// Error loading a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
  #[error("failed to read config file {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config file {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

/// Where nodes added without coordinates are placed, and how big nodes are.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
  /// Position of the first stacked node.
  pub stack_origin: Position,
  /// Vertical distance between stacked nodes.
  pub stack_spacing: f64,
  pub node_width: f64,
  pub node_height: f64,
}

impl Default for LayoutConfig {
  fn default() -> Self {
    Self {
      stack_origin: Position::new(250.0, 100.0),
      stack_spacing: 150.0,
      node_width: 220.0,
      node_height: 80.0,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitViewConfig {
  /// Margin around the nodes, as a fraction of the canvas size.
  pub padding: f64,
  pub min_zoom: f64,
  pub max_zoom: f64,
}

impl Default for FitViewConfig {
  fn default() -> Self {
    Self {
      padding: 0.2,
      min_zoom: 0.1,
      max_zoom: 2.0,
    }
  }
}

/// Which connections the canvas accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectPolicy {
  /// Allow edges that close a cycle. Self-loops are rejected regardless.
  pub allow_cycles: bool,
}

impl Default for ConnectPolicy {
  fn default() -> Self {
    Self { allow_cycles: true }
  }
}

/// Editor behavior settings.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
  pub layout: LayoutConfig,
  pub fit_view: FitViewConfig,
  pub connect: ConnectPolicy,
  pub keymap: Keymap,
}

/// Contents of `config.json` in the data directory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
  pub client: ClientConfig,
  pub editor: EditorConfig,
}

impl AppConfig {
  /// Load the config file at `path`. A missing file yields the defaults.
  pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
    let content = match std::fs::read_to_string(path) {
      Ok(content) => content,
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
      Err(source) => {
        return Err(ConfigLoadError::Io {
          path: path.to_path_buf(),
          source,
        });
      }
    };

    serde_json::from_str(&content).map_err(|source| ConfigLoadError::Parse {
      path: path.to_path_buf(),
      source,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::keymap::Chord;

  #[test]
  fn test_missing_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig::load(&dir.path().join("config.json")).unwrap();
    assert_eq!(config, AppConfig::default());
    assert!(config.editor.connect.allow_cycles);
  }

  #[test]
  fn test_partial_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(
      &path,
      r#"{
        "client": { "base_url": "https://crm.example.com/api/", "token": "abc" },
        "editor": {
          "connect": { "allow_cycles": false },
          "layout": { "stack_spacing": 200 },
          "keymap": { "save": "Ctrl+Shift+S" }
        }
      }"#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.client.token.as_deref(), Some("abc"));
    assert!(!config.editor.connect.allow_cycles);
    assert_eq!(config.editor.layout.stack_spacing, 200.0);
    assert_eq!(config.editor.layout.node_width, 220.0);
    assert_eq!(config.editor.keymap.save, "Ctrl+Shift+S".parse::<Chord>().unwrap());
    assert_eq!(config.editor.keymap.test, Keymap::default().test);
  }

  #[test]
  fn test_invalid_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "editor": { "keymap": { "save": "Mod+" } } }"#).unwrap();

    let err = AppConfig::load(&path).unwrap_err();
    assert!(matches!(err, ConfigLoadError::Parse { .. }));
    assert!(err.to_string().contains("config.json"));
  }
}
