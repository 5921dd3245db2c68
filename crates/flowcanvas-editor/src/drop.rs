use flowcanvas_config::NodeKind;
use serde::{Deserialize, Serialize};

/// Data carried by a palette item dragged onto the canvas.
///
/// ```json
/// { "type": "action", "subtype": "send_email" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PalettePayload {
  #[serde(rename = "type")]
  pub kind: NodeKind,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub subtype: Option<String>,
}

impl PalettePayload {
  pub fn parse(raw: &str) -> Result<Self, serde_json::Error> {
    let mut payload: PalettePayload = serde_json::from_str(raw)?;
    if payload.subtype.as_deref().is_some_and(str::is_empty) {
      payload.subtype = None;
    }
    Ok(payload)
  }
}
