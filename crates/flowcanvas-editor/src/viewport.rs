//! Conversions between screen space and graph space.
//!
//! A graph point `p` is drawn at `bounds.origin + viewport.xy + p * zoom`.

use flowcanvas_config::{Position, Viewport};
use serde::{Deserialize, Serialize};

use crate::config::{FitViewConfig, LayoutConfig};

/// A point in window coordinates, e.g. where a drop happened.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScreenPoint {
  pub x: f64,
  pub y: f64,
}

impl ScreenPoint {
  pub fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }
}

/// Where the canvas sits on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
  pub x: f64,
  pub y: f64,
  pub width: f64,
  pub height: f64,
}

impl Rect {
  pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
    Self {
      x,
      y,
      width,
      height,
    }
  }
}

impl Default for Rect {
  fn default() -> Self {
    Self::new(0.0, 0.0, 1280.0, 800.0)
  }
}

pub fn screen_to_graph(point: ScreenPoint, bounds: &Rect, viewport: &Viewport) -> Position {
  let zoom = if viewport.zoom > 0.0 { viewport.zoom } else { 1.0 };
  Position::new(
    (point.x - bounds.x - viewport.x) / zoom,
    (point.y - bounds.y - viewport.y) / zoom,
  )
}

/// The viewport that centers all `positions` in `bounds`.
///
/// Returns `None` when there is nothing to fit.
pub fn fit_view(
  positions: impl IntoIterator<Item = Position>,
  bounds: &Rect,
  layout: &LayoutConfig,
  fit: &FitViewConfig,
) -> Option<Viewport> {
  let mut positions = positions.into_iter();
  let first = positions.next()?;
  let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
  for p in positions {
    min_x = min_x.min(p.x);
    min_y = min_y.min(p.y);
    max_x = max_x.max(p.x);
    max_y = max_y.max(p.y);
  }

  let width = max_x - min_x + layout.node_width;
  let height = max_y - min_y + layout.node_height;
  let scale = 1.0 + fit.padding;
  let zoom = (bounds.width / (width * scale))
    .min(bounds.height / (height * scale))
    .clamp(fit.min_zoom, fit.max_zoom);

  let center_x = min_x + width / 2.0;
  let center_y = min_y + height / 2.0;
  Some(Viewport {
    x: bounds.width / 2.0 - center_x * zoom,
    y: bounds.height / 2.0 - center_y * zoom,
    zoom,
  })
}
