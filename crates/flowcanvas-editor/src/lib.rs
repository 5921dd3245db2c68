//! Flowcanvas Editor
//!
//! The editing layer on top of the workflow graph:
//!
//! - [`Canvas`] holds the working copy and every mutation of it
//! - [`Keymap`] maps key presses to editor [`Command`]s
//! - [`WorkflowSession`] ties a canvas to a backend for save, test, publish,
//!   export, import and version restore
//! - [`AppConfig`] / [`EditorConfig`] hold the settings read from `config.json`

mod canvas;
mod config;
mod drop;
mod keymap;
mod session;
mod viewport;

pub use canvas::{
  Canvas, CanvasError, CanvasView, ConnectError, Connection, EdgeView, NodeView, Panel,
};
pub use config::{
  AppConfig, ConfigLoadError, ConnectPolicy, EditorConfig, FitViewConfig, LayoutConfig,
};
pub use drop::PalettePayload;
pub use keymap::{
  Chord, ChordParseError, Command, FocusTarget, Key, KeyEvent, Keymap, Modifiers, ShortcutContext,
};
pub use session::{SessionError, TestRun, WorkflowSession};
pub use viewport::{Rect, ScreenPoint, fit_view, screen_to_graph};
