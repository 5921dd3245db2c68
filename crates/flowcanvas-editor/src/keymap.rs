//! Keyboard shortcut dispatch.
//!
//! [`Keymap::resolve`] turns a key press into a [`Command`], given what the
//! editor is doing at the time. It never touches editor state itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
#[error("invalid key chord '{0}'")]
pub struct ChordParseError(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
  /// A printable key. Letters are stored lowercase.
  Char(char),
  Enter,
  Escape,
  Delete,
  Backspace,
  Tab,
}

impl Key {
  fn name(&self) -> String {
    match self {
      Key::Char(c) => c.to_uppercase().to_string(),
      Key::Enter => "Enter".to_string(),
      Key::Escape => "Escape".to_string(),
      Key::Delete => "Delete".to_string(),
      Key::Backspace => "Backspace".to_string(),
      Key::Tab => "Tab".to_string(),
    }
  }

  fn from_name(name: &str) -> Option<Self> {
    let key = match name.to_ascii_lowercase().as_str() {
      "enter" | "return" => Key::Enter,
      "escape" | "esc" => Key::Escape,
      "delete" | "del" => Key::Delete,
      "backspace" => Key::Backspace,
      "tab" => Key::Tab,
      _ => {
        let mut chars = name.chars();
        match (chars.next(), chars.next()) {
          (Some(c), None) => Key::Char(c.to_ascii_lowercase()),
          _ => return None,
        }
      }
    };
    Some(key)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
  pub ctrl: bool,
  pub meta: bool,
  pub shift: bool,
  pub alt: bool,
}

impl Modifiers {
  /// Ctrl on most platforms, Cmd on macOS.
  pub fn primary(&self) -> bool {
    self.ctrl || self.meta
  }

  pub fn is_empty(&self) -> bool {
    !(self.ctrl || self.meta || self.shift || self.alt)
  }
}

/// A key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
  pub key: Key,
  pub modifiers: Modifiers,
}

impl KeyEvent {
  pub fn new(key: Key) -> Self {
    Self {
      key,
      modifiers: Modifiers::default(),
    }
  }

  /// The key with Ctrl held.
  pub fn ctrl(key: Key) -> Self {
    Self {
      key,
      modifiers: Modifiers {
        ctrl: true,
        ..Default::default()
      },
    }
  }

  pub fn with_shift(mut self) -> Self {
    self.modifiers.shift = true;
    self
  }
}

/// A shortcut such as `Mod+Shift+F`.
///
/// `Mod` (also written `Ctrl`, `Cmd` or `Meta`) matches either Ctrl or Meta.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Chord {
  pub key: Key,
  pub primary: bool,
  pub shift: bool,
  pub alt: bool,
}

impl Chord {
  pub fn matches(&self, event: &KeyEvent) -> bool {
    let key_matches = match (&self.key, &event.key) {
      (Key::Char(a), Key::Char(b)) => a.eq_ignore_ascii_case(b),
      (a, b) => a == b,
    };
    key_matches
      && self.primary == event.modifiers.primary()
      && self.shift == event.modifiers.shift
      && self.alt == event.modifiers.alt
  }
}

impl FromStr for Chord {
  type Err = ChordParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let err = || ChordParseError(s.to_string());
    let mut parts: Vec<&str> = s.split('+').map(str::trim).collect();
    let key = parts.pop().and_then(Key::from_name).ok_or_else(err)?;

    let mut chord = Chord {
      key,
      primary: false,
      shift: false,
      alt: false,
    };
    for part in parts {
      match part.to_ascii_lowercase().as_str() {
        "mod" | "ctrl" | "control" | "cmd" | "meta" => chord.primary = true,
        "shift" => chord.shift = true,
        "alt" | "option" => chord.alt = true,
        _ => return Err(err()),
      }
    }
    Ok(chord)
  }
}

impl fmt::Display for Chord {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.primary {
      f.write_str("Mod+")?;
    }
    if self.shift {
      f.write_str("Shift+")?;
    }
    if self.alt {
      f.write_str("Alt+")?;
    }
    f.write_str(&self.key.name())
  }
}

impl TryFrom<String> for Chord {
  type Error = ChordParseError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    value.parse()
  }
}

impl From<Chord> for String {
  fn from(chord: Chord) -> Self {
    chord.to_string()
  }
}

/// Where keyboard focus is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
  #[default]
  Canvas,
  /// A text field, e.g. in a node's configuration panel.
  TextInput,
}

/// Editor state a shortcut depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShortcutContext {
  pub focus: FocusTarget,
  pub has_selection: bool,
  pub has_open_panel: bool,
  pub has_changes: bool,
  pub is_saving: bool,
  pub is_test_running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
  DeleteSelection,
  Save,
  Test,
  ClosePanel,
  ClearSelection,
  FitView,
}

/// Configurable shortcuts. Delete, Backspace and Escape are fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Keymap {
  pub save: Chord,
  pub test: Chord,
  pub fit_view: Chord,
}

impl Default for Keymap {
  fn default() -> Self {
    let mod_key = |key, shift| Chord {
      key,
      primary: true,
      shift,
      alt: false,
    };
    Self {
      save: mod_key(Key::Char('s'), false),
      test: mod_key(Key::Enter, false),
      fit_view: mod_key(Key::Char('f'), true),
    }
  }
}

impl Keymap {
  /// Resolve a key press to a command. `None` means the press is not a
  /// shortcut, or the shortcut does not apply right now.
  pub fn resolve(&self, event: &KeyEvent, ctx: &ShortcutContext) -> Option<Command> {
    if self.save.matches(event) {
      return (ctx.has_changes && !ctx.is_saving).then_some(Command::Save);
    }
    if self.test.matches(event) {
      return (!ctx.is_test_running).then_some(Command::Test);
    }
    if self.fit_view.matches(event) {
      return Some(Command::FitView);
    }
    if !event.modifiers.is_empty() {
      return None;
    }

    match event.key {
      Key::Delete | Key::Backspace => {
        let allowed = ctx.focus != FocusTarget::TextInput && ctx.has_selection;
        allowed.then_some(Command::DeleteSelection)
      }
      Key::Escape if ctx.has_open_panel => Some(Command::ClosePanel),
      Key::Escape if ctx.has_selection => Some(Command::ClearSelection),
      _ => None,
    }
  }
}
