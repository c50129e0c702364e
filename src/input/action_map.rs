use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEventKind};
use serde::Deserialize;

use super::PanelEvent;
use crate::error::{PanelError, Result};

pub const DEFAULT_CANCEL_ACTION: &str = "ui_cancel";
pub const DEFAULT_ACCEPT_ACTION: &str = "ui_accept";

/// Answers "does this event satisfy this action".
pub trait ActionMap {
    fn matches(&self, action: &str, event: &PanelEvent) -> bool;
}

impl<F> ActionMap for F
where
    F: Fn(&str, &PanelEvent) -> bool,
{
    fn matches(&self, action: &str, event: &PanelEvent) -> bool {
        self(action, event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Chord {
    Key {
        code: KeyCode,
        modifiers: KeyModifiers,
    },
    Mouse(MouseButton),
}

impl Chord {
    pub fn key(code: KeyCode) -> Self {
        Chord::Key {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn key_with(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Chord::Key { code, modifiers }
    }

    pub fn matches(&self, event: &PanelEvent) -> bool {
        match (self, event) {
            (Chord::Key { code, modifiers }, PanelEvent::Key(key)) => {
                key_matches(*code, *modifiers, key)
            }
            (Chord::Mouse(button), PanelEvent::Mouse(mouse)) => matches!(
                mouse.kind,
                MouseEventKind::Down(b) | MouseEventKind::Up(b) | MouseEventKind::Drag(b)
                    if b == *button
            ),
            _ => false,
        }
    }
}

fn key_matches(code: KeyCode, modifiers: KeyModifiers, key: &KeyEvent) -> bool {
    match (code, key.code) {
        // Shift only changes the case of a character key.
        (KeyCode::Char(expected), KeyCode::Char(actual)) => {
            expected.eq_ignore_ascii_case(&actual)
                && key.modifiers.difference(KeyModifiers::SHIFT)
                    == modifiers.difference(KeyModifiers::SHIFT)
        }
        (expected, actual) => expected == actual && key.modifiers == modifiers,
    }
}

/// Action map keyed by action name, each action bound to a list of chords.
///
/// Loadable from JSON:
///
/// ```json
/// { "ui_cancel": ["Esc"], "save": [{ "code": "s", "ctrl": true }] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct KeyActionMap {
    actions: HashMap<String, Vec<Chord>>,
}

impl KeyActionMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// `ui_cancel` on Esc, `ui_accept` on Enter or Space.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_binding(DEFAULT_CANCEL_ACTION, Chord::key(KeyCode::Esc))
            .with_binding(DEFAULT_ACCEPT_ACTION, Chord::key(KeyCode::Enter))
            .with_binding(DEFAULT_ACCEPT_ACTION, Chord::key(KeyCode::Char(' ')))
    }

    pub fn with_binding(mut self, action: impl Into<String>, chord: Chord) -> Self {
        self.bind(action, chord);
        self
    }

    pub fn bind(&mut self, action: impl Into<String>, chord: Chord) {
        let chords = self.actions.entry(action.into()).or_default();
        if !chords.contains(&chord) {
            chords.push(chord);
        }
    }

    pub fn unbind_action(&mut self, action: &str) -> bool {
        self.actions.remove(action).is_some()
    }

    pub fn chords(&self, action: &str) -> &[Chord] {
        self.actions.get(action).map_or(&[], Vec::as_slice)
    }

    pub fn from_json(source: &str) -> Result<Self> {
        let spec: HashMap<String, Vec<ChordEntry>> = serde_json::from_str(source)?;
        let mut map = Self::new();
        for (action, entries) in spec {
            if entries.is_empty() {
                map.actions.entry(action.clone()).or_default();
            }
            for entry in entries {
                map.bind(action.clone(), entry.into_chord()?);
            }
        }
        Ok(map)
    }

    /// Overlays the bindings from `other`, replacing whole actions.
    pub fn merge(&mut self, other: KeyActionMap) {
        self.actions.extend(other.actions);
    }
}

impl ActionMap for KeyActionMap {
    fn matches(&self, action: &str, event: &PanelEvent) -> bool {
        if let PanelEvent::Action { name, .. } = event {
            return name == action;
        }
        self.actions
            .get(action)
            .is_some_and(|chords| chords.iter().any(|chord| chord.matches(event)))
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ChordEntry {
    Code(String),
    Spec(ChordSpec),
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ChordSpec {
    code: String,
    #[serde(default)]
    ctrl: bool,
    #[serde(default)]
    alt: bool,
    #[serde(default)]
    shift: bool,
}

impl ChordEntry {
    fn into_chord(self) -> Result<Chord> {
        match self {
            ChordEntry::Code(code) => parse_chord(&code, KeyModifiers::NONE),
            ChordEntry::Spec(spec) => {
                let mut modifiers = KeyModifiers::NONE;
                if spec.ctrl {
                    modifiers |= KeyModifiers::CONTROL;
                }
                if spec.alt {
                    modifiers |= KeyModifiers::ALT;
                }
                if spec.shift {
                    modifiers |= KeyModifiers::SHIFT;
                }
                parse_chord(&spec.code, modifiers)
            }
        }
    }
}

fn parse_chord(code: &str, modifiers: KeyModifiers) -> Result<Chord> {
    let key = match code {
        "MouseLeft" => return Ok(Chord::Mouse(MouseButton::Left)),
        "MouseRight" => return Ok(Chord::Mouse(MouseButton::Right)),
        "MouseMiddle" => return Ok(Chord::Mouse(MouseButton::Middle)),
        "Esc" | "Escape" => KeyCode::Esc,
        "Enter" | "Return" => KeyCode::Enter,
        "Tab" => KeyCode::Tab,
        "BackTab" => KeyCode::BackTab,
        "Backspace" => KeyCode::Backspace,
        "Delete" => KeyCode::Delete,
        "Insert" => KeyCode::Insert,
        "Space" => KeyCode::Char(' '),
        "Up" => KeyCode::Up,
        "Down" => KeyCode::Down,
        "Left" => KeyCode::Left,
        "Right" => KeyCode::Right,
        "Home" => KeyCode::Home,
        "End" => KeyCode::End,
        "PageUp" => KeyCode::PageUp,
        "PageDown" => KeyCode::PageDown,
        other => {
            let function = other
                .strip_prefix('F')
                .and_then(|digits| digits.parse::<u8>().ok())
                .filter(|n| (1..=24).contains(n));
            let mut chars = other.chars();
            match (function, chars.next(), chars.next()) {
                (Some(n), _, _) => KeyCode::F(n),
                (None, Some(ch), None) => KeyCode::Char(ch),
                _ => {
                    return Err(PanelError::Config(format!("unknown key code `{other}`")));
                }
            }
        }
    };
    Ok(Chord::key_with(key, modifiers))
}
