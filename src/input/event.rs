use crossterm::event::{KeyEvent, KeyEventKind, MouseEvent, MouseEventKind};

/// Raw input delivered to the panel stack by the host loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    /// An action the host already resolved (gamepad, scripted input).
    Action { name: String, pressed: bool },
}

impl PanelEvent {
    pub fn action(name: impl Into<String>, pressed: bool) -> Self {
        PanelEvent::Action {
            name: name.into(),
            pressed,
        }
    }

    pub fn is_pressed(&self) -> bool {
        match self {
            PanelEvent::Key(key) => key.kind != KeyEventKind::Release,
            PanelEvent::Mouse(mouse) => {
                matches!(mouse.kind, MouseEventKind::Down(_) | MouseEventKind::Drag(_))
            }
            PanelEvent::Action { pressed, .. } => *pressed,
        }
    }

    pub fn phase(&self) -> InputPhase {
        if self.is_pressed() {
            InputPhase::Pressed
        } else {
            InputPhase::Released
        }
    }

    pub fn describe(&self) -> &'static str {
        match self {
            PanelEvent::Key(_) => "key",
            PanelEvent::Mouse(_) => "mouse",
            PanelEvent::Action { .. } => "action",
        }
    }
}

impl From<KeyEvent> for PanelEvent {
    fn from(key: KeyEvent) -> Self {
        PanelEvent::Key(key)
    }
}

impl From<MouseEvent> for PanelEvent {
    fn from(mouse: MouseEvent) -> Self {
        PanelEvent::Mouse(mouse)
    }
}

/// Phase filter on a binding. `Any` accepts both edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputPhase {
    Pressed,
    Released,
    Any,
}

impl InputPhase {
    pub fn accepts(self, current: InputPhase) -> bool {
        self == InputPhase::Any || self == current
    }
}

/// Whether the stack consumed an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventFlow {
    Continue,
    Consumed,
}
