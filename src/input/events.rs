use crate::core::geo::{Point, Size};
use serde::{Deserialize, Serialize};

/// Input delivered by the host, in screen (pointer) coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputEvent {
    PointerDown {
        position: Point,
        button: MouseButton,
        modifiers: KeyModifiers,
    },
    PointerMove {
        position: Point,
    },
    PointerUp {
        position: Point,
        button: MouseButton,
    },
    DoubleClick {
        position: Point,
    },
    /// Scroll wheel; negative delta is "wheel up"
    Wheel {
        delta: f64,
        position: Point,
    },
    KeyDown {
        key: KeyCode,
        modifiers: KeyModifiers,
    },
    /// The map container changed size
    Resize {
        size: Size,
    },
}

/// Keyboard key codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyCode {
    Delete,
    Backspace,
    Escape,
    Char(char),
    Other(u32),
}

impl KeyCode {
    /// Case-insensitive letter match
    pub fn is_char(&self, c: char) -> bool {
        matches!(self, KeyCode::Char(k) if k.eq_ignore_ascii_case(&c))
    }
}

/// Keyboard modifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct KeyModifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl KeyModifiers {
    pub const NONE: KeyModifiers = KeyModifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }

    /// Ctrl on most platforms, Cmd on macOS
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Whether an event was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventHandled {
    Handled,
    NotHandled,
}

impl EventHandled {
    pub fn from_bool(handled: bool) -> Self {
        if handled {
            Self::Handled
        } else {
            Self::NotHandled
        }
    }

    pub fn is_handled(self) -> bool {
        self == Self::Handled
    }
}

impl InputEvent {
    /// Gets the pointer position associated with this event, if any
    pub fn position(&self) -> Option<Point> {
        match self {
            InputEvent::PointerDown { position, .. }
            | InputEvent::PointerMove { position }
            | InputEvent::PointerUp { position, .. }
            | InputEvent::DoubleClick { position }
            | InputEvent::Wheel { position, .. } => Some(*position),
            InputEvent::KeyDown { .. } | InputEvent::Resize { .. } => None,
        }
    }

    pub fn is_keyboard_event(&self) -> bool {
        matches!(self, InputEvent::KeyDown { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_event_position() {
        let down = InputEvent::PointerDown {
            position: Point::new(100.0, 200.0),
            button: MouseButton::Left,
            modifiers: KeyModifiers::NONE,
        };
        assert_eq!(down.position(), Some(Point::new(100.0, 200.0)));

        let key = InputEvent::KeyDown {
            key: KeyCode::Delete,
            modifiers: KeyModifiers::default(),
        };
        assert_eq!(key.position(), None);
        assert!(key.is_keyboard_event());
    }

    #[test]
    fn test_key_helpers() {
        assert!(KeyCode::Char('C').is_char('c'));
        assert!(!KeyCode::Char('v').is_char('c'));
        assert!(KeyModifiers::ctrl().command());
        assert!(!KeyModifiers::shift().command());
    }
}
