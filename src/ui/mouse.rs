//! Mouse event encoding
//!
//! Reports go out in one of three wire forms, picked from the engine modes:
//! SGR (`CSI < b ; x ; y M|m`), UTF-8 extended (`CSI M` + three UTF-8
//! encoded values) or classic X10 (`CSI M` + three bytes, coordinates up to
//! 223). The tracking mode decides which events are reported at all.

use crossterm::event::{self, MouseEvent, MouseEventKind};

use super::keymapper::Modifiers;
use crate::core::term::Modes;

/// Largest 1-based coordinate X10 can carry in one byte
const X10_MAX: u16 = 223;

/// Largest 1-based coordinate the UTF-8 form carries in two bytes
const UTF8_MAX: u16 = 2015;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
    WheelLeft,
    WheelRight,
}

impl MouseButton {
    fn code(self) -> u16 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
            MouseButton::WheelLeft => 66,
            MouseButton::WheelRight => 67,
        }
    }

    fn is_wheel(self) -> bool {
        self.code() >= 64
    }
}

impl From<event::MouseButton> for MouseButton {
    fn from(button: event::MouseButton) -> Self {
        match button {
            event::MouseButton::Left => MouseButton::Left,
            event::MouseButton::Middle => MouseButton::Middle,
            event::MouseButton::Right => MouseButton::Right,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseAction {
    Press(MouseButton),
    Release(MouseButton),
    /// Motion with a button held
    Drag(MouseButton),
    /// Motion with no button held
    Motion,
}

/// A mouse event in 0-based screen coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MouseInput {
    pub action: MouseAction,
    pub col: u16,
    pub row: u16,
    pub mods: Modifiers,
}

impl MouseInput {
    pub fn new(action: MouseAction, col: u16, row: u16) -> Self {
        Self {
            action,
            col,
            row,
            mods: Modifiers::empty(),
        }
    }

    pub fn with_mods(mut self, mods: Modifiers) -> Self {
        self.mods = mods;
        self
    }

    /// Convert a crossterm event; coordinates must already be relative to
    /// the terminal
    pub fn from_crossterm(event: &MouseEvent) -> Self {
        let action = match event.kind {
            MouseEventKind::Down(btn) => MouseAction::Press(btn.into()),
            MouseEventKind::Up(btn) => MouseAction::Release(btn.into()),
            MouseEventKind::Drag(btn) => MouseAction::Drag(btn.into()),
            MouseEventKind::Moved => MouseAction::Motion,
            MouseEventKind::ScrollUp => MouseAction::Press(MouseButton::WheelUp),
            MouseEventKind::ScrollDown => MouseAction::Press(MouseButton::WheelDown),
            MouseEventKind::ScrollLeft => MouseAction::Press(MouseButton::WheelLeft),
            MouseEventKind::ScrollRight => MouseAction::Press(MouseButton::WheelRight),
        };
        Self {
            action,
            col: event.column,
            row: event.row,
            mods: event.modifiers.into(),
        }
    }
}

/// Whether the active tracking mode reports this action
fn is_reported(action: MouseAction, modes: Modes) -> bool {
    match action {
        MouseAction::Press(_) => modes.intersects(Modes::MOUSE_TRACKING),
        MouseAction::Release(button) => {
            !button.is_wheel()
                && modes.intersects(Modes::MOUSE_BUTTONS | Modes::MOUSE_DRAG | Modes::MOUSE_MOTION)
        }
        MouseAction::Drag(_) => modes.intersects(Modes::MOUSE_DRAG | Modes::MOUSE_MOTION),
        MouseAction::Motion => modes.contains(Modes::MOUSE_MOTION),
    }
}

/// Encode a mouse event for the application, or `None` when the current
/// modes do not report it
pub fn encode(input: &MouseInput, modes: Modes) -> Option<Vec<u8>> {
    if !is_reported(input.action, modes) {
        return None;
    }

    let (mut cb, release) = match input.action {
        MouseAction::Press(button) => (button.code(), false),
        MouseAction::Release(button) => (button.code(), true),
        MouseAction::Drag(button) => (button.code() + 32, false),
        MouseAction::Motion => (3 + 32, false),
    };

    // X10 compatibility mode carries no modifiers
    if modes.intersects(Modes::MOUSE_BUTTONS | Modes::MOUSE_DRAG | Modes::MOUSE_MOTION) {
        if input.mods.contains(Modifiers::SHIFT) {
            cb += 4;
        }
        if input.mods.intersects(Modifiers::ALT | Modifiers::META) {
            cb += 8;
        }
        if input.mods.contains(Modifiers::CTRL) {
            cb += 16;
        }
    }

    let x = input.col.saturating_add(1);
    let y = input.row.saturating_add(1);

    if modes.contains(Modes::MOUSE_SGR) {
        let suffix = if release { 'm' } else { 'M' };
        return Some(format!("\x1b[<{};{};{}{}", cb, x, y, suffix).into_bytes());
    }

    // Legacy forms report every release as button 3
    if release {
        cb = (cb & !0b11) | 3;
    }

    if modes.contains(Modes::MOUSE_UTF8) {
        if x > UTF8_MAX || y > UTF8_MAX {
            return None;
        }
        let mut out = b"\x1b[M".to_vec();
        for value in [cb, x, y] {
            let ch = char::from_u32(u32::from(value) + 32)?;
            let mut buf = [0u8; 4];
            out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        }
        return Some(out);
    }

    if x > X10_MAX || y > X10_MAX {
        return None;
    }
    Some(vec![
        0x1B,
        b'[',
        b'M',
        (cb + 32) as u8,
        (x + 32) as u8,
        (y + 32) as u8,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn press(col: u16, row: u16) -> MouseInput {
        MouseInput::new(MouseAction::Press(MouseButton::Left), col, row)
    }

    #[test]
    fn test_mouse_encoding_x10() {
        // Button 0 (left) at (0,0) -> cb=32, x=33, y=33
        assert_eq!(
            encode(&press(0, 0), Modes::MOUSE_BUTTONS),
            Some(vec![0x1b, b'[', b'M', 32, 33, 33])
        );

        let right = MouseInput::new(MouseAction::Press(MouseButton::Right), 10, 5);
        assert_eq!(
            encode(&right, Modes::MOUSE_BUTTONS),
            Some(vec![0x1b, b'[', b'M', 34, 43, 38])
        );

        let release = MouseInput::new(MouseAction::Release(MouseButton::Right), 0, 0);
        assert_eq!(
            encode(&release, Modes::MOUSE_BUTTONS),
            Some(vec![0x1b, b'[', b'M', 35, 33, 33])
        );

        assert_eq!(encode(&press(223, 0), Modes::MOUSE_BUTTONS), None);
    }

    #[test]
    fn test_mouse_encoding_sgr() {
        let modes = Modes::MOUSE_BUTTONS | Modes::MOUSE_SGR;
        assert_eq!(encode(&press(0, 0), modes), Some(b"\x1b[<0;1;1M".to_vec()));

        let release = MouseInput::new(MouseAction::Release(MouseButton::Left), 0, 0);
        assert_eq!(encode(&release, modes), Some(b"\x1b[<0;1;1m".to_vec()));

        assert_eq!(encode(&press(299, 399), modes), Some(b"\x1b[<0;300;400M".to_vec()));
    }

    #[test]
    fn test_mouse_encoding_utf8() {
        let modes = Modes::MOUSE_BUTTONS | Modes::MOUSE_UTF8;
        let mut expected = b"\x1b[M ".to_vec();
        expected.extend_from_slice("\u{12c}".as_bytes());
        expected.push(b'!');
        // x = 268 -> 268 + 32 = 300
        assert_eq!(encode(&press(267, 0), modes), Some(expected));
    }

    #[test]
    fn test_mouse_encoding_scroll() {
        let modes = Modes::MOUSE_BUTTONS | Modes::MOUSE_SGR;
        let up = MouseInput::new(MouseAction::Press(MouseButton::WheelUp), 5, 5);
        assert_eq!(encode(&up, modes), Some(b"\x1b[<64;6;6M".to_vec()));

        let down = MouseInput::new(MouseAction::Press(MouseButton::WheelDown), 5, 5);
        assert_eq!(encode(&down, modes), Some(b"\x1b[<65;6;6M".to_vec()));
    }

    #[test]
    fn test_mouse_modifiers_and_drag() {
        let modes = Modes::MOUSE_DRAG | Modes::MOUSE_SGR;
        let drag = MouseInput::new(MouseAction::Drag(MouseButton::Left), 1, 1)
            .with_mods(Modifiers::SHIFT | Modifiers::CTRL);
        assert_eq!(encode(&drag, modes), Some(b"\x1b[<52;2;2M".to_vec()));

        let alt = press(0, 0).with_mods(Modifiers::ALT);
        assert_eq!(encode(&alt, modes), Some(b"\x1b[<8;1;1M".to_vec()));
    }

    #[test]
    fn test_tracking_mode_filters_events() {
        let motion = MouseInput::new(MouseAction::Motion, 0, 0);
        let drag = MouseInput::new(MouseAction::Drag(MouseButton::Left), 0, 0);
        let release = MouseInput::new(MouseAction::Release(MouseButton::Left), 0, 0);

        assert_eq!(encode(&press(0, 0), Modes::empty()), None);

        // X10: presses only, no modifiers
        assert!(encode(&release, Modes::MOUSE_X10).is_none());
        assert_eq!(
            encode(&press(0, 0).with_mods(Modifiers::CTRL), Modes::MOUSE_X10),
            Some(vec![0x1b, b'[', b'M', 32, 33, 33])
        );

        assert!(encode(&release, Modes::MOUSE_BUTTONS).is_some());
        assert!(encode(&drag, Modes::MOUSE_BUTTONS).is_none());
        assert!(encode(&drag, Modes::MOUSE_DRAG).is_some());
        assert!(encode(&motion, Modes::MOUSE_DRAG).is_none());
        assert_eq!(
            encode(&motion, Modes::MOUSE_MOTION | Modes::MOUSE_SGR),
            Some(b"\x1b[<35;1;1M".to_vec())
        );
    }

    #[test]
    fn test_from_crossterm() {
        let event = MouseEvent {
            kind: MouseEventKind::ScrollDown,
            column: 3,
            row: 4,
            modifiers: KeyModifiers::CONTROL,
        };
        let input = MouseInput::from_crossterm(&event);
        assert_eq!(input.action, MouseAction::Press(MouseButton::WheelDown));
        assert_eq!((input.col, input.row), (3, 4));
        assert_eq!(input.mods, Modifiers::CTRL);
    }
}
