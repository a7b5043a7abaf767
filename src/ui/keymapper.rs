//! Key mapping for terminal input
//!
//! Converts logical key presses to the byte sequences an application running
//! in the terminal expects. Unmodified keys come from the base table;
//! single-modifier presses of cursor, editing and function keys come from
//! the legacy table; everything else uses the xterm arithmetic form.

use std::collections::HashMap;
use std::sync::OnceLock;

use bitflags::bitflags;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::core::term::Modes;

bitflags! {
    /// Modifier keys. Bit values match the xterm modifier code, which is
    /// `1 + bits`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const ALT   = 0b0010;
        const CTRL  = 0b0100;
        const META  = 0b1000;
    }
}

impl From<KeyModifiers> for Modifiers {
    fn from(mods: KeyModifiers) -> Self {
        let mut result = Modifiers::empty();
        if mods.contains(KeyModifiers::SHIFT) {
            result |= Modifiers::SHIFT;
        }
        if mods.contains(KeyModifiers::CONTROL) {
            result |= Modifiers::CTRL;
        }
        if mods.contains(KeyModifiers::ALT) {
            result |= Modifiers::ALT;
        }
        if mods.contains(KeyModifiers::META) {
            result |= Modifiers::META;
        }
        result
    }
}

/// Logical key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Char(char),
    Enter,
    Tab,
    BackTab,
    Backspace,
    Esc,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    Insert,
    Delete,
    PageUp,
    PageDown,
    /// F1..=F64
    F(u8),
}

/// A key press with its modifiers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyInput {
    pub key: Key,
    pub mods: Modifiers,
}

impl KeyInput {
    pub fn new(key: Key, mods: Modifiers) -> Self {
        Self { key, mods }
    }

    /// Convert a crossterm key event; keys without a terminal encoding give
    /// `None`
    pub fn from_crossterm(event: &KeyEvent) -> Option<Self> {
        let mut mods = Modifiers::from(event.modifiers);
        let key = match event.code {
            KeyCode::Char(c) => Key::Char(c),
            KeyCode::Enter => Key::Enter,
            KeyCode::Tab => Key::Tab,
            KeyCode::BackTab => {
                mods.remove(Modifiers::SHIFT);
                Key::BackTab
            }
            KeyCode::Backspace => Key::Backspace,
            KeyCode::Esc => Key::Esc,
            KeyCode::Up => Key::Up,
            KeyCode::Down => Key::Down,
            KeyCode::Left => Key::Left,
            KeyCode::Right => Key::Right,
            KeyCode::Home => Key::Home,
            KeyCode::End => Key::End,
            KeyCode::Insert => Key::Insert,
            KeyCode::Delete => Key::Delete,
            KeyCode::PageUp => Key::PageUp,
            KeyCode::PageDown => Key::PageDown,
            KeyCode::F(n) if (1..=64).contains(&n) => Key::F(n),
            _ => return None,
        };
        Some(Self { key, mods })
    }
}

/// Unmodified sequences
static BASE_ENTRIES: &[(Key, &str)] = &[
    (Key::Up, "\x1bOA"),
    (Key::Down, "\x1bOB"),
    (Key::Right, "\x1bOC"),
    (Key::Left, "\x1bOD"),
    (Key::Home, "\x1bOH"),
    (Key::End, "\x1bOF"),
    (Key::Insert, "\x1b[2~"),
    (Key::Delete, "\x1b[3~"),
    (Key::PageUp, "\x1b[5~"),
    (Key::PageDown, "\x1b[6~"),
    (Key::Backspace, "\x7f"),
    (Key::BackTab, "\x1b[Z"),
    (Key::F(1), "\x1bOP"),
    (Key::F(2), "\x1bOQ"),
    (Key::F(3), "\x1bOR"),
    (Key::F(4), "\x1bOS"),
    (Key::F(5), "\x1b[15~"),
    (Key::F(6), "\x1b[17~"),
    (Key::F(7), "\x1b[18~"),
    (Key::F(8), "\x1b[19~"),
    (Key::F(9), "\x1b[20~"),
    (Key::F(10), "\x1b[21~"),
    (Key::F(11), "\x1b[23~"),
    (Key::F(12), "\x1b[24~"),
    (Key::F(13), "\x1b[1;2P"),
    (Key::F(14), "\x1b[1;2Q"),
    (Key::F(15), "\x1b[1;2R"),
    (Key::F(16), "\x1b[1;2S"),
    (Key::F(17), "\x1b[15;2~"),
    (Key::F(18), "\x1b[17;2~"),
    (Key::F(19), "\x1b[18;2~"),
    (Key::F(20), "\x1b[19;2~"),
    (Key::F(21), "\x1b[20;2~"),
    (Key::F(22), "\x1b[21;2~"),
    (Key::F(23), "\x1b[23;2~"),
    (Key::F(24), "\x1b[24;2~"),
    (Key::F(25), "\x1b[1;5P"),
    (Key::F(26), "\x1b[1;5Q"),
    (Key::F(27), "\x1b[1;5R"),
    (Key::F(28), "\x1b[1;5S"),
    (Key::F(29), "\x1b[15;5~"),
    (Key::F(30), "\x1b[17;5~"),
    (Key::F(31), "\x1b[18;5~"),
    (Key::F(32), "\x1b[19;5~"),
    (Key::F(33), "\x1b[20;5~"),
    (Key::F(34), "\x1b[21;5~"),
    (Key::F(35), "\x1b[23;5~"),
    (Key::F(36), "\x1b[24;5~"),
    (Key::F(37), "\x1b[1;6P"),
    (Key::F(38), "\x1b[1;6Q"),
    (Key::F(39), "\x1b[1;6R"),
    (Key::F(40), "\x1b[1;6S"),
    (Key::F(41), "\x1b[15;6~"),
    (Key::F(42), "\x1b[17;6~"),
    (Key::F(43), "\x1b[18;6~"),
    (Key::F(44), "\x1b[19;6~"),
    (Key::F(45), "\x1b[20;6~"),
    (Key::F(46), "\x1b[21;6~"),
    (Key::F(47), "\x1b[23;6~"),
    (Key::F(48), "\x1b[24;6~"),
    (Key::F(49), "\x1b[1;3P"),
    (Key::F(50), "\x1b[1;3Q"),
    (Key::F(51), "\x1b[1;3R"),
    (Key::F(52), "\x1b[1;3S"),
    (Key::F(53), "\x1b[15;3~"),
    (Key::F(54), "\x1b[17;3~"),
    (Key::F(55), "\x1b[18;3~"),
    (Key::F(56), "\x1b[19;3~"),
    (Key::F(57), "\x1b[20;3~"),
    (Key::F(58), "\x1b[21;3~"),
    (Key::F(59), "\x1b[23;3~"),
    (Key::F(60), "\x1b[24;3~"),
    (Key::F(61), "\x1b[1;4P"),
    (Key::F(62), "\x1b[1;4Q"),
    (Key::F(63), "\x1b[1;4R"),
    (Key::F(64), "\x1b[1;4S"),
];

/// Legacy modified sequences, columns in [`LEGACY_MODS`] order
static LEGACY_ENTRIES: &[(Key, [&str; 7])] = &[
    (
        Key::Up,
        [
            "\x1b[1;2A",
            "\x1b[1;3A",
            "\x1b[1;4A",
            "\x1b[1;5A",
            "\x1b[1;6A",
            "\x1b[1;7A",
            "\x1b[1;8A",
        ],
    ),
    (
        Key::Down,
        [
            "\x1b[1;2B",
            "\x1b[1;3B",
            "\x1b[1;4B",
            "\x1b[1;5B",
            "\x1b[1;6B",
            "\x1b[1;7B",
            "\x1b[1;8B",
        ],
    ),
    (
        Key::Right,
        [
            "\x1b[1;2C",
            "\x1b[1;3C",
            "\x1b[1;4C",
            "\x1b[1;5C",
            "\x1b[1;6C",
            "\x1b[1;7C",
            "\x1b[1;8C",
        ],
    ),
    (
        Key::Left,
        [
            "\x1b[1;2D",
            "\x1b[1;3D",
            "\x1b[1;4D",
            "\x1b[1;5D",
            "\x1b[1;6D",
            "\x1b[1;7D",
            "\x1b[1;8D",
        ],
    ),
    (
        Key::Home,
        [
            "\x1b[1;2H",
            "\x1b[1;3H",
            "\x1b[1;4H",
            "\x1b[1;5H",
            "\x1b[1;6H",
            "\x1b[1;7H",
            "\x1b[1;8H",
        ],
    ),
    (
        Key::End,
        [
            "\x1b[1;2F",
            "\x1b[1;3F",
            "\x1b[1;4F",
            "\x1b[1;5F",
            "\x1b[1;6F",
            "\x1b[1;7F",
            "\x1b[1;8F",
        ],
    ),
    (
        Key::Insert,
        [
            "\x1b[2;2~",
            "\x1b[2;3~",
            "\x1b[2;4~",
            "\x1b[2;5~",
            "\x1b[2;6~",
            "\x1b[2;7~",
            "\x1b[2;8~",
        ],
    ),
    (
        Key::Delete,
        [
            "\x1b[3;2~",
            "\x1b[3;3~",
            "\x1b[3;4~",
            "\x1b[3;5~",
            "\x1b[3;6~",
            "\x1b[3;7~",
            "\x1b[3;8~",
        ],
    ),
    (
        Key::PageUp,
        [
            "\x1b[5;2~",
            "\x1b[5;3~",
            "\x1b[5;4~",
            "\x1b[5;5~",
            "\x1b[5;6~",
            "\x1b[5;7~",
            "\x1b[5;8~",
        ],
    ),
    (
        Key::PageDown,
        [
            "\x1b[6;2~",
            "\x1b[6;3~",
            "\x1b[6;4~",
            "\x1b[6;5~",
            "\x1b[6;6~",
            "\x1b[6;7~",
            "\x1b[6;8~",
        ],
    ),
];

const LEGACY_MODS: [Modifiers; 7] = [
    Modifiers::SHIFT,
    Modifiers::ALT,
    Modifiers::ALT.union(Modifiers::SHIFT),
    Modifiers::CTRL,
    Modifiers::CTRL.union(Modifiers::SHIFT),
    Modifiers::CTRL.union(Modifiers::ALT),
    Modifiers::CTRL.union(Modifiers::ALT).union(Modifiers::SHIFT),
];

/// Function key offsets for the legacy modifiers: Shift+F1 is F13, and so
/// on. Alt+Shift only reaches F4.
const FKEY_OFFSETS: [(Modifiers, u8); 5] = [
    (Modifiers::SHIFT, 12),
    (Modifiers::CTRL, 24),
    (Modifiers::CTRL.union(Modifiers::SHIFT), 36),
    (Modifiers::ALT, 48),
    (Modifiers::ALT.union(Modifiers::SHIFT), 60),
];

fn base_table() -> &'static HashMap<Key, &'static str> {
    static TABLE: OnceLock<HashMap<Key, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| BASE_ENTRIES.iter().copied().collect())
}

fn legacy_table() -> &'static HashMap<(Key, Modifiers), &'static str> {
    static TABLE: OnceLock<HashMap<(Key, Modifiers), &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut table = HashMap::new();
        for (key, seqs) in LEGACY_ENTRIES {
            for (mods, seq) in LEGACY_MODS.iter().zip(seqs) {
                table.insert((*key, *mods), *seq);
            }
        }
        let base = base_table();
        for n in 1..=12u8 {
            for (mods, offset) in FKEY_OFFSETS {
                if let Some(seq) = base.get(&Key::F(n + offset)) {
                    table.insert((Key::F(n), mods), *seq);
                }
            }
        }
        table
    })
}

/// Key mapper for converting key presses to bytes
pub struct KeyMapper;

impl KeyMapper {
    /// Map a crossterm key event to bytes
    pub fn map_event(event: &KeyEvent, modes: Modes) -> Option<Vec<u8>> {
        KeyInput::from_crossterm(event).and_then(|input| Self::map(&input, modes))
    }

    /// Map a key press to bytes
    pub fn map(input: &KeyInput, modes: Modes) -> Option<Vec<u8>> {
        let mods = input.mods;
        let alt = mods.intersects(Modifiers::ALT | Modifiers::META);
        match input.key {
            Key::Char(ch) => Some(Self::map_char(ch, mods)),
            Key::Enter => {
                let mut out = if alt { vec![0x1B] } else { Vec::new() };
                if modes.contains(Modes::LINEFEED_NEWLINE) {
                    out.extend_from_slice(b"\r\n");
                } else {
                    out.push(b'\r');
                }
                Some(out)
            }
            Key::Tab if mods.contains(Modifiers::SHIFT) => Some(b"\x1b[Z".to_vec()),
            Key::Tab => Some(if alt { b"\x1b\t".to_vec() } else { b"\t".to_vec() }),
            Key::Esc => Some(if alt { b"\x1b\x1b".to_vec() } else { b"\x1b".to_vec() }),
            Key::Backspace => {
                if mods.contains(Modifiers::CTRL) {
                    Some(vec![0x08])
                } else if alt {
                    Some(vec![0x1B, 0x7F])
                } else {
                    Some(vec![0x7F])
                }
            }
            Key::BackTab => Some(b"\x1b[Z".to_vec()),
            key => Self::map_named(key, mods, modes),
        }
    }

    /// Cursor, editing and function keys
    fn map_named(key: Key, mods: Modifiers, modes: Modes) -> Option<Vec<u8>> {
        let base = *base_table().get(&key)?;
        if mods.is_empty() {
            let cursor_key = matches!(
                key,
                Key::Up | Key::Down | Key::Left | Key::Right | Key::Home | Key::End
            );
            if cursor_key && !modes.contains(Modes::CURSOR_KEYS) {
                return Some(base.replacen("\x1bO", "\x1b[", 1).into_bytes());
            }
            return Some(base.as_bytes().to_vec());
        }
        // Higher function keys already carry a modifier
        if matches!(key, Key::F(n) if n > 12) {
            return None;
        }
        if let Some(seq) = legacy_table().get(&(key, mods)) {
            return Some(seq.as_bytes().to_vec());
        }
        Self::with_modifier(base, mods)
    }

    /// Arithmetic form: `CSI n ; code ~` or `CSI 1 ; code X`
    fn with_modifier(base: &str, mods: Modifiers) -> Option<Vec<u8>> {
        let code = Self::modifier_code(mods);
        if let Some(body) = base.strip_suffix('~') {
            return Some(format!("{};{}~", body, code).into_bytes());
        }
        if let Some(letter) = base.strip_prefix("\x1bO") {
            return Some(format!("\x1b[1;{}{}", code, letter).into_bytes());
        }
        None
    }

    /// Map a character with modifiers
    fn map_char(ch: char, mods: Modifiers) -> Vec<u8> {
        let alt = mods.intersects(Modifiers::ALT | Modifiers::META);
        let ctrl = mods.contains(Modifiers::CTRL);

        if ctrl {
            if let Some(code) = Self::control_code(ch) {
                return if alt { vec![0x1B, code] } else { vec![code] };
            }
        }

        let mut out = Vec::with_capacity(5);
        if alt {
            out.push(0x1B);
        }
        // Alt sends the rune as typed; Alt+Shift is told apart by upper case
        let ch = if alt && mods.contains(Modifiers::SHIFT) {
            ch.to_ascii_uppercase()
        } else {
            ch
        };
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        out
    }

    /// C0 code for Ctrl+ch
    fn control_code(ch: char) -> Option<u8> {
        match ch {
            'a'..='z' => Some(ch as u8 - b'a' + 1),
            'A'..='Z' => Some(ch as u8 - b'A' + 1),
            '@' | '`' | ' ' | '2' => Some(0x00),
            '[' | '3' => Some(0x1B),
            '\\' | '4' => Some(0x1C),
            ']' | '5' => Some(0x1D),
            '^' | '~' | '6' => Some(0x1E),
            '_' | '?' | '7' => Some(0x1F),
            _ => None,
        }
    }

    /// xterm modifier code
    pub fn modifier_code(mods: Modifiers) -> u8 {
        1 + mods.bits()
    }
}
