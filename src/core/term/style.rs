//! Cell style and color model
//!
//! A [`Style`] is the immutable snapshot stored in every cell: foreground and
//! background [`Color`], attribute flags and an optional hyperlink. Styles are
//! updated from SGR parameter lists and can be turned back into the escape
//! sequences that select them.

use std::fmt::Write as _;
use std::sync::Arc;

use bitflags::bitflags;

/// Color mode tag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColorMode {
    Unset,
    Bit3Normal,
    Bit3Bright,
    Bit8,
    Bit24,
}

/// Color definition
///
/// `Normal` and `Bright` carry a 0-7 palette code, `Indexed` a 256-color
/// index. `Rgb` is stored unpacked; see [`Color::code`] for the packed form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Color {
    #[default]
    Unset,
    Normal(u8),
    Bright(u8),
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    /// Build a 24-bit color from its packed `R<<16 | G<<8 | B` form
    pub fn from_packed(rgb: u32) -> Self {
        Color::Rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    pub fn mode(&self) -> ColorMode {
        match self {
            Color::Unset => ColorMode::Unset,
            Color::Normal(_) => ColorMode::Bit3Normal,
            Color::Bright(_) => ColorMode::Bit3Bright,
            Color::Indexed(_) => ColorMode::Bit8,
            Color::Rgb(..) => ColorMode::Bit24,
        }
    }

    /// Numeric code: palette index, or packed RGB for 24-bit colors
    pub fn code(&self) -> u32 {
        match *self {
            Color::Unset => 0,
            Color::Normal(c) | Color::Bright(c) | Color::Indexed(c) => c as u32,
            Color::Rgb(r, g, b) => (r as u32) << 16 | (g as u32) << 8 | b as u32,
        }
    }

    /// Escape sequence selecting this color
    ///
    /// Background sequences are the foreground ones offset by 10.
    pub fn to_sgr(&self, background: bool) -> String {
        let base = if background { 10 } else { 0 };
        match *self {
            Color::Unset => format!("\x1b[{}m", 39 + base),
            Color::Normal(c) => format!("\x1b[{}m", 30 + base + c as u16),
            Color::Bright(c) => format!("\x1b[{}m", 90 + base + c as u16),
            Color::Indexed(n) => format!("\x1b[{};5;{}m", 38 + base, n),
            Color::Rgb(r, g, b) => format!("\x1b[{};2;{};{};{}m", 38 + base, r, g, b),
        }
    }

    /// Convert to crossterm color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        use crossterm::style::Color as C;
        match *self {
            Color::Unset => C::Reset,
            Color::Normal(c) | Color::Bright(c) => {
                let dark = [
                    C::Black,
                    C::DarkRed,
                    C::DarkGreen,
                    C::DarkYellow,
                    C::DarkBlue,
                    C::DarkMagenta,
                    C::DarkCyan,
                    C::Grey,
                ];
                let bright = [
                    C::DarkGrey,
                    C::Red,
                    C::Green,
                    C::Yellow,
                    C::Blue,
                    C::Magenta,
                    C::Cyan,
                    C::White,
                ];
                let table = if matches!(self, Color::Bright(_)) { bright } else { dark };
                table[(c & 7) as usize]
            }
            Color::Indexed(n) => C::AnsiValue(n),
            Color::Rgb(r, g, b) => C::Rgb { r, g, b },
        }
    }
}

bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct AttrFlags: u16 {
        const BOLD          = 0b0000_0000_0001;
        const DIM           = 0b0000_0000_0010;
        const ITALIC        = 0b0000_0000_0100;
        const UNDERLINE     = 0b0000_0000_1000;
        const BLINK         = 0b0000_0001_0000;
        const INVERSE       = 0b0000_0010_0000;
        const HIDDEN        = 0b0000_0100_0000;
        const STRIKETHROUGH = 0b0000_1000_0000;
    }
}

/// OSC 8 hyperlink target shared by all cells printed while it is active
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Hyperlink {
    pub url: String,
    pub id: String,
}

/// Cell style
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Style {
    pub fg: Color,
    pub bg: Color,
    pub flags: AttrFlags,
    pub link: Option<Arc<Hyperlink>>,
}

impl Style {
    /// Reset colors and attributes. An active hyperlink is kept, since only
    /// OSC 8 may close it.
    pub fn reset(&mut self) {
        let link = self.link.take();
        *self = Style { link, ..Style::default() };
    }

    /// Apply an SGR parameter list
    ///
    /// An empty list is treated as a single 0. Unknown codes are ignored and
    /// truncated extended color forms consume what is present without
    /// changing the color.
    pub fn apply_sgr(&mut self, params: &[u16]) {
        if params.is_empty() {
            self.reset();
            return;
        }

        let mut i = 0;
        while i < params.len() {
            let p = params[i];
            i += 1;
            match p {
                0 => self.reset(),
                1 => self.flags.insert(AttrFlags::BOLD),
                2 => self.flags.insert(AttrFlags::DIM),
                3 => self.flags.insert(AttrFlags::ITALIC),
                4 => self.flags.insert(AttrFlags::UNDERLINE),
                5 | 6 => self.flags.insert(AttrFlags::BLINK),
                7 => self.flags.insert(AttrFlags::INVERSE),
                8 => self.flags.insert(AttrFlags::HIDDEN),
                9 => self.flags.insert(AttrFlags::STRIKETHROUGH),
                21 | 22 => self.flags.remove(AttrFlags::BOLD | AttrFlags::DIM),
                23 => self.flags.remove(AttrFlags::ITALIC),
                24 => self.flags.remove(AttrFlags::UNDERLINE),
                25 => self.flags.remove(AttrFlags::BLINK),
                27 => self.flags.remove(AttrFlags::INVERSE),
                28 => self.flags.remove(AttrFlags::HIDDEN),
                29 => self.flags.remove(AttrFlags::STRIKETHROUGH),
                30..=37 | 40..=47 => {
                    // a following 1 selects the bright variant
                    let code = (p % 10) as u8;
                    let color = if params.get(i) == Some(&1) {
                        i += 1;
                        Color::Bright(code)
                    } else {
                        Color::Normal(code)
                    };
                    if p < 40 {
                        self.fg = color;
                    } else {
                        self.bg = color;
                    }
                }
                38 => {
                    let (color, used) = extended_color(&params[i..]);
                    i += used;
                    if let Some(color) = color {
                        self.fg = color;
                    }
                }
                39 => self.fg = Color::Unset,
                48 => {
                    let (color, used) = extended_color(&params[i..]);
                    i += used;
                    if let Some(color) = color {
                        self.bg = color;
                    }
                }
                49 => self.bg = Color::Unset,
                90..=97 => self.fg = Color::Bright((p - 90) as u8),
                100..=107 => self.bg = Color::Bright((p - 100) as u8),
                _ => {}
            }
        }
    }

    /// Escape sequences selecting this style from a reset state
    pub fn to_sgr(&self) -> String {
        let mut out = String::from("\x1b[0m");
        let codes = [
            (AttrFlags::BOLD, 1),
            (AttrFlags::DIM, 2),
            (AttrFlags::ITALIC, 3),
            (AttrFlags::UNDERLINE, 4),
            (AttrFlags::BLINK, 5),
            (AttrFlags::INVERSE, 7),
            (AttrFlags::HIDDEN, 8),
            (AttrFlags::STRIKETHROUGH, 9),
        ];
        for (flag, code) in codes {
            if self.flags.contains(flag) {
                let _ = write!(out, "\x1b[{}m", code);
            }
        }
        if self.fg != Color::Unset {
            out.push_str(&self.fg.to_sgr(false));
        }
        if self.bg != Color::Unset {
            out.push_str(&self.bg.to_sgr(true));
        }
        out
    }
}

/// Parse the tail of a 38/48 parameter. Returns the color, if complete, and
/// how many parameters were consumed.
fn extended_color(rest: &[u16]) -> (Option<Color>, usize) {
    match rest.first() {
        Some(5) => match rest.get(1) {
            Some(&n) => (Some(Color::Indexed(n.min(255) as u8)), 2),
            None => (None, rest.len()),
        },
        Some(2) => {
            if rest.len() < 4 {
                return (None, rest.len());
            }
            let c = |v: u16| v.min(255) as u8;
            (Some(Color::Rgb(c(rest[1]), c(rest[2]), c(rest[3]))), 4)
        }
        Some(_) => (None, 1),
        None => (None, 0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_packing() {
        let color = Color::from_packed(0x12_34_56);
        assert_eq!(color, Color::Rgb(0x12, 0x34, 0x56));
        assert_eq!(color.code(), 0x12_34_56);
        assert_eq!(color.mode(), ColorMode::Bit24);
    }

    #[test]
    fn test_sgr_reset_is_idempotent() {
        let mut style = Style::default();
        style.apply_sgr(&[1, 31, 44]);
        style.apply_sgr(&[0]);
        assert_eq!(style, Style::default());
        style.apply_sgr(&[0]);
        assert_eq!(style, Style::default());
        style.apply_sgr(&[]);
        assert_eq!(style, Style::default());
    }

    #[test]
    fn test_sgr_colors() {
        let mut style = Style::default();
        style.apply_sgr(&[38, 2, 10, 20, 30, 48, 5, 200]);
        assert_eq!(style.fg, Color::Rgb(10, 20, 30));
        assert_eq!(style.bg, Color::Indexed(200));

        style.apply_sgr(&[92, 41]);
        assert_eq!(style.fg, Color::Bright(2));
        assert_eq!(style.bg, Color::Normal(1));

        style.apply_sgr(&[39, 49]);
        assert_eq!(style.fg, Color::Unset);
        assert_eq!(style.bg, Color::Unset);
    }

    #[test]
    fn test_sgr_bright_sub_parameter() {
        let mut style = Style::default();
        style.apply_sgr(&[31, 1]);
        assert_eq!(style.fg, Color::Bright(1));
        assert!(!style.flags.contains(AttrFlags::BOLD));
    }

    #[test]
    fn test_sgr_truncated_extended_color() {
        let mut style = Style::default();
        style.apply_sgr(&[31]);
        style.apply_sgr(&[38, 5]);
        assert_eq!(style.fg, Color::Normal(1));
        style.apply_sgr(&[38, 2, 1, 2]);
        assert_eq!(style.fg, Color::Normal(1));
        assert!(style.flags.is_empty());
    }

    #[test]
    fn test_sgr_attributes() {
        let mut style = Style::default();
        style.apply_sgr(&[1, 3, 4, 7, 9]);
        assert!(style.flags.contains(AttrFlags::BOLD | AttrFlags::ITALIC | AttrFlags::UNDERLINE));
        assert!(style.flags.contains(AttrFlags::INVERSE | AttrFlags::STRIKETHROUGH));
        style.apply_sgr(&[22, 24, 27]);
        assert_eq!(style.flags, AttrFlags::ITALIC | AttrFlags::STRIKETHROUGH);
    }

    #[test]
    fn test_color_to_sgr() {
        assert_eq!(Color::Unset.to_sgr(false), "\x1b[39m");
        assert_eq!(Color::Unset.to_sgr(true), "\x1b[49m");
        assert_eq!(Color::Normal(1).to_sgr(false), "\x1b[31m");
        assert_eq!(Color::Bright(4).to_sgr(true), "\x1b[104m");
        assert_eq!(Color::Indexed(208).to_sgr(false), "\x1b[38;5;208m");
        assert_eq!(Color::Rgb(1, 2, 3).to_sgr(true), "\x1b[48;2;1;2;3m");
    }

    #[test]
    fn test_reset_keeps_hyperlink() {
        let mut style = Style {
            link: Some(Arc::new(Hyperlink { url: "http://x".into(), id: String::new() })),
            ..Style::default()
        };
        style.apply_sgr(&[1, 0]);
        assert!(style.link.is_some());
        assert!(style.flags.is_empty());
    }
}
