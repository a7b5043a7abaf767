//! Terminal emulation engine.
//!
//! ```text
//! bytes ─► decoder::Decoder ─► Sequence ─► Terminal::apply (dispatch)
//!                                              │
//!                      state::Terminal ◄───────┘
//!                      ├── grid::Screen ×2 (primary / alternate)
//!                      ├── grid::Scrollback
//!                      ├── style::Style (cursor pen)
//!                      └── charset::Charsets
//! ```

pub mod charset;
pub mod decoder;
mod dispatch;
pub mod grid;
pub mod osc;
pub mod state;
pub mod style;

pub use decoder::{Decoder, Parser, Sequence};
pub use grid::{Cell, Row, Screen, Scrollback};
pub use state::{
    ActiveScreen, CursorInfo, CursorShape, Modes, Response, Surface, TermEvent, Terminal,
    TerminalOptions,
};
pub use style::{AttrFlags, Color, ColorMode, Hyperlink, Style};
