//! muxterm - virtual terminal core
//!
//! Decodes a child process's output into screen state and encodes host
//! keyboard and mouse input back into the bytes the child expects.
//!
//! - [`core::term`]: byte decoder, style model and VT engine
//! - [`core::session`]: background decoding with UI notifications
//! - [`ui`]: input encoding and a crossterm renderer
//! - [`config`]: `~/.muxterm/config.toml`

pub mod config;
pub mod core;
pub mod ui;
