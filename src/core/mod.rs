//! Core terminal emulation components.
//!
//! - **term**: byte decoder, style model and VT engine
//! - **session**: engine behind a lock, fed by a background decode thread
//!
//! # Architecture
//!
//! ```text
//! Session
//! ├── decode thread (Decoder over the byte source)
//! ├── Arc<Mutex<Terminal>>
//! │   ├── Screen ×2 (primary / alternate)
//! │   ├── Scrollback
//! │   └── Cursor + Style + Charsets
//! └── notification queue (Redraw, Closed, ...)
//! ```

pub mod session;
pub mod term;
