//! User interface rendering and input handling.
//!
//! - **keymapper**: key presses to application byte sequences
//! - **mouse**: mouse events to X10 / UTF-8 / SGR reports
//! - **renderer**: crossterm surface for the replay binary

pub mod keymapper;
pub mod mouse;
pub mod renderer;

pub use keymapper::{Key, KeyInput, KeyMapper, Modifiers};
pub use mouse::{MouseAction, MouseButton, MouseInput};
pub use renderer::Renderer;
