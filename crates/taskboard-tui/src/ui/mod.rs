//! Terminal UI module using ratatui.
//!
//! - `render`: Frame layout, header, status bar and overlays
//! - `input`: Keyboard event handling
//! - `styles`: Color scheme and text styling
//! - `views`: Per-route content (home, projects, project detail)

pub mod input;
pub mod render;
pub mod styles;
pub mod views;
