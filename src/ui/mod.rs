//! Terminal UI module using ratatui.
//!
//! This module provides the TUI rendering and input handling:
//!
//! - `layout`: Shared header and footer, driven by the authentication state
//! - `render`: Main frame rendering, login form, profile view and overlays
//! - `input`: Keyboard event handling
//! - `styles`: Color schemes and text styling

pub mod input;
pub mod layout;
pub mod render;
pub mod styles;
