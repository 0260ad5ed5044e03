//! Presentation layer handling terminal UI and user input.
//!
//! This module renders the wizard with ratatui and maps key presses onto
//! application state changes.

pub mod ui;
pub mod input;

pub use ui::*;
pub use input::*;
