//! Terminal output.
//!
//! This module provides:
//! - [`UserInterface`] trait for UI abstraction
//! - [`TerminalUI`] for real runs
//! - [`MockUI`] for capturing output in tests
//!
//! # Example
//!
//! ```
//! use modgraph::ui::{MockUI, UserInterface};
//!
//! let mut ui = MockUI::new();
//! ui.success("resolved");
//! assert_eq!(ui.successes(), ["resolved"]);
//! ```

pub mod mock;
pub mod output;
pub mod terminal;
pub mod theme;

pub use mock::MockUI;
pub use output::OutputMode;
pub use terminal::{create_ui, TerminalUI};
pub use theme::{should_use_colors, ModGraphTheme};

/// Trait for user interface interactions.
///
/// This trait allows mocking the UI in tests.
pub trait UserInterface {
    /// Get the current output mode.
    fn output_mode(&self) -> OutputMode;

    /// Change the output mode.
    fn set_output_mode(&mut self, mode: OutputMode);

    /// Display a message to the user.
    fn message(&mut self, msg: &str);

    /// Display a success message.
    fn success(&mut self, msg: &str);

    /// Display a warning message.
    fn warning(&mut self, msg: &str);

    /// Display an error message.
    fn error(&mut self, msg: &str);

    /// Show a section header.
    fn show_header(&mut self, title: &str);

    /// Print machine-readable output. Never suppressed by the output mode.
    fn data(&mut self, text: &str);

    /// The theme used to style output.
    fn theme(&self) -> ModGraphTheme {
        ModGraphTheme::plain()
    }
}
