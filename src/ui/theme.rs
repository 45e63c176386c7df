//! Visual theme and styling.

use console::Style;

/// Styles used for command output.
#[derive(Debug, Clone)]
pub struct ModGraphTheme {
    /// Resolved modules and success messages (green).
    pub success: Style,
    /// Unresolved modules and warnings (orange).
    pub warning: Style,
    /// Errors (red bold).
    pub error: Style,
    /// Secondary text such as ids and locations.
    pub dim: Style,
    /// Module names (bold).
    pub highlight: Style,
    /// Section headers (magenta bold).
    pub header: Style,
    /// Labels in key-value displays (bold).
    pub key: Style,
}

impl Default for ModGraphTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl ModGraphTheme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            warning: Style::new().color256(208),
            error: Style::new().red().bold(),
            dim: Style::new().dim(),
            highlight: Style::new().bold(),
            header: Style::new().bold().magenta(),
            key: Style::new().bold(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            warning: Style::new(),
            error: Style::new(),
            dim: Style::new(),
            highlight: Style::new(),
            header: Style::new(),
            key: Style::new(),
        }
    }

    pub fn format_success(&self, msg: &str) -> String {
        format!("{}", self.success.apply_to(format!("✓ {}", msg)))
    }

    pub fn format_warning(&self, msg: &str) -> String {
        format!("{}", self.warning.apply_to(format!("⚠ {}", msg)))
    }

    pub fn format_error(&self, msg: &str) -> String {
        format!("{}", self.error.apply_to(format!("✗ {}", msg)))
    }

    pub fn format_header(&self, title: &str) -> String {
        format!("{}", self.header.apply_to(title))
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    // https://no-color.org/
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn theme_formats_success() {
        let msg = ModGraphTheme::plain().format_success("Complete");
        assert_eq!(msg, "✓ Complete");
    }

    #[test]
    fn theme_formats_warning_and_error() {
        let theme = ModGraphTheme::plain();
        assert!(theme.format_warning("Caution").starts_with('⚠'));
        assert!(theme.format_error("Failed").starts_with('✗'));
    }

    #[test]
    fn plain_header_is_unstyled() {
        assert_eq!(ModGraphTheme::plain().format_header("Modules"), "Modules");
    }
}
