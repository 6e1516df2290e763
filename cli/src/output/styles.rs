//! Colors for progress lines, record listings and errors.

use owo_colors::Style;

/// Stylesheet; every style is plain until [`Styles::colorize`] runs.
#[derive(Default, Clone)]
pub struct Styles {
    /// Success messages (green)
    pub success: Style,
    /// Tolerated step failures (yellow)
    pub warning: Style,
    /// Error messages (red)
    pub error: Style,
    /// Step arrows and info lines (cyan)
    pub info: Style,
    /// Keys in record listings
    pub dim: Style,
    /// Section titles such as a record's handle
    pub header: Style,
}

impl Styles {
    /// Apply colors to the stylesheet.
    pub fn colorize(&mut self) {
        self.success = Style::new().green();
        self.warning = Style::new().yellow();
        self.error = Style::new().red();
        self.info = Style::new().cyan();
        self.dim = Style::new().dimmed();
        self.header = Style::new().bold().cyan();
    }
}
