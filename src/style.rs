//! Terminal styling utilities
//!
//! Semantic colours for status messages. Device data lines (names, CSV,
//! JSON) are never styled so they stay safe to parse. Colour output is
//! switched off by the binary when stdout is not a terminal.

use crossterm::style::Stylize;

/// Extension trait for consistent status styling
///
/// # Examples
///
/// ```
/// use audioswitch::style::SwitchStyle;
///
/// println!("{}", "output audio device set to \"Speakers\"".success());
/// println!("{}", "Nothing was changed.".error());
/// ```
pub trait SwitchStyle: Stylize {
    /// Completed state changes (green)
    fn success(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.green()
    }

    /// Failed operations (red)
    fn error(self) -> <Self as Stylize>::Styled
    where
        Self: Sized,
    {
        self.red()
    }
}

impl<T: Stylize> SwitchStyle for T {}

/// Enable or disable ANSI colours for everything styled through this module
pub fn set_color_enabled(enabled: bool) {
    crossterm::style::force_color_output(enabled);
}
