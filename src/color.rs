//! Narrow interface to the color subsystem.
//!
//! The help renderer only needs two things from the outside world: a named
//! color looked up as an ANSI escape string, and a way to measure the
//! *visible* width of text that may contain escape sequences. Stripping is
//! delegated to `console`; width measurement is Unicode-aware.

use std::borrow::Cow;

use unicode_width::UnicodeWidthStr;

/// Resets all active SGR attributes.
pub const RESET: &str = "\x1b[0m";

/// What to do when a color name is not recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnknownColor {
    /// Return an empty string (no escape emitted).
    Empty,
    /// Surface the unknown name to the caller.
    Error,
}

/// Looks up a color name as an ANSI foreground escape string.
///
/// Names are matched case-insensitively and ignore spaces, hyphens, and
/// underscores, so `"LightRed"`, `"light red"`, and `"light-red"` are the
/// same color. `"reset"`/`"rst"` map to the SGR reset.
pub fn color_code(name: &str, policy: UnknownColor) -> Result<String, String> {
    let key: String = name
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    let code = match key.as_str() {
        "reset" | "rst" => return Ok(RESET.to_string()),
        "black" => 30,
        "red" | "r" => 31,
        "green" | "g" => 32,
        "yellow" | "y" => 33,
        "blue" | "b" => 34,
        "magenta" | "m" => 35,
        "cyan" | "c" => 36,
        "white" | "w" => 37,
        "grey" | "gray" | "lightblack" => 90,
        "lightred" | "lr" => 91,
        "lightgreen" | "lg" => 92,
        "lightyellow" | "ly" => 93,
        "lightblue" | "lb" => 94,
        "lightmagenta" | "lm" => 95,
        "lightcyan" | "lc" => 96,
        "lightwhite" | "lw" => 97,
        _ => {
            return match policy {
                UnknownColor::Empty => Ok(String::new()),
                UnknownColor::Error => Err(format!("unknown color name: {name}")),
            }
        }
    };
    Ok(format!("\x1b[{code}m"))
}

/// Infallible lookup used by the help renderer: unknown names render as
/// no color at all.
pub fn code(name: &str) -> String {
    color_code(name, UnknownColor::Empty).unwrap_or_default()
}

/// Removes ANSI escape sequences, leaving only visible text.
pub fn strip(text: &str) -> Cow<'_, str> {
    console::strip_ansi_codes(text)
}

/// Visible terminal width of `text`, escapes excluded.
pub fn visible_width(text: &str) -> usize {
    strip(text).width()
}
