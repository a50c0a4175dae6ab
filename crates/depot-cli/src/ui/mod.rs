//! Terminal output
//!
//! Colors, icons and column widths shared by every command.

pub mod list;

use crossterm::style::{Color, Stylize};

/// Visual constants for depot output.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: Color,
    pub version: Color,
    pub secondary: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub name_width: usize,
    pub version_width: usize,
    pub hash_width: usize,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            name: Color::Cyan,
            version: Color::White,
            secondary: Color::DarkGrey,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            name_width: 24,
            version_width: 14,
            hash_width: 12,
        }
    }
}

/// Print a completed step: `✓ message`
pub fn success(msg: &str) {
    let theme = Theme::default();
    println!("  {} {msg}", "✓".with(theme.success));
}

/// Print a non-fatal problem: `⚠ message`
pub fn warning(msg: &str) {
    let theme = Theme::default();
    println!("  {} {msg}", "⚠".with(theme.warning));
}

/// Print a failed step: `✗ message`
pub fn failure(msg: &str) {
    let theme = Theme::default();
    println!("  {} {msg}", "✗".with(theme.error));
}

/// Print an informational line in the secondary color.
pub fn info(msg: &str) {
    let theme = Theme::default();
    println!("  {}", msg.with(theme.secondary));
}

/// Human-readable byte count.
pub fn format_size(bytes: u64) -> String {
    let kb = bytes as f64 / 1024.0;
    let mb = kb / 1024.0;
    if mb >= 1024.0 {
        format!("{:.1} GB", mb / 1024.0)
    } else if kb >= 1024.0 {
        format!("{mb:.1} MB")
    } else if kb >= 1.0 {
        format!("{kb:.1} KB")
    } else {
        format!("{bytes} B")
    }
}
