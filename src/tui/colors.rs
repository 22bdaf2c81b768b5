//! Color constants for the terminal user interface.

use ratatui::style::Color;

use crate::fields::Quadrant;

/// Do First
pub const DO_RED: Color = Color::Rgb(178, 34, 34);
/// Schedule
pub const SCHEDULE_GREEN: Color = Color::Rgb(0, 110, 60);
/// Delegate
pub const DELEGATE_GOLD: Color = Color::Rgb(255, 215, 0);
/// Eliminate
pub const ELIMINATE_GREY: Color = Color::Rgb(110, 110, 120);
/// Overload advisory and destructive confirmations.
pub const WARN_RED: Color = Color::Rgb(114, 0, 0);

/// Accent color of a quadrant.
pub fn quadrant_color(q: Quadrant) -> Color {
    match q {
        Quadrant::Q1 => DO_RED,
        Quadrant::Q2 => SCHEDULE_GREEN,
        Quadrant::Q3 => DELEGATE_GOLD,
        Quadrant::Q4 => ELIMINATE_GREY,
    }
}

/// Readable text color on top of `bg`.
pub fn text_on(bg: Color) -> Color {
    match bg {
        DELEGATE_GOLD => Color::Rgb(20, 20, 20),
        _ => Color::White,
    }
}
