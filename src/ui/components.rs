// Small layout and styling helpers shared by the renderer

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Color,
};

use crate::client::validate_url;

const SPINNER_FRAMES: [&str; 8] = ["⣷", "⣯", "⣟", "⡿", "⢿", "⣻", "⣽", "⣾"];

/// Helper function to create a centered rectangle for popups
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Border color for the URL field: gray when empty, green/red by validity
pub fn validation_color(input: &str) -> Color {
    if input.trim().is_empty() {
        Color::Gray
    } else if validate_url(input) {
        Color::Green
    } else {
        Color::Red
    }
}

/// Spinner glyph for a point in time, advancing every 100ms
pub fn spinner_frame(millis: u128) -> &'static str {
    SPINNER_FRAMES[(millis / 100) as usize % SPINNER_FRAMES.len()]
}
