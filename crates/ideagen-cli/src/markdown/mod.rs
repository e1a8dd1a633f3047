//! Markdown rendering for the idea stream
//!
//! The buffer is re-rendered in full on every update, so input is frequently
//! cut off mid-construct. Parsing and rendering are best-effort and never fail.

mod elements;
mod parser;
mod render;

use ratatui::text::Line;

use crate::tui::theme::Theme;

/// Render markdown text to styled lines wrapped to `width`
pub fn render(text: &str, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let elements = parser::parse(text);
    render::render_elements(&elements, width, theme)
}
