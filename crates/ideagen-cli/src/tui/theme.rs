//! Colors for the idea page

use ratatui::style::Color;

#[derive(Debug, Clone)]
pub struct Theme {
    pub border_color: Color,
    pub title_color: Color,
    pub accent_color: Color,
    pub text_color: Color,
    pub dim_color: Color,
    pub error_color: Color,
    pub code_bg_color: Color,
    pub link_color: Color,
    pub quote_color: Color,
}

impl Default for Theme {
    fn default() -> Self {
        // Blue to indigo, matching the web page's gradient
        Self {
            border_color: Color::Rgb(99, 102, 241),
            title_color: Color::Rgb(37, 99, 235),
            accent_color: Color::Rgb(129, 140, 248),
            text_color: Color::Rgb(209, 213, 219),
            dim_color: Color::Rgb(156, 163, 175),
            error_color: Color::Rgb(248, 113, 113),
            code_bg_color: Color::Rgb(31, 41, 55),
            link_color: Color::Rgb(96, 165, 250),
            quote_color: Color::Rgb(165, 180, 252),
        }
    }
}
