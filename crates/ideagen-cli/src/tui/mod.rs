//! Drawing the idea page

pub mod theme;

use ratatui::layout::{Alignment, Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Padding, Paragraph};
use ratatui::Frame;

use ideagen_core::view::{AUTH_REQUIRED_TEXT, GENERATING_TEXT, LOADING_TEXT};
use ideagen_core::IdeaView;

use crate::markdown;
use theme::Theme;

pub const TITLE: &str = "Business Idea Generator";
const SUBTITLE: &str = "AI-powered innovation at your fingertips";
const KEY_HINTS: &str = "q quit · r refresh · n new idea · ↑↓ scroll";

/// Vertical scroll over the rendered idea
///
/// While `follow` is set the view sticks to the newest text.
#[derive(Debug, Clone)]
pub struct Scroll {
    pub offset: usize,
    pub follow: bool,
}

impl Default for Scroll {
    fn default() -> Self {
        Self {
            offset: 0,
            follow: true,
        }
    }
}

impl Scroll {
    pub fn up(&mut self, lines: usize) {
        self.follow = false;
        self.offset = self.offset.saturating_sub(lines);
    }

    /// Scrolling past the end resumes following
    pub fn down(&mut self, lines: usize) {
        self.offset = self.offset.saturating_add(lines);
    }

    pub fn top(&mut self) {
        self.follow = false;
        self.offset = 0;
    }

    pub fn bottom(&mut self) {
        self.follow = true;
    }

    /// Clamp to the content and return the offset to draw at
    fn resolve(&mut self, total: usize, height: usize) -> usize {
        let max = total.saturating_sub(height);
        if self.offset >= max {
            self.follow = true;
        }
        if self.follow {
            self.offset = max;
        }
        self.offset = self.offset.min(max);
        self.offset
    }
}

pub fn draw(frame: &mut Frame, view: &IdeaView, scroll: &mut Scroll, theme: &Theme) {
    let [header, body, footer] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(3),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(frame, header, theme);
    draw_body(frame, body, view, scroll, theme);

    let hints = Paragraph::new(Line::from(Span::styled(
        KEY_HINTS,
        Style::default().fg(theme.dim_color),
    )))
    .alignment(Alignment::Center);
    frame.render_widget(hints, footer);
}

fn draw_header(frame: &mut Frame, area: Rect, theme: &Theme) {
    let lines = vec![
        Line::from(Span::styled(
            TITLE,
            Style::default()
                .fg(theme.title_color)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(SUBTITLE, Style::default().fg(theme.dim_color))),
    ];
    frame.render_widget(Paragraph::new(lines).alignment(Alignment::Center), area);
}

fn draw_body(frame: &mut Frame, area: Rect, view: &IdeaView, scroll: &mut Scroll, theme: &Theme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border_color))
        .padding(Padding::horizontal(1));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (lines, centered) = body_lines(view, inner.width as usize, theme);
    let paragraph = if centered {
        // Placeholders sit a third of the way down
        let top = (inner.height as usize).saturating_sub(lines.len()) / 3;
        let mut padded = vec![Line::default(); top];
        padded.extend(lines);
        Paragraph::new(padded).alignment(Alignment::Center)
    } else {
        let offset = scroll.resolve(lines.len(), inner.height as usize);
        Paragraph::new(lines).scroll((offset.min(u16::MAX as usize) as u16, 0))
    };
    frame.render_widget(paragraph, inner);
}

/// Lines for the body, and whether they are a centered placeholder
fn body_lines(view: &IdeaView, width: usize, theme: &Theme) -> (Vec<Line<'static>>, bool) {
    let dim = Style::default().fg(theme.dim_color);
    let accent = Style::default().fg(theme.accent_color);
    let error = Style::default().fg(theme.error_color);

    match view {
        IdeaView::Loading => (vec![Line::from(Span::styled(LOADING_TEXT, dim))], true),
        IdeaView::Paywall => (
            vec![
                Line::from(Span::styled(
                    "Choose Your Plan",
                    Style::default()
                        .fg(theme.title_color)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    "Unlock unlimited AI-powered business ideas",
                    Style::default().fg(theme.text_color),
                )),
                Line::default(),
                Line::from(Span::styled(
                    "Subscribe from the web app, then press r to check again.",
                    dim,
                )),
            ],
            true,
        ),
        IdeaView::Generating => (
            vec![Line::from(Span::styled(
                GENERATING_TEXT,
                accent.add_modifier(Modifier::ITALIC),
            ))],
            true,
        ),
        IdeaView::AuthenticationRequired => (
            vec![
                Line::from(Span::styled(AUTH_REQUIRED_TEXT, error)),
                Line::default(),
                Line::from(Span::styled("Sign in again, then press r.", dim)),
            ],
            true,
        ),
        IdeaView::Content(content) => (markdown::render(content, width, theme), false),
        IdeaView::Failed { content, message } => {
            let mut lines = markdown::render(content, width, theme);
            if !lines.is_empty() {
                lines.push(Line::default());
            }
            lines.push(Line::from(Span::styled(format!("Error: {}", message), error)));
            (lines, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(view: &IdeaView, scroll: &mut Scroll) -> String {
        let mut terminal = Terminal::new(TestBackend::new(60, 16)).unwrap();
        let theme = Theme::default();
        terminal.draw(|f| draw(f, view, scroll, &theme)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_placeholders() {
        let mut scroll = Scroll::default();
        assert!(screen(&IdeaView::Loading, &mut scroll).contains(LOADING_TEXT));
        assert!(screen(&IdeaView::Generating, &mut scroll).contains(GENERATING_TEXT));
        assert!(screen(&IdeaView::Paywall, &mut scroll).contains("Choose Your Plan"));
        assert!(screen(&IdeaView::AuthenticationRequired, &mut scroll).contains(AUTH_REQUIRED_TEXT));
        assert!(screen(&IdeaView::Loading, &mut scroll).contains(TITLE));
    }

    #[test]
    fn test_content_and_failure() {
        let mut scroll = Scroll::default();
        let text = screen(&IdeaView::Content("# Idea\n\nSolar kiosks".into()), &mut scroll);
        assert!(text.contains("Idea"));
        assert!(text.contains("Solar kiosks"));

        let failed = IdeaView::Failed {
            content: "partial idea".into(),
            message: "server returned 500".into(),
        };
        let text = screen(&failed, &mut scroll);
        assert!(text.contains("partial idea"));
        assert!(text.contains("Error: server returned 500"));
    }

    #[test]
    fn test_follow_shows_the_tail() {
        let body: String = (1..=40).map(|i| format!("line {}\n\n", i)).collect();
        let mut scroll = Scroll::default();
        let text = screen(&IdeaView::Content(body), &mut scroll);
        assert!(text.contains("line 40"));
        assert!(!text.contains("line 1 "));
        assert!(scroll.follow);

        scroll.top();
        let body: String = (1..=40).map(|i| format!("line {}\n\n", i)).collect();
        let text = screen(&IdeaView::Content(body), &mut scroll);
        assert!(text.contains("line 1 "));
        assert!(!scroll.follow);
    }

    #[test]
    fn test_scroll_resolve_clamps() {
        let mut scroll = Scroll::default();
        scroll.up(5);
        assert!(!scroll.follow);
        assert_eq!(scroll.resolve(10, 20), 0);
        // Content fits, so following resumes
        assert!(scroll.follow);

        let mut scroll = Scroll { offset: 3, follow: false };
        assert_eq!(scroll.resolve(30, 10), 3);
        scroll.down(100);
        assert_eq!(scroll.resolve(30, 10), 20);
        assert!(scroll.follow);
    }
}
