//! Markdown elements to wrapped, styled lines

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use super::elements::{InlineContent, MarkdownElement, TableCell};
use crate::tui::theme::Theme;

/// Narrowest width anything is wrapped to
const MIN_WIDTH: usize = 8;

/// A run of styled text, or a forced line break
enum Segment {
    Text(String, Style),
    Break,
}

pub fn render_elements(elements: &[MarkdownElement], width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    render_blocks(elements, width.max(MIN_WIDTH), theme, true, &mut lines);
    lines
}

/// Render blocks, separated by a blank line when `gap` is set
fn render_blocks(
    elements: &[MarkdownElement],
    width: usize,
    theme: &Theme,
    gap: bool,
    lines: &mut Vec<Line<'static>>,
) {
    for (i, element) in elements.iter().enumerate() {
        if gap && i > 0 {
            lines.push(Line::default());
        }
        render_element(element, width, theme, lines);
    }
}

fn render_element(element: &MarkdownElement, width: usize, theme: &Theme, lines: &mut Vec<Line<'static>>) {
    let text_style = Style::default().fg(theme.text_color);

    match element {
        MarkdownElement::Paragraph(content) => {
            lines.extend(wrap_inline(content, text_style, width, theme));
        }
        MarkdownElement::Heading { level, content } => {
            let mut style = Style::default()
                .fg(theme.title_color)
                .add_modifier(Modifier::BOLD);
            if *level <= 2 {
                style = style.add_modifier(Modifier::UNDERLINED);
            }
            lines.extend(wrap_inline(content, style, width, theme));
        }
        MarkdownElement::CodeBlock { lang, code } => {
            if let Some(lang) = lang {
                lines.push(Line::from(Span::styled(
                    lang.clone(),
                    Style::default().fg(theme.dim_color),
                )));
            }
            let style = Style::default()
                .fg(theme.accent_color)
                .bg(theme.code_bg_color);
            for line in code.trim_end_matches('\n').lines() {
                lines.push(Line::from(Span::styled(format!("  {}", line), style)));
            }
        }
        MarkdownElement::BlockQuote(nested) => {
            let mut inner = Vec::new();
            render_blocks(nested, width.saturating_sub(2).max(MIN_WIDTH), theme, true, &mut inner);
            let bar = Style::default().fg(theme.quote_color);
            lines.extend(prefixed(inner, "│ ", "│ ", bar));
        }
        MarkdownElement::List { start, items } => {
            for (i, item) in items.iter().enumerate() {
                let mut marker = match start {
                    Some(n) => format!("{}. ", n + i as u64),
                    None => "• ".to_string(),
                };
                match item.checked {
                    Some(true) => marker.push_str("[x] "),
                    Some(false) => marker.push_str("[ ] "),
                    None => {}
                }
                let marker_width = UnicodeWidthStr::width(marker.as_str());
                let indent = " ".repeat(marker_width);

                let mut inner = Vec::new();
                render_blocks(
                    &item.content,
                    width.saturating_sub(marker_width).max(MIN_WIDTH),
                    theme,
                    false,
                    &mut inner,
                );
                if inner.is_empty() {
                    inner.push(Line::default());
                }
                let marker_style = Style::default().fg(theme.accent_color);
                lines.extend(prefixed(inner, &marker, &indent, marker_style));
            }
        }
        MarkdownElement::Table { headers, rows } => {
            render_table(headers, rows, width, theme, lines);
        }
        MarkdownElement::ThematicBreak => {
            lines.push(Line::from(Span::styled(
                "─".repeat(width),
                Style::default().fg(theme.dim_color),
            )));
        }
    }
}

/// Prefix the first line with `first` and the rest with `rest`
fn prefixed(inner: Vec<Line<'static>>, first: &str, rest: &str, style: Style) -> Vec<Line<'static>> {
    inner
        .into_iter()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { first } else { rest };
            let mut spans = vec![Span::styled(prefix.to_string(), style)];
            spans.extend(line.spans);
            Line::from(spans)
        })
        .collect()
}

fn wrap_inline(content: &[InlineContent], base: Style, width: usize, theme: &Theme) -> Vec<Line<'static>> {
    let mut segments = Vec::new();
    flatten(content, base, theme, &mut segments);

    let mut lines = Vec::new();
    let mut logical: Vec<(String, Style)> = Vec::new();
    for segment in segments {
        match segment {
            Segment::Text(text, style) => logical.push((text, style)),
            Segment::Break => lines.extend(wrap_spans(&std::mem::take(&mut logical), width)),
        }
    }
    lines.extend(wrap_spans(&logical, width));
    lines
}

fn flatten(content: &[InlineContent], style: Style, theme: &Theme, out: &mut Vec<Segment>) {
    for item in content {
        match item {
            InlineContent::Text(text) => out.push(Segment::Text(text.clone(), style)),
            InlineContent::Bold(inner) => {
                flatten(inner, style.add_modifier(Modifier::BOLD), theme, out)
            }
            InlineContent::Italic(inner) => {
                flatten(inner, style.add_modifier(Modifier::ITALIC), theme, out)
            }
            InlineContent::Strikethrough(inner) => {
                flatten(inner, style.add_modifier(Modifier::CROSSED_OUT), theme, out)
            }
            InlineContent::Code(code) => {
                let code_style = Style::default()
                    .fg(theme.accent_color)
                    .bg(theme.code_bg_color);
                out.push(Segment::Text(code.clone(), code_style));
            }
            InlineContent::Link { text, url } => {
                let link_style = style
                    .fg(theme.link_color)
                    .add_modifier(Modifier::UNDERLINED);
                flatten(text, link_style, theme, out);
                // Terminals without hyperlinks still need the target
                let label: String = text.iter().map(InlineContent::plain_text).collect();
                if label != *url {
                    out.push(Segment::Text(
                        format!(" <{}>", url),
                        Style::default().fg(theme.dim_color),
                    ));
                }
            }
            InlineContent::Break => out.push(Segment::Break),
        }
    }
}

/// Greedy word wrap over styled runs, using display width
fn wrap_spans(runs: &[(String, Style)], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_width = 0usize;

    for (text, style) in runs {
        for token in split_tokens(text) {
            let token_width = UnicodeWidthStr::width(token);
            let is_space = token.chars().all(char::is_whitespace);

            if current_width + token_width > width && current_width > 0 {
                flush(&mut lines, &mut current);
                current_width = 0;
            }
            // Wrapped lines never start with whitespace
            if is_space && current_width == 0 && !lines.is_empty() {
                continue;
            }

            if token_width <= width {
                push_text(&mut current, token, *style);
                current_width += token_width;
                continue;
            }

            // Longer than a whole line: break by character
            for c in token.chars() {
                let char_width = UnicodeWidthChar::width(c).unwrap_or(0);
                if current_width + char_width > width && current_width > 0 {
                    flush(&mut lines, &mut current);
                    current_width = 0;
                }
                let mut buf = [0u8; 4];
                push_text(&mut current, c.encode_utf8(&mut buf), *style);
                current_width += char_width;
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        flush(&mut lines, &mut current);
    }
    lines
}

/// Finish the current line, dropping trailing whitespace
fn flush(lines: &mut Vec<Line<'static>>, current: &mut Vec<Span<'static>>) {
    let mut spans = std::mem::take(current);
    while let Some(last) = spans.last_mut() {
        let trimmed = last.content.trim_end().len();
        if trimmed > 0 {
            last.content.to_mut().truncate(trimmed);
            break;
        }
        spans.pop();
    }
    lines.push(Line::from(spans));
}

/// Split into alternating runs of whitespace and non-whitespace
fn split_tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (idx, c) in text.char_indices() {
        let space = c.is_whitespace();
        if in_space.is_some_and(|s| s != space) {
            tokens.push(&text[start..idx]);
            start = idx;
        }
        in_space = Some(space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }
    tokens
}

/// Append to the last span when the style matches
fn push_text(spans: &mut Vec<Span<'static>>, text: &str, style: Style) {
    if let Some(last) = spans.last_mut() {
        if last.style == style {
            last.content.to_mut().push_str(text);
            return;
        }
    }
    spans.push(Span::styled(text.to_string(), style));
}

fn render_table(
    headers: &[TableCell],
    rows: &[Vec<TableCell>],
    width: usize,
    theme: &Theme,
    lines: &mut Vec<Line<'static>>,
) {
    let text_of = |cell: &TableCell| -> String {
        cell.content
            .iter()
            .map(InlineContent::plain_text)
            .collect::<String>()
            .replace('\n', " ")
    };

    let columns = rows
        .iter()
        .map(Vec::len)
        .chain(std::iter::once(headers.len()))
        .max()
        .unwrap_or(0);
    if columns == 0 {
        return;
    }

    let header_texts: Vec<String> = headers.iter().map(text_of).collect();
    let row_texts: Vec<Vec<String>> = rows
        .iter()
        .map(|row| row.iter().map(text_of).collect())
        .collect();

    let mut widths = vec![1usize; columns];
    for row in std::iter::once(&header_texts).chain(row_texts.iter()) {
        for (col, text) in row.iter().enumerate() {
            widths[col] = widths[col].max(UnicodeWidthStr::width(text.as_str()));
        }
    }

    // Shrink the widest column until the table fits
    let separators = 3 * (columns - 1);
    let available = width.saturating_sub(separators).max(columns);
    while widths.iter().sum::<usize>() > available {
        let Some(widest) = widths.iter_mut().max() else {
            break;
        };
        if *widest <= 1 {
            break;
        }
        *widest -= 1;
    }

    let border = Style::default().fg(theme.dim_color);
    let row_line = |cells: &[String], style: Style| -> Line<'static> {
        let mut spans = Vec::new();
        for (col, col_width) in widths.iter().enumerate() {
            if col > 0 {
                spans.push(Span::styled(" │ ", border));
            }
            let text = cells.get(col).map(String::as_str).unwrap_or("");
            spans.push(Span::styled(fit(text, *col_width), style));
        }
        Line::from(spans)
    };

    let header_style = Style::default()
        .fg(theme.title_color)
        .add_modifier(Modifier::BOLD);
    lines.push(row_line(&header_texts, header_style));

    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    lines.push(Line::from(Span::styled(rule.join("─┼─"), border)));

    let text_style = Style::default().fg(theme.text_color);
    for row in &row_texts {
        lines.push(row_line(row, text_style));
    }
}

/// Pad or truncate (with an ellipsis) to exactly `width` columns
fn fit(text: &str, width: usize) -> String {
    let text_width = UnicodeWidthStr::width(text);
    if text_width <= width {
        return format!("{}{}", text, " ".repeat(width - text_width));
    }

    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let char_width = UnicodeWidthChar::width(c).unwrap_or(0);
        if used + char_width + 1 > width {
            break;
        }
        out.push(c);
        used += char_width;
    }
    out.push('…');
    used += 1;
    out.push_str(&" ".repeat(width.saturating_sub(used)));
    out
}
