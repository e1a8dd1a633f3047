//! Markdown parsing using pulldown-cmark
//!
//! Input is often a half-received stream, so nothing here assumes that a
//! construct is closed; pulldown-cmark closes open blocks at end of input.

use once_cell::sync::Lazy;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use regex::Regex;

use super::elements::{InlineContent, ListItem, MarkdownElement, TableCell};

/// Regex for detecting bare URLs in text
static URL_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"https?://[^\s<>\[\]()]+").unwrap());

/// Parse markdown text into structured elements
pub fn parse(text: &str) -> Vec<MarkdownElement> {
    let options =
        Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;

    let events: Vec<_> = Parser::new_ext(text, options).collect();
    parse_events(&events)
}

fn parse_events(events: &[Event<'_>]) -> Vec<MarkdownElement> {
    let mut elements = Vec::new();
    let mut idx = 0;

    while idx < events.len() {
        match &events[idx] {
            Event::Start(Tag::Paragraph) => {
                let (content, new_idx) = parse_inline(events, idx + 1, Some(TagEnd::Paragraph));
                if !content.is_empty() {
                    elements.push(MarkdownElement::Paragraph(content));
                }
                idx = new_idx;
            }
            Event::Start(Tag::Heading { level, .. }) => {
                let (content, new_idx) = parse_inline(events, idx + 1, Some(TagEnd::Heading(*level)));
                elements.push(MarkdownElement::Heading {
                    level: *level as u8,
                    content,
                });
                idx = new_idx;
            }
            Event::Start(Tag::CodeBlock(kind)) => {
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                    _ => None,
                };
                let (code, new_idx) = collect_code_block(events, idx + 1);
                elements.push(MarkdownElement::CodeBlock { lang, code });
                idx = new_idx;
            }
            Event::Start(Tag::BlockQuote(_)) => {
                let (nested, new_idx) = parse_block_quote(events, idx + 1);
                elements.push(MarkdownElement::BlockQuote(nested));
                idx = new_idx;
            }
            Event::Start(Tag::List(start)) => {
                let (items, new_idx) = parse_list_items(events, idx + 1);
                elements.push(MarkdownElement::List {
                    start: *start,
                    items,
                });
                idx = new_idx;
            }
            Event::Start(Tag::Table(_)) => {
                let (headers, rows, new_idx) = parse_table(events, idx + 1);
                elements.push(MarkdownElement::Table { headers, rows });
                idx = new_idx;
            }
            Event::Rule => {
                elements.push(MarkdownElement::ThematicBreak);
                idx += 1;
            }
            // Tight list items are not wrapped in paragraphs
            Event::Text(_)
            | Event::Code(_)
            | Event::InlineHtml(_)
            | Event::SoftBreak
            | Event::HardBreak
            | Event::Start(Tag::Strong)
            | Event::Start(Tag::Emphasis)
            | Event::Start(Tag::Strikethrough)
            | Event::Start(Tag::Link { .. }) => {
                let (content, new_idx) = parse_inline(events, idx, None);
                if !content.is_empty() {
                    elements.push(MarkdownElement::Paragraph(content));
                }
                // Always make progress, even on a stray end tag
                idx = new_idx.max(idx + 1);
            }
            _ => {
                idx += 1;
            }
        }
    }

    elements
}

/// Collect inline content until `end_tag`, or until the first block-level
/// event when `end_tag` is `None`
fn parse_inline(
    events: &[Event<'_>],
    start: usize,
    end_tag: Option<TagEnd>,
) -> (Vec<InlineContent>, usize) {
    let mut content = Vec::new();
    let mut idx = start;
    let mut style_stack: Vec<InlineStyle> = Vec::new();

    while idx < events.len() {
        match &events[idx] {
            Event::End(tag) if Some(*tag) == end_tag => {
                return (content, idx + 1);
            }
            Event::Text(text) => {
                for inline in autolink_text(text) {
                    push_with_styles(&mut content, inline, &style_stack);
                }
            }
            Event::InlineHtml(html) => {
                let inline = InlineContent::Text(html.to_string());
                push_with_styles(&mut content, inline, &style_stack);
            }
            Event::Code(code) => {
                let inline = InlineContent::Code(code.to_string());
                push_with_styles(&mut content, inline, &style_stack);
            }
            Event::Start(Tag::Strong) => style_stack.push(InlineStyle::Bold),
            Event::Start(Tag::Emphasis) => style_stack.push(InlineStyle::Italic),
            Event::Start(Tag::Strikethrough) => style_stack.push(InlineStyle::Strikethrough),
            Event::End(TagEnd::Strong | TagEnd::Emphasis | TagEnd::Strikethrough) => {
                style_stack.pop();
            }
            Event::Start(Tag::Link { dest_url, .. }) => {
                let url = dest_url.to_string();
                let (text, new_idx) = parse_inline(events, idx + 1, Some(TagEnd::Link));
                push_with_styles(&mut content, InlineContent::Link { text, url }, &style_stack);
                idx = new_idx;
                continue;
            }
            Event::SoftBreak | Event::HardBreak => {
                content.push(InlineContent::Break);
            }
            // Loose content stops at the first block-level event
            _ if end_tag.is_none() => break,
            _ => {}
        }
        idx += 1;
    }

    (content, idx)
}

#[derive(Clone, Copy)]
enum InlineStyle {
    Bold,
    Italic,
    Strikethrough,
}

fn push_with_styles(content: &mut Vec<InlineContent>, item: InlineContent, styles: &[InlineStyle]) {
    let mut result = item;
    for style in styles.iter().rev() {
        result = match style {
            InlineStyle::Bold => InlineContent::Bold(vec![result]),
            InlineStyle::Italic => InlineContent::Italic(vec![result]),
            InlineStyle::Strikethrough => InlineContent::Strikethrough(vec![result]),
        };
    }
    content.push(result);
}

/// Convert text containing bare URLs into a mix of Text and Link nodes
fn autolink_text(text: &str) -> Vec<InlineContent> {
    let mut result = Vec::new();
    let mut last_end = 0;

    for mat in URL_REGEX.find_iter(text) {
        if mat.start() > last_end {
            result.push(InlineContent::Text(text[last_end..mat.start()].to_string()));
        }
        let url = mat.as_str().to_string();
        result.push(InlineContent::Link {
            text: vec![InlineContent::Text(url.clone())],
            url,
        });
        last_end = mat.end();
    }

    if last_end < text.len() || result.is_empty() {
        result.push(InlineContent::Text(text[last_end..].to_string()));
    }

    result
}

fn collect_code_block(events: &[Event<'_>], start: usize) -> (String, usize) {
    let mut code = String::new();

    for (offset, event) in events[start..].iter().enumerate() {
        match event {
            Event::End(TagEnd::CodeBlock) => return (code, start + offset + 1),
            Event::Text(text) => code.push_str(text),
            _ => {}
        }
    }

    (code, events.len())
}

fn parse_block_quote(events: &[Event<'_>], start: usize) -> (Vec<MarkdownElement>, usize) {
    let mut depth = 1;

    for (offset, event) in events[start..].iter().enumerate() {
        match event {
            Event::Start(Tag::BlockQuote(_)) => depth += 1,
            Event::End(TagEnd::BlockQuote(_)) => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset;
                    return (parse_events(&events[start..end]), end + 1);
                }
            }
            _ => {}
        }
    }

    (parse_events(&events[start..]), events.len())
}

fn parse_list_items(events: &[Event<'_>], start: usize) -> (Vec<ListItem>, usize) {
    let mut items = Vec::new();
    let mut idx = start;

    while idx < events.len() {
        match &events[idx] {
            Event::End(TagEnd::List(_)) => {
                return (items, idx + 1);
            }
            Event::Start(Tag::Item) => {
                let (item, new_idx) = parse_list_item(events, idx + 1);
                items.push(item);
                idx = new_idx;
            }
            _ => {
                idx += 1;
            }
        }
    }

    (items, idx)
}

fn parse_list_item(events: &[Event<'_>], start: usize) -> (ListItem, usize) {
    let mut nested_events = Vec::new();
    let mut checked = None;
    let mut depth = 1;
    let mut idx = start;

    while idx < events.len() {
        match &events[idx] {
            Event::Start(Tag::Item) => {
                depth += 1;
                nested_events.push(events[idx].clone());
            }
            Event::End(TagEnd::Item) => {
                depth -= 1;
                if depth == 0 {
                    let content = parse_events(&nested_events);
                    return (ListItem { content, checked }, idx + 1);
                }
                nested_events.push(events[idx].clone());
            }
            Event::TaskListMarker(is_checked) if depth == 1 => {
                checked = Some(*is_checked);
            }
            _ => nested_events.push(events[idx].clone()),
        }
        idx += 1;
    }

    let content = parse_events(&nested_events);
    (ListItem { content, checked }, idx)
}

fn parse_table(events: &[Event<'_>], start: usize) -> (Vec<TableCell>, Vec<Vec<TableCell>>, usize) {
    let mut headers = Vec::new();
    let mut rows = Vec::new();
    let mut current_row: Vec<TableCell> = Vec::new();
    let mut idx = start;

    while idx < events.len() {
        match &events[idx] {
            Event::End(TagEnd::Table) => {
                return (headers, rows, idx + 1);
            }
            // Header cells sit directly inside the head, without a row
            Event::End(TagEnd::TableHead) => {
                headers = std::mem::take(&mut current_row);
            }
            Event::Start(Tag::TableRow) => {
                current_row.clear();
            }
            Event::End(TagEnd::TableRow) => {
                rows.push(std::mem::take(&mut current_row));
            }
            Event::Start(Tag::TableCell) => {
                let (content, new_idx) = parse_inline(events, idx + 1, Some(TagEnd::TableCell));
                current_row.push(TableCell { content });
                idx = new_idx;
                continue;
            }
            _ => {}
        }
        idx += 1;
    }

    (headers, rows, idx)
}
