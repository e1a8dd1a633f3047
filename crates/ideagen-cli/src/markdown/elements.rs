//! Markdown element types

/// Block-level markdown elements
#[derive(Debug, Clone, PartialEq)]
pub enum MarkdownElement {
    /// Regular paragraph with inline content
    Paragraph(Vec<InlineContent>),
    /// Heading with level (1-6) and content
    Heading {
        level: u8,
        content: Vec<InlineContent>,
    },
    /// Fenced or indented code block with optional language
    CodeBlock { lang: Option<String>, code: String },
    /// Block quote containing nested elements
    BlockQuote(Vec<MarkdownElement>),
    /// List (ordered or unordered)
    List {
        start: Option<u64>,
        items: Vec<ListItem>,
    },
    /// Table with headers and rows
    Table {
        headers: Vec<TableCell>,
        rows: Vec<Vec<TableCell>>,
    },
    /// Horizontal rule / thematic break
    ThematicBreak,
}

/// A list item containing block elements
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<MarkdownElement>,
    pub checked: Option<bool>,
}

/// A table cell containing inline content
#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub content: Vec<InlineContent>,
}

/// Inline markdown content (text formatting)
#[derive(Debug, Clone, PartialEq)]
pub enum InlineContent {
    Text(String),
    Bold(Vec<InlineContent>),
    Italic(Vec<InlineContent>),
    Strikethrough(Vec<InlineContent>),
    Code(String),
    Link {
        text: Vec<InlineContent>,
        url: String,
    },
    /// Line break; source newlines inside a paragraph are kept as breaks
    Break,
}

impl InlineContent {
    /// Plain text of this item, without styling
    pub fn plain_text(&self) -> String {
        match self {
            InlineContent::Text(text) | InlineContent::Code(text) => text.clone(),
            InlineContent::Bold(inner)
            | InlineContent::Italic(inner)
            | InlineContent::Strikethrough(inner)
            | InlineContent::Link { text: inner, .. } => {
                inner.iter().map(InlineContent::plain_text).collect()
            }
            InlineContent::Break => "\n".to_string(),
        }
    }
}
