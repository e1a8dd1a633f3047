//! Append-only content buffer

/// Fragments concatenated in arrival order
///
/// Never reordered, truncated, or deduplicated. Fragments may split markdown
/// (or words) anywhere; no reassembly beyond concatenation happens here.
#[derive(Debug, Clone, Default)]
pub struct ContentBuffer {
    text: String,
    fragments: usize,
}

impl ContentBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, fragment: &str) {
        self.text.push_str(fragment);
        self.fragments += 1;
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Number of fragments appended so far
    pub fn fragment_count(&self) -> usize {
        self.fragments
    }
}
