//! Request path tokenization.
//!
//! # Responsibilities
//! - Split a request path into non-empty segments
//! - Track the read cursor shared by every dispatch step
//! - Reassemble consumed and remaining segments for URL reconstruction
//!
//! # Design Decisions
//! - No percent-decoding or normalization; the transport hands us decoded paths
//! - Segments are immutable once split, only the cursor moves
//! - The cursor never exceeds the segment count

/// Ordered path segments plus a read cursor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenList {
    tokens: Vec<String>,
    idx: usize,
}

impl TokenList {
    /// Split `path` on `/`, dropping empty segments.
    pub fn new(path: &str) -> Self {
        Self {
            tokens: path
                .split('/')
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
            idx: 0,
        }
    }

    /// Total number of segments.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Current cursor position.
    pub fn index(&self) -> usize {
        self.idx
    }

    pub fn has_more(&self) -> bool {
        self.idx < self.tokens.len()
    }

    /// Number of segments not consumed yet.
    pub fn remaining(&self) -> usize {
        self.tokens.len() - self.idx
    }

    /// Next segment without consuming it.
    pub fn peek(&self) -> Option<&str> {
        self.tokens.get(self.idx).map(String::as_str)
    }

    /// Consume and return the next segment.
    pub fn next_token(&mut self) -> Option<&str> {
        let token = self.tokens.get(self.idx)?;
        self.idx += 1;
        Some(token.as_str())
    }

    /// Consume the next segment if it parses as an integer.
    pub fn next_as_int(&mut self) -> Option<i64> {
        let value = self.peek()?.parse().ok()?;
        self.idx += 1;
        Some(value)
    }

    /// Step the cursor back by one and return the segment now under it.
    pub fn prev(&mut self) -> Option<&str> {
        if self.idx == 0 {
            return None;
        }
        self.idx -= 1;
        self.tokens.get(self.idx).map(String::as_str)
    }

    /// Move the cursor to `idx`, clamped to the segment count.
    pub fn reset_to(&mut self, idx: usize) {
        self.idx = idx.min(self.tokens.len());
    }

    /// Segments already consumed.
    pub fn consumed(&self) -> &[String] {
        &self.tokens[..self.idx]
    }

    /// Consumed segments as a `/`-prefixed path (`""` when nothing was consumed).
    pub fn assemble_consumed_path(&self) -> String {
        self.consumed().iter().map(|t| format!("/{t}")).collect()
    }

    /// Remaining segments joined by `/`.
    pub fn assemble_rest_of_path(&self) -> String {
        self.tokens[self.idx..].join("/")
    }
}
