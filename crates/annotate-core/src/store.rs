//! In-memory comment records backing the sidebar.

use serde::{Deserialize, Serialize};

/// Sidebar text for a highlight with no recorded comment.
pub const NO_COMMENT: &str = "No comment available.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
    /// Matched text; a lookup key, not unique
    pub text: String,
    pub comment: String,
}

/// Append-only list of comment records in insertion order.
#[derive(Debug, Clone, Default)]
pub struct AnnotationStore {
    records: Vec<CommentRecord>,
}

impl AnnotationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a record. Duplicate keys are allowed.
    pub fn record(&mut self, text: impl Into<String>, comment: impl Into<String>) {
        let record = CommentRecord {
            text: text.into(),
            comment: comment.into(),
        };
        tracing::debug!(text = %record.text, "comment recorded");
        self.records.push(record);
    }

    /// First record whose text equals `text` exactly.
    pub fn lookup(&self, text: &str) -> Option<&CommentRecord> {
        self.records.iter().find(|r| r.text == text)
    }

    /// Comment to display for `text`, or [`NO_COMMENT`].
    pub fn comment_for(&self, text: &str) -> &str {
        self.lookup(text)
            .map(|r| r.comment.as_str())
            .unwrap_or(NO_COMMENT)
    }

    pub fn list(&self) -> &[CommentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
