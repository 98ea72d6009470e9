//! Renderer-supplied text index and the whole-word matcher used by
//! highlight and underline.
//!
//! The renderer reports each painted page as a [`PageLayer`]: where the page
//! sits inside the document container and the positioned text fragments it
//! exposes for selection. Matching runs against this index instead of the live
//! presentation nodes, so annotation logic never depends on renderer markup.

use crate::geometry::{Point, Rect, Size};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stable handle to one rendered text fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FragmentId {
    /// 1-based page number
    pub page: u32,
    /// Position of the fragment within the page's text layer
    pub index: u32,
}

impl FragmentId {
    pub const fn new(page: u32, index: u32) -> Self {
        Self { page, index }
    }
}

/// One discrete span of rendered text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    /// Bounds relative to the page's top-left corner
    pub rect: Rect,
}

impl Fragment {
    pub fn new(text: impl Into<String>, rect: Rect) -> Self {
        Self {
            text: text.into(),
            rect,
        }
    }
}

/// Text layer of a single rendered page.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageLayer {
    /// Top-left corner of the page inside the document container
    pub origin: Point,
    pub size: Size,
    pub fragments: Vec<Fragment>,
}

#[derive(Debug, Clone, Default)]
pub struct TextLayer {
    pages: BTreeMap<u32, PageLayer>,
}

impl TextLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index (or re-index) a page. Replaces any fragments previously reported
    /// for the same page.
    pub fn set_page(&mut self, page: u32, layer: PageLayer) {
        self.pages.insert(page, layer);
    }

    pub fn clear(&mut self) {
        self.pages.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.pages.values().all(|p| p.fragments.is_empty())
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page(&self, page: u32) -> Option<&PageLayer> {
        self.pages.get(&page)
    }

    pub fn fragment(&self, id: FragmentId) -> Option<&Fragment> {
        self.pages
            .get(&id.page)
            .and_then(|p| p.fragments.get(id.index as usize))
    }

    /// Fragment bounds in container coordinates.
    pub fn container_rect(&self, id: FragmentId) -> Option<Rect> {
        let page = self.pages.get(&id.page)?;
        let fragment = page.fragments.get(id.index as usize)?;
        Some(fragment.rect.translate(page.origin.x, page.origin.y))
    }

    /// All fragments ordered by page, then position.
    pub fn fragments(&self) -> impl Iterator<Item = (FragmentId, &Fragment)> {
        self.pages.iter().flat_map(|(&page, layer)| {
            layer
                .fragments
                .iter()
                .enumerate()
                .map(move |(index, f)| (FragmentId::new(page, index as u32), f))
        })
    }

    /// Every fragment containing `needle` as a whole word, case-insensitively.
    ///
    /// An unrendered layer or a blank needle yields an empty result.
    pub fn find_matches(&self, needle: &str) -> Vec<FragmentId> {
        let Some(matcher) = WordMatcher::new(needle) else {
            return Vec::new();
        };

        let matches: Vec<FragmentId> = self
            .fragments()
            .filter(|(_, fragment)| matcher.is_match(&fragment.text))
            .map(|(id, _)| id)
            .collect();

        tracing::debug!(
            needle,
            matches = matches.len(),
            pages = self.pages.len(),
            "text layer search"
        );
        matches
    }
}

/// Case-insensitive, word-bounded literal search.
///
/// The needle must be preceded and followed by a non-word character or the
/// edge of the (trimmed) fragment text, so "cat" finds "the cat sat" but not
/// "category".
#[derive(Debug, Clone)]
pub struct WordMatcher {
    regex: Regex,
}

impl WordMatcher {
    /// Returns `None` for an empty or whitespace-only needle.
    pub fn new(needle: &str) -> Option<Self> {
        let needle = needle.trim();
        if needle.is_empty() {
            return None;
        }

        let pattern = format!(r"(?i)(?:^|\W){}(?:\W|$)", regex::escape(needle));
        match Regex::new(&pattern) {
            Ok(regex) => Some(Self { regex }),
            Err(e) => {
                tracing::warn!(error = %e, "could not build matcher");
                None
            }
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn layer(texts: &[&str]) -> PageLayer {
        PageLayer {
            origin: Point::new(0.0, 0.0),
            size: Size::new(600.0, 800.0),
            fragments: texts
                .iter()
                .enumerate()
                .map(|(i, t)| Fragment::new(*t, Rect::new(10.0, 20.0 * i as f64, 100.0, 12.0)))
                .collect(),
        }
    }

    #[test]
    fn test_whole_word_case_insensitive() {
        let matcher = WordMatcher::new("cat").unwrap();
        assert!(matcher.is_match("cat"));
        assert!(matcher.is_match("  The CAT sat "));
        assert!(matcher.is_match("cat, dog"));
        assert!(!matcher.is_match("category"));
        assert!(!matcher.is_match("bobcat"));
    }

    #[test]
    fn test_needle_is_literal() {
        let matcher = WordMatcher::new("a.b").unwrap();
        assert!(matcher.is_match("see a.b here"));
        assert!(!matcher.is_match("see axb here"));

        let matcher = WordMatcher::new("total (USD)").unwrap();
        assert!(matcher.is_match("Grand total (USD)"));
    }

    #[test]
    fn test_blank_needle_matches_nothing() {
        assert!(WordMatcher::new("").is_none());
        assert!(WordMatcher::new("   ").is_none());

        let mut text_layer = TextLayer::new();
        text_layer.set_page(1, layer(&["anything"]));
        assert!(text_layer.find_matches(" ").is_empty());
    }

    #[test]
    fn test_unrendered_layer_is_empty_result() {
        let text_layer = TextLayer::new();
        assert!(text_layer.is_empty());
        assert!(text_layer.find_matches("Invoice").is_empty());
    }

    #[test]
    fn test_find_matches_across_pages_in_order() {
        let mut text_layer = TextLayer::new();
        text_layer.set_page(2, layer(&["Invoice total", "nothing"]));
        text_layer.set_page(1, layer(&["Header", "INVOICE", "Invoices"]));

        assert_eq!(
            text_layer.find_matches("invoice"),
            vec![FragmentId::new(1, 1), FragmentId::new(2, 0)]
        );
    }

    #[test]
    fn test_reindexing_page_replaces_fragments() {
        let mut text_layer = TextLayer::new();
        text_layer.set_page(1, layer(&["alpha"]));
        text_layer.set_page(1, layer(&["beta"]));
        assert!(text_layer.find_matches("alpha").is_empty());
        assert_eq!(text_layer.find_matches("beta"), vec![FragmentId::new(1, 0)]);
    }

    #[test]
    fn test_container_rect_adds_page_origin() {
        let mut text_layer = TextLayer::new();
        let mut page = layer(&["x"]);
        page.origin = Point::new(5.0, 900.0);
        text_layer.set_page(2, page);

        assert_eq!(
            text_layer.container_rect(FragmentId::new(2, 0)),
            Some(Rect::new(15.0, 900.0, 100.0, 12.0))
        );
        assert_eq!(text_layer.container_rect(FragmentId::new(2, 1)), None);
        assert_eq!(text_layer.container_rect(FragmentId::new(3, 0)), None);
    }
}
