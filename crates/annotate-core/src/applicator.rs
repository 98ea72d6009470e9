//! Highlight and underline presentation over the text layer.
//!
//! Styles are recorded per fragment and are final once written: changing the
//! session color later never alters fragments that were already styled. Only
//! highlighted fragments carry a comment key; underlines have no data attached.

use crate::color::Color;
use crate::text_layer::{FragmentId, TextLayer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Underline {
    pub color: Color,
    pub thickness: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FragmentStyle {
    pub background: Option<Color>,
    pub underline: Option<Underline>,
    /// Text looked up in the annotation store when the fragment is clicked
    pub comment_key: Option<String>,
}

impl FragmentStyle {
    pub fn is_clickable(&self) -> bool {
        self.comment_key.is_some()
    }
}

/// A fragment together with its style after a change, for the host to apply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledFragment {
    pub id: FragmentId,
    pub style: FragmentStyle,
}

#[derive(Debug, Clone, Default)]
pub struct Presentation {
    styles: BTreeMap<FragmentId, FragmentStyle>,
}

impl Presentation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paint every fragment matching `text` with `color` and make it
    /// clickable. Returns the matched fragments; empty means nothing changed.
    pub fn highlight(&mut self, layer: &TextLayer, text: &str, color: Color) -> Vec<FragmentId> {
        let matches = layer.find_matches(text);
        for id in &matches {
            let style = self.styles.entry(*id).or_default();
            style.background = Some(color);
            style.comment_key = Some(text.to_string());
        }
        tracing::debug!(text, %color, fragments = matches.len(), "highlight applied");
        matches
    }

    /// Underline every fragment matching `text`.
    pub fn underline(
        &mut self,
        layer: &TextLayer,
        text: &str,
        color: Color,
        thickness: f64,
    ) -> Vec<FragmentId> {
        let matches = layer.find_matches(text);
        for id in &matches {
            self.styles.entry(*id).or_default().underline = Some(Underline { color, thickness });
        }
        tracing::debug!(text, %color, fragments = matches.len(), "underline applied");
        matches
    }

    pub fn style(&self, id: FragmentId) -> Option<&FragmentStyle> {
        self.styles.get(&id)
    }

    pub fn styles(&self) -> impl Iterator<Item = (FragmentId, &FragmentStyle)> {
        self.styles.iter().map(|(id, style)| (*id, style))
    }

    /// Key to look up when `id` is clicked, if it is highlighted.
    pub fn comment_key(&self, id: FragmentId) -> Option<&str> {
        self.styles.get(&id).and_then(|s| s.comment_key.as_deref())
    }

    pub fn snapshot(&self, ids: &[FragmentId]) -> Vec<StyledFragment> {
        ids.iter()
            .filter_map(|id| {
                self.styles.get(id).map(|style| StyledFragment {
                    id: *id,
                    style: style.clone(),
                })
            })
            .collect()
    }

    /// Forget styles of a page whose text layer was rendered again.
    pub fn clear_page(&mut self, page: u32) {
        self.styles.retain(|id, _| id.page != page);
    }

    pub fn clear(&mut self) {
        self.styles.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}
