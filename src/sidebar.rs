//! Sidebar panel: one placeholder per waste category.
//!
//! The render pass is the only consumer of the session's dirty flag. It
//! re-renders only when a result is pending, and clears everything when the
//! stream is not playing.

use crate::category::{display_label, CategorizedResult, LabelSet, WasteCategory};
use crate::state::SessionState;

/// A region of the panel that either shows text or nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Placeholder {
    content: Option<String>,
}

impl Placeholder {
    pub fn set(&mut self, text: String) {
        self.content = Some(text);
    }

    pub fn clear(&mut self) {
        self.content = None;
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }
}

/// Body for one category, or `None` when it has no items.
///
/// ```text
/// Recyclable items:
///
/// - glass bottle
/// - paper
/// ```
pub fn render_category(category: WasteCategory, labels: &LabelSet) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    let items: Vec<String> = labels.iter().map(display_label).collect();
    Some(format!("{} items:\n\n- {}", category.title(), items.join("\n- ")))
}

#[derive(Clone, Debug, Default)]
pub struct Sidebar {
    recyclable: Placeholder,
    non_recyclable: Placeholder,
    hazardous: Placeholder,
    renders: u64,
}

impl Sidebar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn placeholder(&self, category: WasteCategory) -> &Placeholder {
        match category {
            WasteCategory::Recyclable => &self.recyclable,
            WasteCategory::NonRecyclable => &self.non_recyclable,
            WasteCategory::Hazardous => &self.hazardous,
        }
    }

    fn placeholder_mut(&mut self, category: WasteCategory) -> &mut Placeholder {
        match category {
            WasteCategory::Recyclable => &mut self.recyclable,
            WasteCategory::NonRecyclable => &mut self.non_recyclable,
            WasteCategory::Hazardous => &mut self.hazardous,
        }
    }

    /// Number of times category content has been re-rendered.
    pub fn render_count(&self) -> u64 {
        self.renders
    }

    /// One render pass. Returns true when the visible content was redrawn.
    pub fn render(&mut self, state: &SessionState) -> bool {
        if !state.is_playing() {
            self.clear();
            return false;
        }
        match state.take_pending() {
            Some(result) => {
                self.show(&result);
                true
            }
            None => false,
        }
    }

    /// Redraw all placeholders from `result`.
    pub fn show(&mut self, result: &CategorizedResult) {
        for category in WasteCategory::ALL {
            let body = render_category(category, result.get(category));
            let placeholder = self.placeholder_mut(category);
            match body {
                Some(text) => placeholder.set(text),
                None => placeholder.clear(),
            }
        }
        self.renders += 1;
    }

    pub fn clear(&mut self) {
        for category in WasteCategory::ALL {
            self.placeholder_mut(category).clear();
        }
    }

    /// Visible text of the whole panel, sections separated by blank lines.
    pub fn text(&self) -> String {
        WasteCategory::ALL
            .into_iter()
            .filter_map(|category| self.placeholder(category).content())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}
