//! Loading State
//!
//! Swaps a control's content for a loading label while work is in flight
//! and restores it afterwards.

use std::collections::HashMap;

/// Controls addressable by element id
pub trait ControlSurface {
    /// Current content of `id`, or `None` if the element does not exist
    fn content(&self, id: &str) -> Option<String>;

    fn set_content(&mut self, id: &str, content: String);

    fn set_enabled(&mut self, id: &str, enabled: bool);
}

/// Default loading label
pub const DEFAULT_LOADING_TEXT: &str = "Loading...";

/// Remembers the original content of controls that are loading
#[derive(Debug, Default)]
pub struct LoadingTracker {
    saved: HashMap<String, String>,
}

impl LoadingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `id` into the loading state.
    ///
    /// Starting an element that is already loading only updates the label;
    /// the content saved on the first start is kept. Returns false if the
    /// element does not exist.
    pub fn start<S: ControlSurface>(&mut self, surface: &mut S, id: &str, text: &str) -> bool {
        let Some(original) = surface.content(id) else {
            return false;
        };

        self.saved.entry(id.to_string()).or_insert(original);
        surface.set_content(id, text.to_string());
        surface.set_enabled(id, false);
        true
    }

    /// Restore `id` and re-enable it. Returns false if it was not loading.
    pub fn stop<S: ControlSurface>(&mut self, surface: &mut S, id: &str) -> bool {
        if surface.content(id).is_none() {
            self.saved.remove(id);
            return false;
        }

        let restored = match self.saved.remove(id) {
            Some(original) => {
                surface.set_content(id, original);
                true
            }
            None => false,
        };
        surface.set_enabled(id, true);
        restored
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.saved.contains_key(id)
    }

    pub fn active(&self) -> usize {
        self.saved.len()
    }
}
