//! Scaled icons memoized per feed

use crate::icon::IconImage;
use std::collections::HashMap;

/// Process-lifetime map from feed identity to its display-sized icon
///
/// Only hits are stored. Bounded by the number of feeds, so there is no
/// eviction beyond [`reset`](Self::reset).
#[derive(Debug, Default)]
pub struct IconMemoCache {
    icons: HashMap<String, IconImage>,
}

impl IconMemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, feed_id: &str) -> Option<IconImage> {
        self.icons.get(feed_id).cloned()
    }

    pub fn insert(&mut self, feed_id: impl Into<String>, icon: IconImage) {
        self.icons.insert(feed_id.into(), icon);
    }

    pub fn remove(&mut self, feed_id: &str) -> Option<IconImage> {
        self.icons.remove(feed_id)
    }

    /// Drop every memoized icon (for example after an appearance change)
    pub fn reset(&mut self) {
        self.icons.clear();
    }

    pub fn len(&self) -> usize {
        self.icons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}
