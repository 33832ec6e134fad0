//! Deterministic in-process retrieval backend.
//!
//! Serves canned items with pan-scope filtering applied the way a real
//! store would. Used by tests and demos; production deployments wrap
//! their own store behind [`RetrievalBackend`].

use std::sync::Mutex;

use super::{RawItem, RetrievalBackend};
use crate::models::NavigationParams;
use crate::{Error, Result};

/// In-memory retrieval backend.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    items: Mutex<Vec<RawItem>>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend pre-loaded with items.
    #[must_use]
    pub fn with_items(items: Vec<RawItem>) -> Self {
        Self {
            items: Mutex::new(items),
        }
    }

    /// Adds an item to the store.
    pub fn push(&self, item: RawItem) {
        if let Ok(mut items) = self.items.lock() {
            items.push(item);
        }
    }

    fn matches(item: &RawItem, params: &NavigationParams) -> bool {
        if !params.pan.domains.is_empty() {
            let in_scope = item
                .domain_id
                .as_ref()
                .is_some_and(|d| params.pan.domains.contains(d));
            if !in_scope {
                return false;
            }
        }
        if let Some(window) = params.pan.temporal {
            if let Some(ts) = item.timestamp.as_ref().and_then(super::TimeField::resolve) {
                if !window.contains(ts) {
                    return false;
                }
            }
        }
        true
    }
}

impl RetrievalBackend for InMemoryBackend {
    async fn navigate(&self, params: &NavigationParams) -> Result<Vec<RawItem>> {
        let items = self
            .items
            .lock()
            .map_err(|_| Error::DependencyUnavailable {
                dependency: "retrieval backend",
                cause: "item store lock poisoned".to_string(),
            })?;
        Ok(items
            .iter()
            .filter(|item| Self::matches(item, params))
            .cloned()
            .collect())
    }
}
