//! Navigation state management.
//!
//! One manager instance owns one session's zoom/pan/tilt state, its
//! bounded history, and its interaction cache. Concurrent calls for
//! the same session are serialized by an internal mutex; different
//! sessions use separate managers and share nothing.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::NavigationSettings;
use crate::models::{
    Interaction, NavigationParams, NavigationState, Pan, StateHistory, Tilt, Zoom,
};
use crate::{Error, Result};

struct SessionInner {
    state: NavigationState,
    history: StateHistory,
    cache: Option<LruCache<String, Interaction>>,
}

/// Owns the zoom/pan/tilt state for a single session.
///
/// Transitions are always explicit; there is no automatic transition
/// and no terminal state. Mutators snapshot the prior state to history
/// and return the new state, so callers never reason about aliasing.
pub struct NavigationStateManager {
    inner: Mutex<SessionInner>,
}

impl NavigationStateManager {
    /// Creates a manager with the initial state `zoom=entity`,
    /// `tilt=keywords`, empty pan.
    ///
    /// The session cache starts uninitialized; see
    /// [`Self::with_session_cache`].
    #[must_use]
    pub fn new(session_id: impl Into<String>, settings: &NavigationSettings) -> Self {
        let mut state = NavigationState::new(session_id);
        state.relevance_threshold = settings.relevance_threshold;
        state.max_memories = settings.max_memories;
        Self {
            inner: Mutex::new(SessionInner {
                state,
                history: StateHistory::new(settings.history_limit),
                cache: None,
            }),
        }
    }

    /// Initializes the session cache with the given capacity.
    ///
    /// A zero capacity leaves the cache uninitialized.
    #[must_use]
    pub fn with_session_cache(self, capacity: usize) -> Self {
        if let Some(capacity) = NonZeroUsize::new(capacity) {
            if let Ok(mut inner) = self.inner.lock() {
                inner.cache = Some(LruCache::new(capacity));
            }
        }
        self
    }

    fn lock(&self) -> Result<MutexGuard<'_, SessionInner>> {
        self.inner
            .lock()
            .map_err(|_| Error::StateUnavailable("session state lock poisoned".to_string()))
    }

    /// Returns a snapshot of the current state.
    pub fn state(&self) -> Result<NavigationState> {
        Ok(self.lock()?.state.clone())
    }

    /// Sets the zoom level.
    ///
    /// Snapshots the prior state to history, stores `query` as the
    /// last query when provided, and returns the new state.
    pub fn set_zoom(&self, zoom: Zoom, query: Option<&str>) -> Result<NavigationState> {
        let mut inner = self.lock()?;
        let previous = inner.state.clone();
        inner.history.push(previous);
        inner.state.zoom = zoom;
        if let Some(query) = query {
            inner.state.last_query = Some(query.to_string());
        }
        debug!(session = %inner.state.session_id, zoom = %zoom, "zoom changed");
        Ok(inner.state.clone())
    }

    /// Sets the zoom level from a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNavigationValue`] for an unrecognized
    /// level, leaving the state unchanged.
    pub fn set_zoom_str(&self, level: &str, query: Option<&str>) -> Result<NavigationState> {
        let zoom = Zoom::parse(level)?;
        self.set_zoom(zoom, query)
    }

    /// Sets the tilt style.
    pub fn set_tilt(&self, tilt: Tilt, query: Option<&str>) -> Result<NavigationState> {
        let mut inner = self.lock()?;
        let previous = inner.state.clone();
        inner.history.push(previous);
        inner.state.tilt = tilt;
        if let Some(query) = query {
            inner.state.last_query = Some(query.to_string());
        }
        debug!(session = %inner.state.session_id, tilt = %tilt, "tilt changed");
        Ok(inner.state.clone())
    }

    /// Sets the tilt style from a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNavigationValue`] for an unrecognized
    /// style, leaving the state unchanged.
    pub fn set_tilt_str(&self, style: &str, query: Option<&str>) -> Result<NavigationState> {
        let tilt = Tilt::parse(style)?;
        self.set_tilt(tilt, query)
    }

    /// Merges domain and temporal filters into the current pan.
    ///
    /// Merge, not replace: existing filters survive unless the update
    /// carries a new temporal window.
    pub fn set_pan(&self, update: Pan) -> Result<NavigationState> {
        let mut inner = self.lock()?;
        let previous = inner.state.clone();
        inner.history.push(previous);
        inner.state.pan.merge(update);
        debug!(
            session = %inner.state.session_id,
            domains = inner.state.pan.domains.len(),
            "pan updated"
        );
        Ok(inner.state.clone())
    }

    /// Updates the focus query and its embedding.
    ///
    /// Focus tracking is not a camera move, so no history snapshot is
    /// taken.
    pub fn set_focus(&self, query: &str, embedding: Option<Vec<f32>>) -> Result<NavigationState> {
        let mut inner = self.lock()?;
        inner.state.focus_query = query.to_string();
        inner.state.focus_embedding = embedding;
        Ok(inner.state.clone())
    }

    /// Maps the current state plus a query into backend navigation
    /// parameters. Pure; no state is mutated.
    pub fn navigation_params(&self, query: &str) -> Result<NavigationParams> {
        let inner = self.lock()?;
        Ok(NavigationParams {
            query: query.to_string(),
            zoom: inner.state.zoom,
            pan: inner.state.pan.clone(),
            tilt: inner.state.tilt,
        })
    }

    /// Returns the zoom level before the most recent mutation.
    pub fn previous_zoom(&self) -> Result<Option<Zoom>> {
        Ok(self.lock()?.history.previous_zoom())
    }

    /// Returns the tilt style before the most recent mutation.
    pub fn previous_tilt(&self) -> Result<Option<Tilt>> {
        Ok(self.lock()?.history.previous_tilt())
    }

    /// Returns the number of history snapshots currently held.
    pub fn history_len(&self) -> Result<usize> {
        Ok(self.lock()?.history.len())
    }

    /// Appends an interaction to the session cache.
    ///
    /// Re-adding an existing id replaces the entry and refreshes its
    /// recency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateUnavailable`] when the cache was never
    /// initialized.
    pub fn add_to_session_cache(&self, interaction: Interaction) -> Result<()> {
        let mut inner = self.lock()?;
        let cache = inner.cache.as_mut().ok_or_else(|| {
            Error::StateUnavailable("session cache not initialized".to_string())
        })?;
        cache.put(interaction.id.clone(), interaction);
        Ok(())
    }

    /// Returns the last `n` cached interactions in insertion order,
    /// most recent last.
    ///
    /// An initialized-but-empty cache yields an empty vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StateUnavailable`] when the cache was never
    /// initialized.
    pub fn recent_interactions(&self, n: usize) -> Result<Vec<Interaction>> {
        let inner = self.lock()?;
        let cache = inner.cache.as_ref().ok_or_else(|| {
            Error::StateUnavailable("session cache not initialized".to_string())
        })?;
        let mut recent: Vec<Interaction> = cache
            .iter()
            .take(n)
            .map(|(_, interaction)| interaction.clone())
            .collect();
        recent.reverse();
        Ok(recent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> NavigationStateManager {
        NavigationStateManager::new("s1", &NavigationSettings::default())
    }

    #[test]
    fn test_set_zoom_roundtrip_all_levels() {
        let mgr = manager();
        for zoom in Zoom::all() {
            let state = mgr.set_zoom(*zoom, None).unwrap();
            assert_eq!(state.zoom, *zoom);
            assert_eq!(mgr.state().unwrap().zoom, *zoom);
        }
    }

    #[test]
    fn test_set_tilt_roundtrip_all_styles() {
        let mgr = manager();
        for tilt in Tilt::all() {
            let state = mgr.set_tilt(*tilt, None).unwrap();
            assert_eq!(state.tilt, *tilt);
            assert_eq!(mgr.state().unwrap().tilt, *tilt);
        }
    }

    #[test]
    fn test_invalid_zoom_leaves_state_unchanged() {
        let mgr = manager();
        mgr.set_zoom(Zoom::Document, None).unwrap();
        let before = mgr.state().unwrap();
        let err = mgr.set_zoom_str("galaxy", Some("q")).unwrap_err();
        assert!(matches!(err, Error::InvalidNavigationValue { .. }));
        assert_eq!(mgr.state().unwrap(), before);
        // The failed call must not have pushed a history entry either.
        assert_eq!(mgr.history_len().unwrap(), 1);
    }

    #[test]
    fn test_mutation_snapshots_history() {
        let mgr = manager();
        mgr.set_zoom(Zoom::Concept, Some("first")).unwrap();
        mgr.set_tilt(Tilt::Graph, Some("second")).unwrap();

        assert_eq!(mgr.previous_zoom().unwrap(), Some(Zoom::Concept));
        // The snapshot taken before set_tilt still carried keywords.
        assert_eq!(mgr.previous_tilt().unwrap(), Some(Tilt::Keywords));
        assert_eq!(mgr.state().unwrap().last_query.as_deref(), Some("second"));
    }

    #[test]
    fn test_set_pan_merges() {
        let mgr = manager();
        let mut first = Pan::new();
        first.domains.insert("a".to_string());
        mgr.set_pan(first).unwrap();

        let mut second = Pan::new();
        second.domains.insert("b".to_string());
        let state = mgr.set_pan(second).unwrap();
        assert_eq!(state.pan.domains.len(), 2);
    }

    #[test]
    fn test_navigation_params_projection() {
        let mgr = manager();
        mgr.set_zoom(Zoom::Community, None).unwrap();
        mgr.set_tilt(Tilt::Temporal, None).unwrap();
        let params = mgr.navigation_params("what changed?").unwrap();
        assert_eq!(params.query, "what changed?");
        assert_eq!(params.zoom, Zoom::Community);
        assert_eq!(params.tilt, Tilt::Temporal);
    }

    #[test]
    fn test_uninitialized_cache_is_state_unavailable() {
        let mgr = manager();
        let err = mgr.recent_interactions(5).unwrap_err();
        assert!(matches!(err, Error::StateUnavailable(_)));

        let err = mgr
            .add_to_session_cache(Interaction::new("i1", "p", "r"))
            .unwrap_err();
        assert!(matches!(err, Error::StateUnavailable(_)));
    }

    #[test]
    fn test_empty_cache_returns_empty_not_error() {
        let mgr = manager().with_session_cache(10);
        assert!(mgr.recent_interactions(5).unwrap().is_empty());
    }

    #[test]
    fn test_recent_interactions_order_and_limit() {
        let mgr = manager().with_session_cache(10);
        for i in 0..5 {
            mgr.add_to_session_cache(Interaction::new(
                format!("i{i}"),
                format!("p{i}"),
                format!("r{i}"),
            ))
            .unwrap();
        }
        let recent = mgr.recent_interactions(3).unwrap();
        let ids: Vec<&str> = recent.iter().map(|i| i.id.as_str()).collect();
        // Most recent last.
        assert_eq!(ids, vec!["i2", "i3", "i4"]);
    }

    #[test]
    fn test_cache_evicts_oldest_at_capacity() {
        let mgr = manager().with_session_cache(3);
        for i in 0..5 {
            mgr.add_to_session_cache(Interaction::new(
                format!("i{i}"),
                "p",
                "r",
            ))
            .unwrap();
        }
        let recent = mgr.recent_interactions(10).unwrap();
        let ids: Vec<&str> = recent.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["i2", "i3", "i4"]);
    }

    #[test]
    fn test_history_respects_limit() {
        let settings = NavigationSettings {
            history_limit: 2,
            ..NavigationSettings::default()
        };
        let mgr = NavigationStateManager::new("s1", &settings);
        for _ in 0..5 {
            mgr.set_zoom(Zoom::Concept, None).unwrap();
        }
        assert_eq!(mgr.history_len().unwrap(), 2);
    }
}
