//! Zoom/pan/tilt navigation types.
//!
//! The navigation grammar controls retrieval granularity (zoom), scope
//! filters (pan), and output projection (tilt). Zoom and tilt are
//! closed enums: an unrecognized value is a hard error at the parse
//! boundary, never a silent fallback to a default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::{Error, Result};

/// Retrieval granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Zoom {
    /// Individual entities.
    #[default]
    Entity,
    /// Extracted concepts.
    Concept,
    /// Whole documents.
    Document,
    /// Graph communities.
    Community,
}

impl Zoom {
    /// Returns all zoom variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Entity, Self::Concept, Self::Document, Self::Community]
    }

    /// Returns the zoom level as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Entity => "entity",
            Self::Concept => "concept",
            Self::Document => "document",
            Self::Community => "community",
        }
    }

    /// Parses a zoom level from a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNavigationValue`] for anything outside
    /// the enumerated set.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "entity" => Ok(Self::Entity),
            "concept" => Ok(Self::Concept),
            "document" => Ok(Self::Document),
            "community" => Ok(Self::Community),
            _ => Err(Error::InvalidNavigationValue {
                dimension: "zoom",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Output projection style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tilt {
    /// Keyword lists per item.
    #[default]
    Keywords,
    /// Embedding metadata (similarity, dimension, model).
    Embedding,
    /// Graph structure counts.
    Graph,
    /// Temporally ordered items.
    Temporal,
}

impl Tilt {
    /// Returns all tilt variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Keywords, Self::Embedding, Self::Graph, Self::Temporal]
    }

    /// Returns the tilt style as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Keywords => "keywords",
            Self::Embedding => "embedding",
            Self::Graph => "graph",
            Self::Temporal => "temporal",
        }
    }

    /// Parses a tilt style from a string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNavigationValue`] for anything outside
    /// the enumerated set.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "keywords" => Ok(Self::Keywords),
            "embedding" => Ok(Self::Embedding),
            "graph" => Ok(Self::Graph),
            "temporal" => Ok(Self::Temporal),
            _ => Err(Error::InvalidNavigationValue {
                dimension: "tilt",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for Tilt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Temporal scope filter, a half-open interval of Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemporalWindow {
    /// Start of the window (inclusive), None for unbounded past.
    pub start: Option<i64>,
    /// End of the window (exclusive), None for unbounded future.
    pub end: Option<i64>,
}

impl TemporalWindow {
    /// Creates a bounded window.
    #[must_use]
    pub const fn between(start: i64, end: i64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
        }
    }

    /// Returns true if the timestamp falls inside the window.
    #[must_use]
    pub fn contains(&self, ts: i64) -> bool {
        self.start.is_none_or(|s| ts >= s) && self.end.is_none_or(|e| ts < e)
    }
}

/// Scope filter orthogonal to the zoom/tilt state dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pan {
    /// Domain ids in scope; empty means all active/fading domains.
    pub domains: BTreeSet<String>,
    /// Optional temporal scope.
    pub temporal: Option<TemporalWindow>,
}

impl Pan {
    /// Creates an empty pan (no scoping).
    #[must_use]
    pub const fn new() -> Self {
        Self {
            domains: BTreeSet::new(),
            temporal: None,
        }
    }

    /// Merges another pan into this one.
    ///
    /// Domains are unioned and a provided temporal window replaces the
    /// current one; merge never clears existing filters.
    pub fn merge(&mut self, update: Self) {
        self.domains.extend(update.domains);
        if update.temporal.is_some() {
            self.temporal = update.temporal;
        }
    }
}

/// Per-session navigation state.
///
/// Created once per session and mutated in place by zoom/pan/tilt
/// commands; each mutation snapshots the prior value to
/// [`StateHistory`] first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationState {
    /// Current retrieval granularity.
    pub zoom: Zoom,
    /// Current scope filter.
    pub pan: Pan,
    /// Current projection style.
    pub tilt: Tilt,
    /// The query the session is currently focused on.
    pub focus_query: String,
    /// Embedding of the focus query, when one could be generated.
    pub focus_embedding: Option<Vec<f32>>,
    /// Owning session id.
    pub session_id: String,
    /// The most recent query passed to a navigation command.
    pub last_query: Option<String>,
    /// Minimum relevance for visible memories.
    pub relevance_threshold: f32,
    /// Maximum number of visible memories returned per query.
    pub max_memories: usize,
}

impl NavigationState {
    /// Creates the initial state for a session: `zoom=entity`,
    /// `tilt=keywords`, empty pan.
    #[must_use]
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            zoom: Zoom::Entity,
            pan: Pan::new(),
            tilt: Tilt::Keywords,
            focus_query: String::new(),
            focus_embedding: None,
            session_id: session_id.into(),
            last_query: None,
            relevance_threshold: 0.3,
            max_memories: 10,
        }
    }
}

/// Parameters handed to the retrieval backend's `navigate()` call.
///
/// A pure projection of the current navigation state plus the query;
/// carries no backend handles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationParams {
    /// The query to navigate with.
    pub query: String,
    /// Retrieval granularity.
    pub zoom: Zoom,
    /// Scope filter.
    pub pan: Pan,
    /// Projection style.
    pub tilt: Tilt,
}

/// A snapshot taken before a navigation mutation.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// The state as it was before the mutation.
    pub previous: NavigationState,
    /// When the snapshot was taken (Unix seconds).
    pub timestamp: u64,
}

/// Bounded append-only stack of navigation snapshots.
///
/// Used only to answer "what was the previous zoom/tilt" queries;
/// never used to replay or undo side effects.
#[derive(Debug)]
pub struct StateHistory {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl StateHistory {
    /// Creates a history with the given capacity.
    #[must_use]
    pub const fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Pushes a snapshot, evicting the oldest entry at capacity.
    pub fn push(&mut self, previous: NavigationState) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.remove(0);
        }
        self.entries.push(HistoryEntry {
            previous,
            timestamp: crate::current_timestamp(),
        });
    }

    /// Returns the number of stored snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no snapshots are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the zoom level before the most recent mutation.
    #[must_use]
    pub fn previous_zoom(&self) -> Option<Zoom> {
        self.entries.last().map(|e| e.previous.zoom)
    }

    /// Returns the tilt style before the most recent mutation.
    #[must_use]
    pub fn previous_tilt(&self) -> Option<Tilt> {
        self.entries.last().map(|e| e.previous.tilt)
    }

    /// Returns the most recent snapshot.
    #[must_use]
    pub fn last(&self) -> Option<&HistoryEntry> {
        self.entries.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_parse_roundtrip() {
        for zoom in Zoom::all() {
            assert_eq!(Zoom::parse(zoom.as_str()).ok(), Some(*zoom));
        }
    }

    #[test]
    fn test_zoom_parse_rejects_unknown() {
        let err = Zoom::parse("planet").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidNavigationValue { dimension: "zoom", .. }
        ));
    }

    #[test]
    fn test_tilt_parse_rejects_unknown() {
        let err = Tilt::parse("foo").unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidNavigationValue { dimension: "tilt", .. }
        ));
    }

    #[test]
    fn test_initial_state() {
        let state = NavigationState::new("s1");
        assert_eq!(state.zoom, Zoom::Entity);
        assert_eq!(state.tilt, Tilt::Keywords);
        assert!(state.pan.domains.is_empty());
        assert!(state.pan.temporal.is_none());
    }

    #[test]
    fn test_pan_merge_is_additive() {
        let mut pan = Pan::new();
        pan.domains.insert("a".to_string());

        let mut update = Pan::new();
        update.domains.insert("b".to_string());
        update.temporal = Some(TemporalWindow::between(0, 100));

        pan.merge(update);
        assert_eq!(pan.domains.len(), 2);
        assert!(pan.temporal.is_some());

        // A later merge without a temporal window keeps the current one.
        let mut second = Pan::new();
        second.domains.insert("c".to_string());
        pan.merge(second);
        assert_eq!(pan.domains.len(), 3);
        assert!(pan.temporal.is_some());
    }

    #[test]
    fn test_temporal_window_contains() {
        let w = TemporalWindow::between(10, 20);
        assert!(w.contains(10));
        assert!(w.contains(19));
        assert!(!w.contains(20));
        assert!(!w.contains(9));

        assert!(TemporalWindow::default().contains(i64::MIN));
    }

    #[test]
    fn test_history_caps_entries() {
        let mut history = StateHistory::new(3);
        for i in 0..5 {
            let mut state = NavigationState::new("s1");
            state.focus_query = format!("q{i}");
            history.push(state);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(
            history.last().map(|e| e.previous.focus_query.clone()),
            Some("q4".to_string())
        );
    }

    #[test]
    fn test_history_previous_zoom_tilt() {
        let mut history = StateHistory::new(10);
        assert!(history.previous_zoom().is_none());

        let mut state = NavigationState::new("s1");
        state.zoom = Zoom::Document;
        state.tilt = Tilt::Graph;
        history.push(state);

        assert_eq!(history.previous_zoom(), Some(Zoom::Document));
        assert_eq!(history.previous_tilt(), Some(Tilt::Graph));
    }
}
