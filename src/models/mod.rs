//! Data models for zptmem.
//!
//! This module contains all the core data structures used throughout
//! the engine.

mod budget;
mod domain;
mod interaction;
mod memory;
mod navigation;

pub use budget::{ContextBudget, RawBudget};
pub use domain::{
    ARCHIVE_THRESHOLD, DomainStatus, DomainType, FADING_THRESHOLD, MemoryDomain,
};
pub use interaction::Interaction;
pub use memory::{EmbeddingInfo, GraphStats, MemoryItem};
pub use navigation::{
    HistoryEntry, NavigationParams, NavigationState, Pan, StateHistory, TemporalWindow, Tilt, Zoom,
};
