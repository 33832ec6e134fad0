//! # zptmem
//!
//! Context-engineering engine for an LLM agent's semantic memory.
//!
//! Given a question and a navigation state, zptmem assembles a
//! token-bounded prompt context from local memory, external knowledge
//! enhancements, and recent session history, while managing the
//! lifecycle (creation, fading, switching) of named memory domains.
//!
//! ## Architecture
//!
//! - Zoom/pan/tilt navigation state machine with bounded history
//! - Memory domains with multiplicative importance decay
//! - Four tilt projections (keywords, embedding, graph, temporal)
//! - Sliding-window token budgeting that rejects, never silently
//!   truncates, over-budget prompts
//!
//! ## Example
//!
//! ```rust,ignore
//! use zptmem::{ContextAssembler, EngineConfig, SourceSelection};
//!
//! let config = EngineConfig::load_from_file(path)?;
//! let assembler = ContextAssembler::new(config, backend);
//! let assembly = assembler
//!     .assemble("what regulates climate?", &SourceSelection::all())
//!     .await?;
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod assembler;
pub mod backend;
pub mod config;
pub mod domains;
pub mod models;
pub mod navigation;
pub mod observability;
pub mod projection;
pub mod window;

// Re-exports for convenience
pub use assembler::{Assembly, ContextAssembler, NO_CONTEXT_ANSWER, SourceReport, SourceSelection};
pub use backend::{
    Embedder, Enhancement, EnhancementFlags, InMemoryBackend, NavigateResponse, QueryEnhancer,
    RawItem, RetrievalBackend,
};
pub use config::{EngineConfig, FadeSettings, NavigationSettings, TimeoutSettings};
pub use domains::{FadeOptions, MemoryDomainManager};
pub use models::{
    ContextBudget, DomainStatus, DomainType, Interaction, MemoryDomain, MemoryItem,
    NavigationParams, NavigationState, Pan, RawBudget, StateHistory, TemporalWindow, Tilt, Zoom,
};
pub use navigation::NavigationStateManager;
pub use observability::{LogFormat, LoggingConfig, init_logging};
pub use projection::project;
pub use window::{ContextWindow, WindowConfig, estimate_tokens};

/// Error type for zptmem operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidNavigationValue` | Zoom or tilt string outside the closed enums |
/// | `DomainTypeConflict` | Domain id re-created under a different type |
/// | `DependencyUnavailable` | Retrieval backend or enhancer unreachable |
/// | `ConfigurationError` | Missing or non-numeric context budget field |
/// | `BudgetExceeded` | Prompt template alone exhausts the token budget |
/// | `PromptBudgetExceeded` | Final prompt still over budget after windowing |
/// | `UnsupportedRepresentation` | Unknown tilt at projection time |
/// | `StateUnavailable` | Session cache read before initialization |
#[derive(Debug, ThisError)]
pub enum Error {
    /// A zoom or tilt value outside the enumerated set was provided.
    ///
    /// Unsupported values are a hard error; no default is silently
    /// substituted.
    #[error("invalid navigation value for {dimension}: '{value}'")]
    InvalidNavigationValue {
        /// The navigation dimension ("zoom" or "tilt").
        dimension: &'static str,
        /// The rejected value.
        value: String,
    },

    /// A domain id exists under a different domain type.
    #[error("domain '{id}' already exists with type '{existing}', requested '{requested}'")]
    DomainTypeConflict {
        /// The conflicting domain id.
        id: String,
        /// The type the domain was created with.
        existing: String,
        /// The type the caller requested.
        requested: String,
    },

    /// An external collaborator (retrieval backend, enhancer) is
    /// unreachable.
    ///
    /// Never converted into a fabricated empty result; callers decide
    /// whether empty-on-failure is acceptable.
    #[error("dependency '{dependency}' unavailable: {cause}")]
    DependencyUnavailable {
        /// The collaborator that failed.
        dependency: &'static str,
        /// The underlying cause.
        cause: String,
    },

    /// Required configuration is missing or malformed.
    ///
    /// Raised at startup when any of the five context budget fields is
    /// absent; budget fields are never defaulted at runtime.
    #[error("configuration error: {0}")]
    ConfigurationError(String),

    /// The non-context portion of the prompt already exhausts the
    /// token budget, so no context can be fitted at all.
    #[error("budget exceeded: template needs {template_tokens} of {max_tokens} tokens")]
    BudgetExceeded {
        /// Tokens consumed by the prompt template alone.
        template_tokens: usize,
        /// The configured maximum.
        max_tokens: usize,
    },

    /// The fully-interpolated prompt exceeds the token budget even
    /// after windowing. Always a reject, never a silent truncation.
    #[error("prompt budget exceeded: {actual_tokens} tokens against a budget of {max_tokens}")]
    PromptBudgetExceeded {
        /// Estimated tokens of the final prompt.
        actual_tokens: usize,
        /// The configured maximum.
        max_tokens: usize,
    },

    /// An unrecognized tilt reached the projector.
    #[error("unsupported representation: '{0}'")]
    UnsupportedRepresentation(String),

    /// The session cache subsystem was never initialized.
    ///
    /// An initialized-but-empty cache is not an error; it yields an
    /// empty sequence.
    #[error("session state unavailable: {0}")]
    StateUnavailable(String),
}

/// Result type alias for zptmem operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Returns the current Unix timestamp in seconds.
///
/// Centralized to avoid duplicate implementations across the codebase.
/// Uses `SystemTime::now()` with fallback to 0 if the system clock is
/// before the Unix epoch.
#[must_use]
pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidNavigationValue {
            dimension: "zoom",
            value: "planet".to_string(),
        };
        assert_eq!(err.to_string(), "invalid navigation value for zoom: 'planet'");

        let err = Error::PromptBudgetExceeded {
            actual_tokens: 120,
            max_tokens: 100,
        };
        assert_eq!(
            err.to_string(),
            "prompt budget exceeded: 120 tokens against a budget of 100"
        );

        let err = Error::ConfigurationError("context.max_tokens missing".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: context.max_tokens missing"
        );
    }

    #[test]
    fn test_current_timestamp_is_positive() {
        assert!(current_timestamp() > 0);
    }
}
