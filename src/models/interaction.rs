//! Session cache interaction entries.

use serde::{Deserialize, Serialize};

/// One cached prompt/response exchange from the current session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    /// Interaction id.
    pub id: String,
    /// The user prompt.
    pub prompt: String,
    /// The generated response.
    pub response: String,
    /// Embedding of the exchange, when one was generated.
    pub embedding: Option<Vec<f32>>,
    /// Concepts extracted from the exchange.
    pub concepts: Vec<String>,
    /// Arbitrary caller-supplied metadata.
    pub metadata: serde_json::Value,
    /// When the interaction was cached (Unix seconds).
    pub timestamp: u64,
}

impl Interaction {
    /// Creates an interaction with a fresh timestamp.
    #[must_use]
    pub fn new(id: impl Into<String>, prompt: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            prompt: prompt.into(),
            response: response.into(),
            embedding: None,
            concepts: Vec::new(),
            metadata: serde_json::Value::Null,
            timestamp: crate::current_timestamp(),
        }
    }
}
