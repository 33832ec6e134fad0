//! Memory item (corpuscle) types.
//!
//! Items are owned by the retrieval backend; this core only reads,
//! filters, and ranks them. Fade operations touch domain importance,
//! never item content.

use serde::{Deserialize, Serialize};

/// Embedding metadata attached to a retrieved item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbeddingInfo {
    /// Similarity score against the focus query.
    pub similarity: Option<f32>,
    /// Vector dimension.
    pub dimension: Option<usize>,
    /// Embedding model name.
    pub model: Option<String>,
}

impl EmbeddingInfo {
    /// Returns true if no embedding metadata is present at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.similarity.is_none() && self.dimension.is_none() && self.model.is_none()
    }
}

/// Graph structure counts for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphStats {
    /// Node count.
    pub nodes: usize,
    /// Edge count.
    pub edges: usize,
    /// Relation count.
    pub relations: usize,
}

/// A retrievable unit of stored knowledge (a.k.a. corpuscle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryItem {
    /// Unique item id.
    pub id: String,
    /// Owning domain id.
    pub domain_id: String,
    /// The item content.
    pub content: String,
    /// Optional short label; rendered headers fall back to "item".
    pub label: Option<String>,
    /// Embedding metadata, when the backend supplied any.
    pub embedding: Option<EmbeddingInfo>,
    /// Relevance score against the current query.
    pub relevance: f32,
    /// Item timestamp (Unix seconds), when known.
    pub timestamp: Option<i64>,
    /// Explicit keywords or tags.
    pub keywords: Vec<String>,
    /// Graph structure counts, when the backend supplied any.
    pub graph: Option<GraphStats>,
}

impl MemoryItem {
    /// Creates a minimal item with content only.
    #[must_use]
    pub fn new(id: impl Into<String>, domain_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            domain_id: domain_id.into(),
            content: content.into(),
            label: None,
            embedding: None,
            relevance: 0.0,
            timestamp: None,
            keywords: Vec::new(),
            graph: None,
        }
    }

    /// Returns the display label, falling back to "item".
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().filter(|l| !l.is_empty()).unwrap_or("item")
    }

    /// Sets the relevance score.
    #[must_use]
    pub const fn with_relevance(mut self, relevance: f32) -> Self {
        self.relevance = relevance;
        self
    }

    /// Sets the timestamp.
    #[must_use]
    pub const fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Sets the keywords.
    #[must_use]
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_label_fallback() {
        let item = MemoryItem::new("i1", "d1", "content");
        assert_eq!(item.display_label(), "item");

        let mut labeled = MemoryItem::new("i2", "d1", "content");
        labeled.label = Some("ocean notes".to_string());
        assert_eq!(labeled.display_label(), "ocean notes");

        let mut blank = MemoryItem::new("i3", "d1", "content");
        blank.label = Some(String::new());
        assert_eq!(blank.display_label(), "item");
    }

    #[test]
    fn test_builder_helpers() {
        let item = MemoryItem::new("i1", "d1", "c")
            .with_relevance(0.7)
            .with_timestamp(42)
            .with_keywords(vec!["a".to_string()]);
        assert!((item.relevance - 0.7).abs() < f32::EPSILON);
        assert_eq!(item.timestamp, Some(42));
        assert_eq!(item.keywords, vec!["a".to_string()]);
    }
}
