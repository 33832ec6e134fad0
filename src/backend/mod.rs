//! External collaborator contracts.
//!
//! The triple-store/query backend, query enhancers, and embedding
//! providers live outside this crate. This module defines the traits
//! the engine consumes, the loose wire shape backends return, and its
//! normalization into [`MemoryItem`].

use serde::{Deserialize, Serialize};

use crate::models::{EmbeddingInfo, GraphStats, MemoryItem, NavigationParams};
use crate::{Error, Result};

mod memory_backend;

pub use memory_backend::InMemoryBackend;

/// Retrieval backend contract.
///
/// Implementations wrap whatever store actually indexes memory items;
/// the engine only issues `navigate` calls scoped by zoom/pan/tilt.
pub trait RetrievalBackend: Send + Sync {
    /// Retrieves candidate items for the given navigation parameters.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyUnavailable`] when the store is
    /// unreachable. Implementations must not fabricate empty results
    /// on failure.
    fn navigate(
        &self,
        params: &NavigationParams,
    ) -> impl Future<Output = Result<Vec<RawItem>>> + Send;
}

/// External knowledge enhancement contract.
pub trait QueryEnhancer: Send + Sync {
    /// Produces supplementary context for a question.
    ///
    /// `Ok(None)` means no enhancement was produced and is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyUnavailable`] when the enhancer is
    /// unreachable.
    fn enhance(
        &self,
        question: &str,
        flags: &EnhancementFlags,
    ) -> impl Future<Output = Result<Option<Enhancement>>> + Send;
}

/// Embedding generation contract.
pub trait Embedder: Send + Sync {
    /// Returns the embedding dimensions.
    fn dimensions(&self) -> usize;

    /// Generates an embedding for the given text.
    ///
    /// Failure is non-fatal to assembly; callers degrade to text-only
    /// matching.
    ///
    /// # Errors
    ///
    /// Returns an error if embedding generation fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>>> + Send;
}

/// Flags selecting which external enhancers to consult.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EnhancementFlags {
    /// Encyclopedic search.
    pub use_encyclopedia: bool,
    /// Web search.
    pub use_web_search: bool,
    /// Hypothetical-document generation.
    pub use_hyde: bool,
}

impl EnhancementFlags {
    /// Enables every enhancer.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            use_encyclopedia: true,
            use_web_search: true,
            use_hyde: true,
        }
    }
}

/// Supplementary context produced by an enhancer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enhancement {
    /// The combined enhancement text, ready for prompt inclusion.
    pub combined_prompt: String,
}

/// Transport envelope returned by `navigate()` implementations that
/// speak the wire contract directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NavigateResponse {
    /// Whether the backend call succeeded.
    pub success: bool,
    /// Retrieved items on success.
    #[serde(default)]
    pub data: Vec<RawItem>,
    /// Error detail on failure.
    #[serde(default)]
    pub error: Option<String>,
}

impl NavigateResponse {
    /// Unwraps the envelope into items.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DependencyUnavailable`] when `success` is
    /// false.
    pub fn into_items(self) -> Result<Vec<RawItem>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Error::DependencyUnavailable {
                dependency: "retrieval backend",
                cause: self.error.unwrap_or_else(|| "unspecified".to_string()),
            })
        }
    }
}

/// Keyword-bearing field: either an explicit list or a CSV string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeywordField {
    /// Explicit list of keywords.
    List(Vec<String>),
    /// Comma-separated keywords.
    Csv(String),
}

impl KeywordField {
    fn into_keywords(self) -> Vec<String> {
        match self {
            Self::List(items) => items
                .into_iter()
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect(),
            Self::Csv(csv) => csv
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Timestamp-bearing field: Unix seconds or an RFC 3339 string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeField {
    /// Unix seconds.
    Seconds(i64),
    /// RFC 3339 formatted timestamp.
    Text(String),
}

impl TimeField {
    fn resolve(&self) -> Option<i64> {
        match self {
            Self::Seconds(ts) => Some(*ts),
            Self::Text(text) => chrono::DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.timestamp())
                .ok(),
        }
    }
}

/// The loose wire shape of a retrieved item.
///
/// Backends disagree on field names; the aliases here cover the
/// observed variants, and [`RawItem::into_memory_item`] picks the
/// first non-empty candidate per concept.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RawItem {
    /// Item id, generated when absent.
    pub id: Option<String>,
    /// Owning domain id.
    #[serde(alias = "domain")]
    pub domain_id: Option<String>,
    /// Primary content field.
    pub content: Option<String>,
    /// Short label.
    pub label: Option<String>,
    /// Longer description, used as content fallback.
    pub description: Option<String>,
    /// Plain text, used as content fallback.
    pub text: Option<String>,
    /// Explicit keywords.
    pub keywords: Option<KeywordField>,
    /// Tags, used as keyword fallback.
    pub tags: Option<KeywordField>,
    /// Extracted concepts, used as keyword fallback.
    pub concepts: Option<KeywordField>,
    /// Embedding vector.
    pub embedding: Option<Vec<f32>>,
    /// Similarity against the focus query.
    pub similarity: Option<f32>,
    /// Relevance score.
    pub relevance: Option<f32>,
    /// Generic score, used as relevance fallback.
    pub score: Option<f32>,
    /// Graph node count.
    pub nodes: Option<usize>,
    /// Graph edge count.
    pub edges: Option<usize>,
    /// Graph relation count.
    #[serde(alias = "relations")]
    pub relationships: Option<usize>,
    /// Item timestamp.
    pub timestamp: Option<TimeField>,
    /// Date, used as timestamp fallback.
    pub date: Option<TimeField>,
    /// Creation time, used as timestamp fallback.
    pub created: Option<TimeField>,
    /// Nested metadata carrying `embedding`, `model`, `timestamp`,
    /// `nodes`/`edges`/`relationships` equivalents.
    pub metadata: Option<serde_json::Value>,
}

fn first_non_empty(candidates: &[&Option<String>]) -> Option<String> {
    candidates
        .iter()
        .filter_map(|c| c.as_deref())
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(ToString::to_string)
}

fn meta_usize(metadata: Option<&serde_json::Value>, key: &str) -> Option<usize> {
    metadata?.get(key)?.as_u64().and_then(|v| usize::try_from(v).ok())
}

impl RawItem {
    fn resolved_keywords(&self) -> Vec<String> {
        self.keywords
            .clone()
            .or_else(|| self.tags.clone())
            .or_else(|| self.concepts.clone())
            .map(KeywordField::into_keywords)
            .unwrap_or_default()
    }

    fn resolved_timestamp(&self) -> Option<i64> {
        self.timestamp
            .as_ref()
            .or(self.date.as_ref())
            .or(self.created.as_ref())
            .and_then(TimeField::resolve)
            .or_else(|| {
                let raw = self.metadata.as_ref()?.get("timestamp")?.clone();
                serde_json::from_value::<TimeField>(raw).ok()?.resolve()
            })
    }

    fn resolved_embedding(&self) -> Option<EmbeddingInfo> {
        let metadata = self.metadata.as_ref();
        let dimension = self
            .embedding
            .as_ref()
            .map(Vec::len)
            .or_else(|| metadata?.get("embedding")?.as_array().map(Vec::len));
        let model = metadata
            .and_then(|m| m.get("model").or_else(|| m.get("embedding_model")))
            .and_then(|v| v.as_str())
            .map(ToString::to_string);
        let info = EmbeddingInfo {
            similarity: self.similarity,
            dimension,
            model,
        };
        if info.is_empty() { None } else { Some(info) }
    }

    fn resolved_graph(&self) -> Option<GraphStats> {
        let metadata = self.metadata.as_ref();
        let nodes = self.nodes.or_else(|| meta_usize(metadata, "nodes"));
        let edges = self.edges.or_else(|| meta_usize(metadata, "edges"));
        let relations = self
            .relationships
            .or_else(|| meta_usize(metadata, "relationships"))
            .or_else(|| meta_usize(metadata, "relations"));
        if nodes.is_none() && edges.is_none() && relations.is_none() {
            return None;
        }
        Some(GraphStats {
            nodes: nodes.unwrap_or(0),
            edges: edges.unwrap_or(0),
            relations: relations.unwrap_or(0),
        })
    }

    /// Normalizes the wire shape into a [`MemoryItem`].
    ///
    /// Returns `None` when every content-bearing field is empty; such
    /// items carry nothing projectable and are skipped.
    #[must_use]
    pub fn into_memory_item(self, fallback_domain: &str) -> Option<MemoryItem> {
        let content =
            first_non_empty(&[&self.content, &self.label, &self.description, &self.text])?;
        let relevance = self
            .relevance
            .or(self.score)
            .or(self.similarity)
            .unwrap_or(0.0);
        let keywords = self.resolved_keywords();
        let embedding = self.resolved_embedding();
        let graph = self.resolved_graph();
        let timestamp = self.resolved_timestamp();
        let label = self.label.clone().filter(|l| !l.trim().is_empty());
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let domain_id = self
            .domain_id
            .clone()
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| fallback_domain.to_string());

        let mut item = MemoryItem::new(id, domain_id, content);
        item.label = label;
        item.embedding = embedding;
        item.relevance = relevance;
        item.timestamp = timestamp;
        item.keywords = keywords;
        item.graph = graph;
        Some(item)
    }
}

/// Enhancer that never produces supplementary context.
///
/// The default type parameter for assemblers built without an
/// external enhancement source.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnhancer;

impl QueryEnhancer for NoopEnhancer {
    async fn enhance(
        &self,
        _question: &str,
        _flags: &EnhancementFlags,
    ) -> Result<Option<Enhancement>> {
        Ok(None)
    }
}

/// Embedder placeholder for assemblers built without an embedding
/// provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEmbedder;

impl Embedder for NoopEmbedder {
    fn dimensions(&self) -> usize {
        0
    }

    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::DependencyUnavailable {
            dependency: "embedder",
            cause: "no embedding provider configured".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_fallback_order() {
        let raw = RawItem {
            description: Some("a description".to_string()),
            text: Some("plain text".to_string()),
            ..RawItem::default()
        };
        let item = raw.into_memory_item("d1").unwrap();
        assert_eq!(item.content, "a description");

        let empty = RawItem::default();
        assert!(empty.into_memory_item("d1").is_none());
    }

    #[test]
    fn test_keywords_from_csv_string() {
        let raw: RawItem = serde_json::from_value(json!({
            "content": "c",
            "keywords": "ocean, climate , ,currents"
        }))
        .unwrap();
        let item = raw.into_memory_item("d1").unwrap();
        assert_eq!(item.keywords, vec!["ocean", "climate", "currents"]);
    }

    #[test]
    fn test_keywords_fallback_to_tags() {
        let raw: RawItem = serde_json::from_value(json!({
            "content": "c",
            "tags": ["a", "b"]
        }))
        .unwrap();
        let item = raw.into_memory_item("d1").unwrap();
        assert_eq!(item.keywords, vec!["a", "b"]);
    }

    #[test]
    fn test_timestamp_variants() {
        let numeric: RawItem =
            serde_json::from_value(json!({"content": "c", "timestamp": 1700000000})).unwrap();
        assert_eq!(
            numeric.into_memory_item("d").unwrap().timestamp,
            Some(1_700_000_000)
        );

        let rfc3339: RawItem =
            serde_json::from_value(json!({"content": "c", "created": "2023-11-14T22:13:20Z"}))
                .unwrap();
        assert_eq!(
            rfc3339.into_memory_item("d").unwrap().timestamp,
            Some(1_700_000_000)
        );

        let nested: RawItem = serde_json::from_value(
            json!({"content": "c", "metadata": {"timestamp": 1700000001}}),
        )
        .unwrap();
        assert_eq!(
            nested.into_memory_item("d").unwrap().timestamp,
            Some(1_700_000_001)
        );
    }

    #[test]
    fn test_embedding_metadata_resolution() {
        let raw: RawItem = serde_json::from_value(json!({
            "content": "c",
            "similarity": 0.8,
            "embedding": [0.1, 0.2, 0.3],
            "metadata": {"model": "test-model"}
        }))
        .unwrap();
        let item = raw.into_memory_item("d").unwrap();
        let info = item.embedding.unwrap();
        assert_eq!(info.dimension, Some(3));
        assert_eq!(info.model.as_deref(), Some("test-model"));
        assert!((item.relevance - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_graph_from_metadata() {
        let raw: RawItem = serde_json::from_value(json!({
            "content": "c",
            "metadata": {"nodes": 5, "edges": 4, "relationships": 2}
        }))
        .unwrap();
        let graph = raw.into_memory_item("d").unwrap().graph.unwrap();
        assert_eq!((graph.nodes, graph.edges, graph.relations), (5, 4, 2));
    }

    #[test]
    fn test_navigate_response_envelope() {
        let ok = NavigateResponse {
            success: true,
            data: vec![RawItem::default()],
            error: None,
        };
        assert_eq!(ok.into_items().unwrap().len(), 1);

        let failed = NavigateResponse {
            success: false,
            data: Vec::new(),
            error: Some("store offline".to_string()),
        };
        let err = failed.into_items().unwrap_err();
        assert!(matches!(err, Error::DependencyUnavailable { .. }));
        assert!(err.to_string().contains("store offline"));
    }
}
