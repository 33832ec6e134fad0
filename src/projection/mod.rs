//! Tilt projection.
//!
//! Turns raw retrieved items into representation-specific text. The
//! four renderers are mutually exclusive and selected by an exhaustive
//! match on [`Tilt`], so a fifth style cannot be silently ignored.
//! Every renderer is total over well-formed items: missing optional
//! fields render as explicit placeholders, never as errors.

use crate::models::{MemoryItem, Tilt};
use crate::{Error, Result};

/// Projects items through the renderer for the given tilt.
#[must_use]
pub fn project(items: &[MemoryItem], tilt: Tilt) -> String {
    match tilt {
        Tilt::Keywords => render_keywords(items),
        Tilt::Embedding => render_embedding(items),
        Tilt::Graph => render_graph(items),
        Tilt::Temporal => render_temporal(items),
    }
}

/// Projects items through a tilt given as a string.
///
/// The string boundary for callers that carry the tilt as loose text;
/// an unrecognized value is rejected before any item is rendered.
///
/// # Errors
///
/// Returns [`Error::UnsupportedRepresentation`] for an unknown tilt.
pub fn project_str(items: &[MemoryItem], tilt: &str) -> Result<String> {
    let parsed =
        Tilt::parse(tilt).map_err(|_| Error::UnsupportedRepresentation(tilt.to_string()))?;
    Ok(project(items, parsed))
}

fn non_empty(text: &str) -> &str {
    if text.is_empty() { "none" } else { text }
}

fn render_keywords(items: &[MemoryItem]) -> String {
    items
        .iter()
        .map(|item| {
            let keywords = if item.keywords.is_empty() {
                "none".to_string()
            } else {
                item.keywords.join(", ")
            };
            format!(
                "- {}\n  keywords: {}\n  content: {}",
                item.display_label(),
                keywords,
                non_empty(&item.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_embedding(items: &[MemoryItem]) -> String {
    items
        .iter()
        .map(|item| {
            let line = match &item.embedding {
                Some(info) if !info.is_empty() => {
                    let similarity = info
                        .similarity
                        .map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}"));
                    let dimension = info
                        .dimension
                        .map_or_else(|| "n/a".to_string(), |d| d.to_string());
                    let model = info.model.as_deref().unwrap_or("n/a");
                    format!("embedding: similarity={similarity} dimension={dimension} model={model}")
                }
                _ => "embedding: unavailable".to_string(),
            };
            format!(
                "- {}\n  {}\n  content: {}",
                item.display_label(),
                line,
                non_empty(&item.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_graph(items: &[MemoryItem]) -> String {
    items
        .iter()
        .map(|item| {
            let line = item.graph.map_or_else(
                || "graph: unavailable".to_string(),
                |g| {
                    format!(
                        "graph: nodes={} edges={} relations={}",
                        g.nodes, g.edges, g.relations
                    )
                },
            );
            format!(
                "- {}\n  {}\n  content: {}",
                item.display_label(),
                line,
                non_empty(&item.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_temporal(items: &[MemoryItem]) -> String {
    let mut ordered: Vec<&MemoryItem> = items.iter().collect();
    // Missing timestamps sort as epoch 0.
    ordered.sort_by_key(|item| item.timestamp.unwrap_or(0));
    ordered
        .iter()
        .map(|item| {
            let ts = item
                .timestamp
                .map_or_else(|| "unknown".to_string(), |t| t.to_string());
            format!(
                "- {}\n  timestamp: {}\n  content: {}",
                item.display_label(),
                ts,
                non_empty(&item.content)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
