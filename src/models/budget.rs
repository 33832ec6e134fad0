//! Context budget configuration.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The numeric limits a prompt must respect.
///
/// All five fields are required configuration. Absence of any field is
/// a [`Error::ConfigurationError`] at construction time, never a
/// runtime default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBudget {
    /// Maximum tokens for the fully-interpolated prompt.
    pub max_tokens: usize,
    /// Maximum number of local items assembled into context.
    pub max_context_size: usize,
    /// Maximum characters per local item.
    pub truncation_limit: usize,
    /// Number of recent interactions included.
    pub recent_interactions_count: usize,
    /// Maximum characters per recent-interaction response.
    pub recent_interactions_truncation_limit: usize,
}

impl ContextBudget {
    /// Builds a budget from optional raw settings, failing on the
    /// first missing field.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] naming the missing key.
    pub fn from_raw(raw: &RawBudget) -> Result<Self> {
        Ok(Self {
            max_tokens: require(raw.max_tokens, "context.max_tokens")?,
            max_context_size: require(raw.max_context_size, "context.max_context_size")?,
            truncation_limit: require(raw.truncation_limit, "context.truncation_limit")?,
            recent_interactions_count: require(
                raw.recent_interactions_count,
                "context.recent_interactions_count",
            )?,
            recent_interactions_truncation_limit: require(
                raw.recent_interactions_truncation_limit,
                "context.recent_interactions_truncation_limit",
            )?,
        })
    }
}

/// The `[context]` section as read from configuration, before
/// validation.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct RawBudget {
    /// Maximum prompt tokens.
    pub max_tokens: Option<usize>,
    /// Maximum local item count.
    pub max_context_size: Option<usize>,
    /// Per-item character limit.
    pub truncation_limit: Option<usize>,
    /// Recent interaction count.
    pub recent_interactions_count: Option<usize>,
    /// Per-response character limit.
    pub recent_interactions_truncation_limit: Option<usize>,
}

fn require(value: Option<usize>, key: &str) -> Result<usize> {
    value.ok_or_else(|| Error::ConfigurationError(format!("{key} missing")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_raw() -> RawBudget {
        RawBudget {
            max_tokens: Some(1000),
            max_context_size: Some(5),
            truncation_limit: Some(200),
            recent_interactions_count: Some(3),
            recent_interactions_truncation_limit: Some(100),
        }
    }

    #[test]
    fn test_full_budget_validates() {
        let budget = ContextBudget::from_raw(&full_raw()).unwrap();
        assert_eq!(budget.max_tokens, 1000);
        assert_eq!(budget.recent_interactions_count, 3);
    }

    #[test]
    fn test_each_missing_field_is_named() {
        let cases: [(&str, fn(&mut RawBudget)); 5] = [
            ("context.max_tokens", |r| r.max_tokens = None),
            ("context.max_context_size", |r| r.max_context_size = None),
            ("context.truncation_limit", |r| r.truncation_limit = None),
            ("context.recent_interactions_count", |r| {
                r.recent_interactions_count = None;
            }),
            ("context.recent_interactions_truncation_limit", |r| {
                r.recent_interactions_truncation_limit = None;
            }),
        ];
        for (key, strip) in cases {
            let mut raw = full_raw();
            strip(&mut raw);
            let err = ContextBudget::from_raw(&raw).unwrap_err();
            assert!(
                err.to_string().contains(key),
                "error '{err}' should name '{key}'"
            );
        }
    }
}
