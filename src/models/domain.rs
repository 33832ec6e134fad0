//! Memory domain types and lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Importance below this mark demotes an active domain to fading.
pub const FADING_THRESHOLD: f32 = 0.2;

/// Importance below this mark demotes a fading domain to archived.
pub const ARCHIVE_THRESHOLD: f32 = 0.05;

/// Categories of memory domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainType {
    /// Long-lived user-level memory.
    User,
    /// Project-scoped memory.
    #[default]
    Project,
    /// Memory scoped to a single session.
    Session,
    /// Standing instructions; exempt from fade by default.
    Instruction,
}

impl DomainType {
    /// Returns all domain type variants.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::User, Self::Project, Self::Session, Self::Instruction]
    }

    /// Returns the type as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Session => "session",
            Self::Instruction => "instruction",
        }
    }

    /// Parses a domain type from a string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "user" => Some(Self::User),
            "project" => Some(Self::Project),
            "session" => Some(Self::Session),
            "instruction" => Some(Self::Instruction),
            _ => None,
        }
    }
}

impl fmt::Display for DomainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a domain.
///
/// Transitions are one-way: `active → fading → archived`, driven by
/// importance crossing the low-water marks. Archival is a status, not
/// removal; this core never hard-deletes a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    /// Fully visible.
    #[default]
    Active,
    /// Importance decayed below the fading mark; still visible.
    Fading,
    /// Importance decayed below the archive mark; excluded from
    /// visibility by default.
    Archived,
}

impl DomainStatus {
    /// Returns the status as a string slice.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Fading => "fading",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named, typed partition of memory with an independent
/// importance/fade lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryDomain {
    /// The domain category.
    pub domain_type: DomainType,
    /// Unique domain id.
    pub id: String,
    /// Optional human description.
    pub description: Option<String>,
    /// Optional tags.
    pub tags: Vec<String>,
    /// Visibility weight in `[0, 1]`; only ever decreases via fade.
    pub importance: f32,
    /// Lifecycle status.
    pub status: DomainStatus,
    /// Creation timestamp (Unix seconds).
    pub created_at: u64,
    /// Last fade/update timestamp (Unix seconds).
    pub updated_at: u64,
}

impl MemoryDomain {
    /// Creates a new active domain with full importance.
    #[must_use]
    pub fn new(domain_type: DomainType, id: impl Into<String>) -> Self {
        let now = crate::current_timestamp();
        Self {
            domain_type,
            id: id.into(),
            description: None,
            tags: Vec::new(),
            importance: 1.0,
            status: DomainStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the tags.
    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    /// Applies one multiplicative fade step and refreshes the status
    /// from the importance low-water marks.
    pub fn apply_fade_step(&mut self, factor: f32) {
        self.importance = (self.importance * (1.0 - factor)).clamp(0.0, 1.0);
        self.updated_at = crate::current_timestamp();
        self.refresh_status();
    }

    /// Demotes the status when importance crossed a low-water mark.
    ///
    /// Transitions are monotone: a domain never moves back toward
    /// `Active` here, only explicit re-creation resets it.
    pub fn refresh_status(&mut self) {
        match self.status {
            DomainStatus::Active => {
                if self.importance < ARCHIVE_THRESHOLD {
                    self.status = DomainStatus::Archived;
                } else if self.importance < FADING_THRESHOLD {
                    self.status = DomainStatus::Fading;
                }
            }
            DomainStatus::Fading => {
                if self.importance < ARCHIVE_THRESHOLD {
                    self.status = DomainStatus::Archived;
                }
            }
            DomainStatus::Archived => {}
        }
    }

    /// Returns true if the domain participates in visibility filtering.
    #[must_use]
    pub fn is_visible(&self) -> bool {
        self.status != DomainStatus::Archived
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_domain_is_active() {
        let d = MemoryDomain::new(DomainType::Project, "proj-1");
        assert_eq!(d.status, DomainStatus::Active);
        assert!((d.importance - 1.0).abs() < f32::EPSILON);
        assert!(d.is_visible());
    }

    #[test]
    fn test_fade_step_is_multiplicative() {
        let mut d = MemoryDomain::new(DomainType::Project, "proj-1");
        d.apply_fade_step(0.2);
        assert!((d.importance - 0.8).abs() < 1e-6);
        d.apply_fade_step(0.2);
        assert!((d.importance - 0.64).abs() < 1e-6);
    }

    #[test]
    fn test_full_fade_reaches_zero_and_archives() {
        let mut d = MemoryDomain::new(DomainType::Session, "sess-1");
        d.apply_fade_step(1.0);
        assert!(d.importance.abs() < f32::EPSILON);
        assert_eq!(d.status, DomainStatus::Archived);
        assert!(!d.is_visible());
    }

    #[test]
    fn test_status_crosses_fading_mark() {
        let mut d = MemoryDomain::new(DomainType::User, "u-1");
        d.apply_fade_step(0.9);
        assert_eq!(d.status, DomainStatus::Fading);
        assert!(d.is_visible());
    }

    #[test]
    fn test_status_never_promotes() {
        let mut d = MemoryDomain::new(DomainType::User, "u-1");
        d.apply_fade_step(0.99);
        assert_eq!(d.status, DomainStatus::Archived);
        // A zero fade leaves importance alone and must not resurrect.
        d.apply_fade_step(0.0);
        assert_eq!(d.status, DomainStatus::Archived);
    }

    #[test]
    fn test_domain_type_parse() {
        assert_eq!(DomainType::parse("Instruction"), Some(DomainType::Instruction));
        assert_eq!(DomainType::parse("nope"), None);
    }
}
