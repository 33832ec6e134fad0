//! Configuration management.
//!
//! The context budget section is strictly validated at load time: a
//! missing key aborts startup with a `ConfigurationError` instead of
//! being defaulted deep inside a budgeting call. The remaining
//! sections are tunables with documented defaults.

use serde::Deserialize;
use std::path::Path;

use crate::models::{ContextBudget, RawBudget};
use crate::{Error, Result};

/// Main configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Validated context budget. Required, no defaults.
    pub context: ContextBudget,
    /// Navigation state tunables.
    pub navigation: NavigationSettings,
    /// Domain fade tunables.
    pub fade: FadeSettings,
    /// Fan-out timeout tunables.
    pub timeouts: TimeoutSettings,
}

/// Navigation state tunables.
#[derive(Debug, Clone, Copy)]
pub struct NavigationSettings {
    /// Capacity of the per-session state history stack.
    pub history_limit: usize,
    /// Minimum relevance for visible memories.
    pub relevance_threshold: f32,
    /// Maximum visible memories returned per query.
    pub max_memories: usize,
    /// Capacity of the per-session interaction cache.
    pub session_cache_capacity: usize,
}

impl Default for NavigationSettings {
    fn default() -> Self {
        Self {
            history_limit: 50,
            relevance_threshold: 0.3,
            max_memories: 10,
            session_cache_capacity: 100,
        }
    }
}

/// Domain fade tunables.
#[derive(Debug, Clone, Copy)]
pub struct FadeSettings {
    /// Fade factor applied by domain switches when the caller gives
    /// none.
    pub default_fade_factor: f32,
    /// Delay between gradual fade sub-steps, in milliseconds.
    ///
    /// Pacing only; the sub-step count is what carries the semantics.
    pub step_delay_ms: u64,
}

impl Default for FadeSettings {
    fn default() -> Self {
        Self {
            default_fade_factor: 0.1,
            step_delay_ms: 0,
        }
    }
}

/// Fan-out timeout tunables.
#[derive(Debug, Clone, Copy)]
pub struct TimeoutSettings {
    /// Per-branch timeout for source fetches, in milliseconds.
    pub source_timeout_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            source_timeout_ms: 5_000,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Context budget section. Required.
    pub context: Option<RawBudget>,
    /// Navigation section.
    pub navigation: Option<ConfigFileNavigation>,
    /// Fade section.
    pub fade: Option<ConfigFileFade>,
    /// Timeouts section.
    pub timeouts: Option<ConfigFileTimeouts>,
}

/// Navigation section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileNavigation {
    /// History stack capacity.
    pub history_limit: Option<usize>,
    /// Relevance threshold.
    pub relevance_threshold: Option<f32>,
    /// Maximum visible memories.
    pub max_memories: Option<usize>,
    /// Session cache capacity.
    pub session_cache_capacity: Option<usize>,
}

/// Fade section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileFade {
    /// Default fade factor.
    pub default_fade_factor: Option<f32>,
    /// Gradual fade step delay.
    pub step_delay_ms: Option<u64>,
}

/// Timeouts section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileTimeouts {
    /// Per-branch source timeout.
    pub source_timeout_ms: Option<u64>,
}

impl EngineConfig {
    /// Creates a configuration from a validated budget, with default
    /// tunables elsewhere.
    #[must_use]
    pub fn from_budget(context: ContextBudget) -> Self {
        Self {
            context,
            navigation: NavigationSettings::default(),
            fade: FadeSettings::default(),
            timeouts: TimeoutSettings::default(),
        }
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the file cannot be
    /// read or parsed, or if any context budget key is missing.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigurationError(format!("cannot read {}: {e}", path.display()))
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
            Error::ConfigurationError(format!("cannot parse {}: {e}", path.display()))
        })?;

        Self::from_config_file(file)
    }

    /// Converts a parsed [`ConfigFile`] into a validated config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] when the `[context]`
    /// section or any of its keys is missing.
    pub fn from_config_file(file: ConfigFile) -> Result<Self> {
        let raw = file
            .context
            .ok_or_else(|| Error::ConfigurationError("[context] section missing".to_string()))?;
        let context = ContextBudget::from_raw(&raw)?;

        let mut navigation = NavigationSettings::default();
        if let Some(section) = file.navigation {
            if let Some(v) = section.history_limit {
                navigation.history_limit = v;
            }
            if let Some(v) = section.relevance_threshold {
                navigation.relevance_threshold = v.clamp(0.0, 1.0);
            }
            if let Some(v) = section.max_memories {
                navigation.max_memories = v;
            }
            if let Some(v) = section.session_cache_capacity {
                navigation.session_cache_capacity = v;
            }
        }

        let mut fade = FadeSettings::default();
        if let Some(section) = file.fade {
            if let Some(v) = section.default_fade_factor {
                fade.default_fade_factor = v.clamp(0.0, 1.0);
            }
            if let Some(v) = section.step_delay_ms {
                fade.step_delay_ms = v;
            }
        }

        let mut timeouts = TimeoutSettings::default();
        if let Some(section) = file.timeouts {
            if let Some(v) = section.source_timeout_ms {
                timeouts.source_timeout_ms = v;
            }
        }

        Ok(Self {
            context,
            navigation,
            fade,
            timeouts,
        })
    }
}
