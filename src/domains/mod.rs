//! Memory domain lifecycle management.
//!
//! Domain CRUD, fade/decay, visibility filtering, and domain-set
//! switching. The manager holds the domain registry and talks to the
//! retrieval backend for candidate items; item content is never
//! mutated here, only domain importance.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::RetrievalBackend;
use crate::config::FadeSettings;
use crate::models::{
    DomainStatus, DomainType, MemoryDomain, MemoryItem, NavigationParams, NavigationState, Pan,
};
use crate::{Error, Result};

/// Granularity of one gradual fade sub-step, as a fade factor.
const GRADUAL_STEP: f32 = 0.2;

/// Options controlling a fade operation.
#[derive(Debug, Clone, Copy)]
pub struct FadeOptions {
    /// Split the fade into `ceil(factor / 0.2)` equal sub-steps with a
    /// pacing delay between them; each sub-step is an independently
    /// observable state.
    pub gradual: bool,
    /// Apply the importance decay without status demotion. Used by
    /// routine decay passes that should not archive domains.
    pub incremental: bool,
    /// Exempt instruction-type domains from fading.
    pub preserve_instructions: bool,
}

impl Default for FadeOptions {
    fn default() -> Self {
        Self {
            gradual: false,
            incremental: false,
            preserve_instructions: true,
        }
    }
}

/// Manages memory domain lifecycle and visibility.
pub struct MemoryDomainManager<B> {
    backend: B,
    domains: Mutex<HashMap<String, MemoryDomain>>,
    fade: FadeSettings,
}

impl<B: RetrievalBackend> MemoryDomainManager<B> {
    /// Creates a manager over a retrieval backend.
    #[must_use]
    pub fn new(backend: B, fade: FadeSettings) -> Self {
        Self {
            backend,
            domains: Mutex::new(HashMap::new()),
            fade,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, MemoryDomain>>> {
        self.domains
            .lock()
            .map_err(|_| Error::StateUnavailable("domain registry lock poisoned".to_string()))
    }

    /// Creates a domain, idempotently.
    ///
    /// Re-creating an existing id with the same type returns the
    /// existing domain unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DomainTypeConflict`] when the id exists under
    /// a different type.
    pub fn create_domain(
        &self,
        domain_type: DomainType,
        id: &str,
        description: Option<&str>,
        tags: &[String],
    ) -> Result<MemoryDomain> {
        let mut domains = self.lock()?;
        if let Some(existing) = domains.get(id) {
            if existing.domain_type == domain_type {
                return Ok(existing.clone());
            }
            return Err(Error::DomainTypeConflict {
                id: id.to_string(),
                existing: existing.domain_type.to_string(),
                requested: domain_type.to_string(),
            });
        }

        let mut domain = MemoryDomain::new(domain_type, id);
        if let Some(description) = description {
            domain = domain.with_description(description);
        }
        if !tags.is_empty() {
            domain = domain.with_tags(tags.to_vec());
        }
        debug!(domain = id, r#type = %domain_type, "domain created");
        domains.insert(id.to_string(), domain.clone());
        Ok(domain)
    }

    /// Returns a domain by id.
    pub fn get_domain(&self, id: &str) -> Result<Option<MemoryDomain>> {
        Ok(self.lock()?.get(id).cloned())
    }

    /// Returns all domains.
    pub fn list_domains(&self) -> Result<Vec<MemoryDomain>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    /// Switches the effective domain set.
    ///
    /// Domains leaving the set (`old − new`) are faded by
    /// `fade_factor`; domains entering it (`new − old`) are created on
    /// demand when unknown. Domains present in both sets are left
    /// untouched. Returns the new effective set.
    pub async fn switch_domains(
        &self,
        old: &BTreeSet<String>,
        new: &BTreeSet<String>,
        fade_factor: Option<f32>,
    ) -> Result<BTreeSet<String>> {
        let factor = fade_factor.unwrap_or(self.fade.default_fade_factor);

        for removed in old.difference(new) {
            self.fade_context(removed, factor, &FadeOptions::default())
                .await?;
        }
        for added in new.difference(old) {
            if self.get_domain(added)?.is_none() {
                self.create_domain(DomainType::Project, added, None, &[])?;
            }
        }
        Ok(new.clone())
    }

    /// Fades a domain's importance by a multiplicative factor.
    ///
    /// `importance ← importance × (1 − factor)`, with status demotion
    /// when importance crosses the low-water marks. Instruction-type
    /// domains are exempt when `preserve_instructions` is set. When
    /// `gradual`, the total fade is split into `ceil(factor / 0.2)`
    /// equal sub-steps with a cancellable pacing delay between them.
    ///
    /// Returns the faded domain, or `None` for an unknown id (fading
    /// what is not there is a no-op, which keeps domain-set switches
    /// tolerant of caller-supplied sets).
    pub async fn fade_context(
        &self,
        id: &str,
        factor: f32,
        options: &FadeOptions,
    ) -> Result<Option<MemoryDomain>> {
        let factor = factor.clamp(0.0, 1.0);

        let Some(snapshot) = self.get_domain(id)? else {
            warn!(domain = id, "fade requested for unknown domain");
            return Ok(None);
        };
        if options.preserve_instructions && snapshot.domain_type == DomainType::Instruction {
            debug!(domain = id, "instruction domain exempt from fade");
            return Ok(Some(snapshot));
        }
        if factor == 0.0 {
            return Ok(Some(snapshot));
        }

        let steps = if options.gradual {
            (factor / GRADUAL_STEP).ceil() as usize
        } else {
            1
        };
        // Equal multiplicative sub-steps: (1 - step)^steps == 1 - factor.
        #[allow(clippy::cast_precision_loss)]
        let step_factor = if steps > 1 {
            1.0 - (1.0 - factor).powf(1.0 / steps as f32)
        } else {
            factor
        };
        let delay = Duration::from_millis(self.fade.step_delay_ms);

        let mut result = snapshot;
        for step in 0..steps {
            if step > 0 && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            let mut domains = self.lock()?;
            let Some(domain) = domains.get_mut(id) else {
                return Ok(None);
            };
            domain.importance = (domain.importance * (1.0 - step_factor)).clamp(0.0, 1.0);
            domain.updated_at = crate::current_timestamp();
            if !options.incremental {
                domain.refresh_status();
            }
            result = domain.clone();
        }
        debug!(
            domain = id,
            importance = result.importance,
            status = %result.status,
            "domain faded"
        );
        Ok(Some(result))
    }

    /// Returns the candidate items visible under the navigation state.
    ///
    /// Scopes retrieval to `pan.domains` (or all non-archived domains
    /// when empty) and `pan.temporal`, drops items from archived
    /// domains, filters by the state's relevance threshold, and
    /// returns at most `max_memories` items ordered by descending
    /// relevance with ties broken by most-recent timestamp.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::DependencyUnavailable`] when the backend is
    /// unreachable; empty results are never fabricated on failure.
    pub async fn visible_memories(
        &self,
        query: &str,
        nav_state: &NavigationState,
    ) -> Result<Vec<MemoryItem>> {
        let scope: BTreeSet<String> = if nav_state.pan.domains.is_empty() {
            let visible: BTreeSet<String> = self
                .lock()?
                .values()
                .filter(|d| d.is_visible())
                .map(|d| d.id.clone())
                .collect();
            // An empty pan means "all visible domains". When none are
            // visible the answer is no items; passing an empty scope to
            // the backend would mean "unscoped" on the wire and widen
            // retrieval to everything instead.
            if visible.is_empty() {
                return Ok(Vec::new());
            }
            visible
        } else {
            nav_state.pan.domains.clone()
        };

        let params = NavigationParams {
            query: query.to_string(),
            zoom: nav_state.zoom,
            pan: Pan {
                domains: scope,
                temporal: nav_state.pan.temporal,
            },
            tilt: nav_state.tilt,
        };

        let raw_items = self.backend.navigate(&params).await?;

        let archived: BTreeSet<String> = self
            .lock()?
            .values()
            .filter(|d| d.status == DomainStatus::Archived)
            .map(|d| d.id.clone())
            .collect();

        let mut items: Vec<MemoryItem> = raw_items
            .into_iter()
            .filter_map(|raw| raw.into_memory_item("unknown"))
            .filter(|item| !archived.contains(&item.domain_id))
            .filter(|item| item.relevance >= nav_state.relevance_threshold)
            .filter(|item| match (params.pan.temporal, item.timestamp) {
                (Some(window), Some(ts)) => window.contains(ts),
                _ => true,
            })
            .collect();

        items.sort_by(|a, b| {
            b.relevance
                .total_cmp(&a.relevance)
                .then_with(|| b.timestamp.unwrap_or(0).cmp(&a.timestamp.unwrap_or(0)))
        });
        items.truncate(nav_state.max_memories);
        Ok(items)
    }

    /// Returns a reference to the underlying backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }
}
