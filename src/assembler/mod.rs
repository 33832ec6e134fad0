//! Context assembly orchestration.
//!
//! Fans out to the session cache, the domain manager, and the external
//! enhancer, then merges the blocks that came back under the token
//! budget. Optional sources degrade to "no content" on failure; the
//! budget is enforced with hard errors, never silent truncation past
//! the documented windowing algorithm.

use std::time::Duration;
use tracing::{debug, warn};

use crate::backend::{
    Embedder, Enhancement, EnhancementFlags, NoopEmbedder, NoopEnhancer, QueryEnhancer,
    RetrievalBackend,
};
use crate::config::EngineConfig;
use crate::domains::MemoryDomainManager;
use crate::models::{ContextBudget, Interaction, MemoryItem, RawBudget};
use crate::navigation::NavigationStateManager;
use crate::window::{estimate_tokens, reduce_to_budget};
use crate::{Error, Result, projection};

/// Answer returned when no source produced any content, instead of
/// invoking the downstream LLM call.
pub const NO_CONTEXT_ANSWER: &str =
    "No relevant information was found in memory, session history, or external sources.";

/// Delimiter between labeled context blocks.
const BLOCK_DELIMITER: &str = "\n\n---\n\n";

/// Which sources an assembly consults.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceSelection {
    /// Recent session interactions.
    pub recent: bool,
    /// Local domain memory. When set, backend unavailability is
    /// surfaced instead of silently degrading.
    pub local: bool,
    /// External knowledge enhancement.
    pub external: bool,
}

impl SourceSelection {
    /// Consults every source.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            recent: true,
            local: true,
            external: true,
        }
    }

    /// Consults local memory only.
    #[must_use]
    pub const fn local_only() -> Self {
        Self {
            recent: false,
            local: true,
            external: false,
        }
    }
}

impl Default for SourceSelection {
    fn default() -> Self {
        Self::all()
    }
}

/// Which sources actually contributed content to an assembly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceReport {
    /// Recent interactions contributed a block.
    pub recent: bool,
    /// Local memory contributed a block.
    pub local: bool,
    /// An enhancement contributed a block.
    pub external: bool,
}

impl SourceReport {
    /// Returns true if no source contributed.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        !self.recent && !self.local && !self.external
    }
}

/// The outcome of a context assembly.
///
/// `success=false` carries a recoverable, user-visible answer (for
/// example when the memory backend was unreachable while local context
/// was explicitly requested); it is distinct from the hard errors in
/// [`Error`], which indicate programming or deployment mistakes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// Whether assembly completed normally.
    pub success: bool,
    /// The bounded prompt, ready for the downstream LLM call.
    pub prompt: Option<String>,
    /// A direct answer bypassing the LLM call: the no-content sentinel
    /// or a recoverable failure description.
    pub answer: Option<String>,
    /// Which sources contributed.
    pub sources: SourceReport,
}

enum LocalOutcome {
    Skipped,
    Items(Vec<MemoryItem>),
    Unreachable(String),
}

enum ExternalOutcome {
    Nothing,
    Enhanced(Enhancement),
}

/// Orchestrates Ask/Recall context assembly for one session.
pub struct ContextAssembler<B, E = NoopEnhancer, M = NoopEmbedder> {
    navigation: NavigationStateManager,
    domains: MemoryDomainManager<B>,
    budget: ContextBudget,
    source_timeout: Duration,
    enhancer: Option<E>,
    embedder: Option<M>,
    flags: EnhancementFlags,
}

impl<B: RetrievalBackend> ContextAssembler<B> {
    /// Creates an assembler for a session over a retrieval backend.
    #[must_use]
    pub fn new(config: &EngineConfig, backend: B, session_id: impl Into<String>) -> Self {
        let navigation = NavigationStateManager::new(session_id, &config.navigation)
            .with_session_cache(config.navigation.session_cache_capacity);
        let domains = MemoryDomainManager::new(backend, config.fade);
        Self {
            navigation,
            domains,
            budget: config.context,
            source_timeout: Duration::from_millis(config.timeouts.source_timeout_ms),
            enhancer: None,
            embedder: None,
            flags: EnhancementFlags::default(),
        }
    }
}

impl<B, E, M> ContextAssembler<B, E, M>
where
    B: RetrievalBackend,
    E: QueryEnhancer,
    M: Embedder,
{
    /// Attaches an external enhancer.
    #[must_use]
    pub fn with_enhancer<E2: QueryEnhancer>(
        self,
        enhancer: E2,
        flags: EnhancementFlags,
    ) -> ContextAssembler<B, E2, M> {
        ContextAssembler {
            navigation: self.navigation,
            domains: self.domains,
            budget: self.budget,
            source_timeout: self.source_timeout,
            enhancer: Some(enhancer),
            embedder: self.embedder,
            flags,
        }
    }

    /// Attaches an embedding provider for focus embeddings.
    #[must_use]
    pub fn with_embedder<M2: Embedder>(self, embedder: M2) -> ContextAssembler<B, E, M2> {
        ContextAssembler {
            navigation: self.navigation,
            domains: self.domains,
            budget: self.budget,
            source_timeout: self.source_timeout,
            enhancer: self.enhancer,
            embedder: Some(embedder),
            flags: self.flags,
        }
    }

    /// Returns the session's navigation manager.
    pub const fn navigation(&self) -> &NavigationStateManager {
        &self.navigation
    }

    /// Returns the domain manager.
    pub const fn domains(&self) -> &MemoryDomainManager<B> {
        &self.domains
    }

    /// Assembles a bounded prompt context with the configured budget
    /// and per-branch timeout.
    ///
    /// # Errors
    ///
    /// Returns budget violations and configuration errors; transient
    /// source failures degrade or surface as a recoverable
    /// [`Assembly`] instead.
    pub async fn assemble(&self, question: &str, sources: &SourceSelection) -> Result<Assembly> {
        self.assemble_with_deadline(question, sources, self.source_timeout)
            .await
    }

    /// Assembles with a caller-supplied deadline.
    ///
    /// The deadline bounds each fan-out branch; expired branches are
    /// abandoned and assembly proceeds with whatever completed. The
    /// deadline is never relaxed to accommodate more completions.
    pub async fn assemble_with_deadline(
        &self,
        question: &str,
        sources: &SourceSelection,
        deadline: Duration,
    ) -> Result<Assembly> {
        let budget = self.budget;
        self.assemble_inner(question, &budget, sources, deadline).await
    }

    /// Assembles with an unvalidated budget, validating it before any
    /// source is touched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] naming the first missing
    /// budget field.
    pub async fn assemble_with_budget(
        &self,
        question: &str,
        raw: &RawBudget,
        sources: &SourceSelection,
    ) -> Result<Assembly> {
        let budget = ContextBudget::from_raw(raw)?;
        self.assemble_inner(question, &budget, sources, self.source_timeout)
            .await
    }

    async fn assemble_inner(
        &self,
        question: &str,
        budget: &ContextBudget,
        sources: &SourceSelection,
        deadline: Duration,
    ) -> Result<Assembly> {
        self.update_focus(question, deadline).await?;

        let mut report = SourceReport::default();
        let mut blocks: Vec<String> = Vec::new();

        // Recent session context comes from the in-memory cache; the
        // backend-facing branches below fan out concurrently.
        if sources.recent && budget.recent_interactions_count > 0 {
            match self.navigation.recent_interactions(budget.recent_interactions_count) {
                Ok(interactions) if !interactions.is_empty() => {
                    report.recent = true;
                    blocks.push(format_recent_block(
                        &interactions,
                        budget.recent_interactions_truncation_limit,
                    ));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "recent-session source degraded to no content");
                }
            }
        }

        let state = self.navigation.state()?;

        let local_branch = async {
            if !sources.local {
                return LocalOutcome::Skipped;
            }
            match tokio::time::timeout(deadline, self.domains.visible_memories(question, &state))
                .await
            {
                Ok(Ok(items)) => LocalOutcome::Items(items),
                Ok(Err(e)) => LocalOutcome::Unreachable(e.to_string()),
                Err(_) => LocalOutcome::Unreachable(format!(
                    "timed out after {}ms",
                    deadline.as_millis()
                )),
            }
        };

        let external_branch = async {
            if !sources.external {
                return ExternalOutcome::Nothing;
            }
            let Some(enhancer) = self.enhancer.as_ref() else {
                return ExternalOutcome::Nothing;
            };
            match tokio::time::timeout(deadline, enhancer.enhance(question, &self.flags)).await {
                Ok(Ok(Some(enhancement))) => ExternalOutcome::Enhanced(enhancement),
                Ok(Ok(None)) => ExternalOutcome::Nothing,
                Ok(Err(e)) => {
                    warn!(error = %e, "enhancement source degraded to no content");
                    ExternalOutcome::Nothing
                }
                Err(_) => {
                    warn!(deadline_ms = deadline.as_millis() as u64, "enhancement timed out");
                    ExternalOutcome::Nothing
                }
            }
        };

        // Budgeting below is the synchronization barrier: it starts
        // only once both branches completed or timed out.
        let (local, external) = tokio::join!(local_branch, external_branch);

        match local {
            LocalOutcome::Skipped => {}
            LocalOutcome::Unreachable(cause) => {
                // Local context was explicitly requested: callers must
                // be able to distinguish "no memory found" from
                // "memory backend unreachable".
                return Ok(Assembly {
                    success: false,
                    prompt: None,
                    answer: Some(format!(
                        "Local memory could not be consulted ({cause}); \
                         zoom={}, tilt={}, budget={} tokens.",
                        state.zoom, state.tilt, budget.max_tokens
                    )),
                    sources: report,
                });
            }
            LocalOutcome::Items(items) if items.is_empty() => {}
            LocalOutcome::Items(mut items) => {
                report.local = true;
                // Earliest-ranked-first truncation of the list.
                items.truncate(budget.max_context_size);
                for item in &mut items {
                    item.content = truncate_chars(&item.content, budget.truncation_limit);
                }
                blocks.push(format!(
                    "## Local Memory\n{}",
                    projection::project(&items, state.tilt)
                ));
            }
        }

        if let ExternalOutcome::Enhanced(enhancement) = external {
            if !enhancement.combined_prompt.trim().is_empty() {
                report.external = true;
                blocks.push(format!(
                    "## External Knowledge\n{}",
                    enhancement.combined_prompt
                ));
            }
        }

        if blocks.is_empty() {
            debug!("no source produced content; returning sentinel answer");
            return Ok(Assembly {
                success: true,
                prompt: None,
                answer: Some(NO_CONTEXT_ANSWER.to_string()),
                sources: report,
            });
        }

        let context = blocks.join(BLOCK_DELIMITER);
        let prompt = self.fit_prompt(question, &context, budget)?;

        Ok(Assembly {
            success: true,
            prompt: Some(prompt),
            answer: None,
            sources: report,
        })
    }

    /// Updates the session focus, best-effort embedding included.
    async fn update_focus(&self, question: &str, deadline: Duration) -> Result<()> {
        let embedding = match self.embedder.as_ref() {
            None => None,
            Some(embedder) => {
                match tokio::time::timeout(deadline, embedder.embed(question)).await {
                    Ok(Ok(vector)) => Some(vector),
                    Ok(Err(e)) => {
                        debug!(error = %e, "focus embedding unavailable");
                        None
                    }
                    Err(_) => {
                        debug!("focus embedding timed out");
                        None
                    }
                }
            }
        };
        self.navigation.set_focus(question, embedding)?;
        Ok(())
    }

    /// Fits the context into the prompt template under the budget.
    fn fit_prompt(&self, question: &str, context: &str, budget: &ContextBudget) -> Result<String> {
        let template_tokens = estimate_tokens(&build_prompt(question, ""));
        let available = budget.max_tokens.saturating_sub(template_tokens);
        if available == 0 {
            return Err(Error::BudgetExceeded {
                template_tokens,
                max_tokens: budget.max_tokens,
            });
        }

        let context = if estimate_tokens(context) > available {
            debug!(
                context_tokens = estimate_tokens(context),
                available, "windowing oversized context"
            );
            reduce_to_budget(context, available)
        } else {
            context.to_string()
        };

        let prompt = build_prompt(question, &context);
        let actual_tokens = estimate_tokens(&prompt);
        if actual_tokens > budget.max_tokens {
            return Err(Error::PromptBudgetExceeded {
                actual_tokens,
                max_tokens: budget.max_tokens,
            });
        }
        Ok(prompt)
    }
}

/// Interpolates the fixed prompt template.
fn build_prompt(question: &str, context: &str) -> String {
    format!(
        "Answer the question using the provided context.\n\n\
         Context:\n{context}\n\nQuestion: {question}\n"
    )
}

/// Renders the recent-interaction block with per-response truncation.
fn format_recent_block(interactions: &[Interaction], limit: usize) -> String {
    let body = interactions
        .iter()
        .map(|interaction| {
            format!(
                "USER: {}\nASSISTANT: {}",
                interaction.prompt,
                truncate_chars(&interaction.response, limit)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("## Recent Session\n{body}")
}

/// Truncates to a character count with an ellipsis marker when
/// exceeded.
fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        text.to_string()
    } else {
        let kept: String = text.chars().take(limit).collect();
        format!("{kept}...")
    }
}
