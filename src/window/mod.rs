//! Context window management.
//!
//! Token estimation, sliding-window chunking, and overlap-aware merge.
//! Pure string processing with no I/O; every function here is
//! deterministic so budgeting decisions are reproducible.

use serde::{Deserialize, Serialize};

/// Approximate characters per token for English text.
const CHARS_PER_TOKEN: usize = 4;

/// Estimates the token count of a text.
///
/// A character-ratio approximation: deterministic and monotonic in
/// text length, which is all the budgeting algorithm relies on.
#[must_use]
pub const fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(CHARS_PER_TOKEN)
}

/// Sliding-window configuration, in tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Maximum window size in tokens.
    pub max_window_size: usize,
    /// Minimum window size in tokens, unless the text itself is
    /// smaller.
    pub min_window_size: usize,
    /// Overlap between adjacent windows in tokens.
    pub overlap: usize,
}

impl WindowConfig {
    /// Creates a config with an overlap of one eighth of the maximum
    /// window, at least one token.
    #[must_use]
    pub const fn new(max_window_size: usize, min_window_size: usize) -> Self {
        let overlap = if max_window_size / 8 == 0 {
            1
        } else {
            max_window_size / 8
        };
        Self {
            max_window_size,
            min_window_size,
            overlap,
        }
    }
}

/// One overlapping segment of a larger text.
///
/// Ephemeral: produced by [`process_context`] and consumed immediately
/// by the merge step, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// Byte offset of the segment start in the source text.
    pub start: usize,
    /// Byte offset one past the segment end.
    pub end: usize,
    /// The segment text.
    pub text: String,
    /// Estimated tokens for the segment.
    pub token_estimate: usize,
}

/// Steps an index back to the nearest char boundary.
fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    while idx > 0 && !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Finds a cut point at or before `end`, preferring a word boundary so
/// no word is split across windows.
fn align_cut(text: &str, start: usize, end: usize) -> usize {
    if end >= text.len() {
        return text.len();
    }
    let end = floor_char_boundary(text, end);
    let last_ws = text[start..end]
        .char_indices()
        .rev()
        .find(|(_, c)| c.is_whitespace());
    match last_ws {
        // Cut after the whitespace so the separator stays with the
        // leading window.
        Some((pos, c)) if pos > 0 => start + pos + c.len_utf8(),
        _ => end,
    }
}

/// Splits a text into overlapping windows.
///
/// Each window estimates at no more than `cfg.max_window_size` tokens
/// and no fewer than `cfg.min_window_size` unless the text itself is
/// smaller. Adjacent windows overlap by roughly `cfg.overlap` tokens
/// so no semantic unit is fully lost at a boundary.
#[must_use]
pub fn process_context(text: &str, cfg: &WindowConfig) -> Vec<ContextWindow> {
    if text.is_empty() || cfg.max_window_size == 0 {
        return Vec::new();
    }

    let window_chars = cfg.max_window_size * CHARS_PER_TOKEN;
    let overlap_chars = (cfg.overlap * CHARS_PER_TOKEN).min(window_chars.saturating_sub(1));
    let min_chars = cfg.min_window_size * CHARS_PER_TOKEN;

    if text.len() <= window_chars {
        return vec![make_window(text, 0, text.len())];
    }

    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let mut end = align_cut(text, start, start + window_chars);
        if end <= start {
            // Pathological input (single unbreakable run); force progress
            // to the next char boundary past the nominal cut.
            let mut forced = floor_char_boundary(text, (start + window_chars).min(text.len()));
            while forced <= start {
                forced += 1;
                while forced < text.len() && !text.is_char_boundary(forced) {
                    forced += 1;
                }
            }
            end = forced.min(text.len());
        }

        // Rebalance an undersized tail backwards into the overlap.
        if end == text.len() && text.len() - start < min_chars && !windows.is_empty() {
            start = floor_char_boundary(text, text.len().saturating_sub(min_chars));
        }

        windows.push(make_window(text, start, end));
        if end == text.len() {
            break;
        }

        let mut next = end.saturating_sub(overlap_chars);
        next = floor_char_boundary(text, next);
        if next <= start {
            next = end;
        }
        start = next;
    }
    windows
}

fn make_window(text: &str, start: usize, end: usize) -> ContextWindow {
    let segment = &text[start..end];
    ContextWindow {
        start,
        end,
        text: segment.to_string(),
        token_estimate: estimate_tokens(segment),
    }
}

/// Reassembles windows into one string, deduplicating the overlapping
/// spans: content inside the overlap of two adjacent windows appears
/// once in the output.
#[must_use]
pub fn merge_overlapping(windows: &[ContextWindow]) -> String {
    let mut out = String::new();
    let mut covered_end = 0;
    for window in windows {
        if out.is_empty() || window.start >= covered_end {
            out.push_str(&window.text);
            covered_end = window.end;
        } else if window.end > covered_end {
            let skip = covered_end - window.start;
            out.push_str(&window.text[skip..]);
            covered_end = window.end;
        }
    }
    out
}

/// Reduces a text to fit a token budget via the documented windowing
/// algorithm.
///
/// The text is windowed at the budget size and the longest prefix of
/// windows whose overlap-aware merge still estimates within the budget
/// is kept. Kept content is preserved verbatim; the result never
/// exceeds `max_tokens`.
#[must_use]
pub fn reduce_to_budget(text: &str, max_tokens: usize) -> String {
    if estimate_tokens(text) <= max_tokens {
        return text.to_string();
    }
    if max_tokens == 0 {
        return String::new();
    }

    let cfg = WindowConfig::new(max_tokens, (max_tokens / 4).max(1));
    let windows = process_context(text, &cfg);

    let mut kept = String::new();
    for upto in 1..=windows.len() {
        let candidate = merge_overlapping(&windows[..upto]);
        if estimate_tokens(&candidate) > max_tokens {
            break;
        }
        kept = candidate;
    }
    kept
}
