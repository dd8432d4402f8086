//! Context-window truncation.
//!
//! Runs before every remote call.  The transcript grows monotonically for the
//! whole session, so a once-per-session trim would not stay inside budget.
//! The first turn is durable session context and is always retained; the rest
//! of the window is the most recent suffix that fits both the message-count
//! and the estimated-token budget.

use scribe_domain::config::ContextConfig;
use scribe_domain::trace::TraceEvent;
use scribe_domain::turn::Turn;

/// Estimated token cost of one turn: `ceil(chars / 4)`.
///
/// A fixed divisor approximating text-to-token density.  Used for budgeting
/// only, never for billing.
pub fn estimate_tokens(turn: &Turn) -> u64 {
    (turn.text.len() as u64).div_ceil(4)
}

/// Truncate a transcript to the configured budgets.
///
/// * At or under `max_messages` turns: returned unchanged.
/// * Otherwise: the first turn, plus the suffix of most recent turns walked
///   newest → oldest, stopping before the suffix would exceed either
///   `max_messages - 1` turns or `max_token_estimate` estimated tokens.
///
/// Emits [`TraceEvent::ContextTruncated`] only when turns were dropped.
pub fn truncate(turns: &[Turn], config: &ContextConfig) -> Vec<Turn> {
    if turns.len() <= config.max_messages {
        return turns.to_vec();
    }

    let first = &turns[0];
    let suffix_budget = config.max_messages.saturating_sub(1);

    let mut kept_tokens: u64 = estimate_tokens(first);
    let mut suffix_start = turns.len();
    for (idx, turn) in turns.iter().enumerate().rev() {
        if turns.len() - suffix_start >= suffix_budget {
            break;
        }
        let cost = estimate_tokens(turn);
        if kept_tokens + cost > config.max_token_estimate {
            break;
        }
        kept_tokens += cost;
        suffix_start = idx;
    }

    let mut result = Vec::with_capacity(1 + (turns.len() - suffix_start));
    result.push(first.clone());
    result.extend_from_slice(&turns[suffix_start..]);

    let dropped = turns.len() - result.len();
    if dropped > 0 {
        TraceEvent::ContextTruncated {
            dropped_turns: dropped,
            tokens_kept: kept_tokens,
        }
        .emit();
    }

    result
}
