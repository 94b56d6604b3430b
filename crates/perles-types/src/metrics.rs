//! Token and cost accounting for a single subprocess turn.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Token and cost counters for a process. `CumulativeCostUSD` accumulates
/// `TurnCostUSD` monotonically across turns; `TotalCostUSD` always
/// mirrors it (see `spec.md` §3 TokenMetrics, and the supervisor's
/// per-event cost bookkeeping in §4.4.4).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenMetrics {
    /// Tokens consumed by the most recent turn's usage report.
    pub tokens_used: u64,
    /// Total tokens (input + output) reported for the most recent turn.
    pub total_tokens: u64,
    /// Output tokens reported for the most recent turn.
    pub output_tokens: u64,
    /// Cost in USD attributed to the most recent turn alone.
    pub turn_cost_usd: Decimal,
    /// Running sum of every `turn_cost_usd` observed so far.
    pub cumulative_cost_usd: Decimal,
    /// Mirrors `cumulative_cost_usd`; kept separate because it is the
    /// field external callers historically read for "total spend".
    pub total_cost_usd: Decimal,
    /// Wall-clock time this snapshot was taken, as epoch milliseconds.
    pub last_updated_at_ms: i64,
}

impl TokenMetrics {
    /// Build the metrics snapshot for a turn that reported `usage`,
    /// given the cumulative cost already accrued *before* this turn.
    ///
    /// This does not mutate any shared state — the supervisor is
    /// responsible for reading/writing the cumulative total under its
    /// process lock (see `spec.md` §4.4.4 and §5 Shared resource
    /// discipline); this is the pure computation the supervisor calls
    /// once it holds the lock.
    pub fn from_usage(
        tokens_used: u64,
        total_tokens: u64,
        output_tokens: u64,
        turn_cost_usd: Decimal,
        cumulative_before: Decimal,
        now_ms: i64,
    ) -> Self {
        let cumulative = cumulative_before + turn_cost_usd;
        Self {
            tokens_used,
            total_tokens,
            output_tokens,
            turn_cost_usd,
            cumulative_cost_usd: cumulative,
            total_cost_usd: cumulative,
            last_updated_at_ms: now_ms,
        }
    }
}
