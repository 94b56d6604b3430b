//! Per-process mutable state guarded by a single lock
//! (`spec.md` §4.4.4: "store it (under lock)", "under lock, add...").

use std::sync::Mutex;

use perles_buffer::OutputBuffer;
use perles_types::{SessionId, TokenMetrics, TurnError};
use rust_decimal::Decimal;

struct Locked {
    session_id: Option<SessionId>,
    cumulative_cost_usd: Decimal,
    last_error: Option<TurnError>,
    metrics: TokenMetrics,
}

/// Session id, running cumulative cost, the sticky last error, metrics,
/// and the recent-output ring — everything a supervisor's event loop
/// mutates while draining a turn.
pub struct SupervisorState {
    locked: Mutex<Locked>,
    buffer: OutputBuffer,
}

impl SupervisorState {
    /// Build state for a freshly constructed supervisor.
    pub fn new(session_id: Option<SessionId>, buffer_capacity: usize) -> Self {
        Self {
            locked: Mutex::new(Locked {
                session_id,
                cumulative_cost_usd: Decimal::ZERO,
                last_error: None,
                metrics: TokenMetrics::default(),
            }),
            buffer: OutputBuffer::new(buffer_capacity),
        }
    }

    /// Current session id.
    pub fn session_id(&self) -> Option<SessionId> {
        self.locked.lock().expect("supervisor state mutex poisoned").session_id.clone()
    }

    /// Overwrite the session id (`spec.md` §4.4.4: "Provider always
    /// sends the current session id").
    pub fn set_session_id(&self, session_id: SessionId) {
        self.locked.lock().expect("supervisor state mutex poisoned").session_id = Some(session_id);
    }

    /// Roll the session id back to `at_turn_start`, or clear it if that
    /// was `None` (`spec.md` §4.4.6 step 3).
    pub fn rollback_session_id(&self, at_turn_start: Option<SessionId>) {
        self.locked.lock().expect("supervisor state mutex poisoned").session_id = at_turn_start;
    }

    /// Current metrics snapshot.
    pub fn metrics(&self) -> TokenMetrics {
        self.locked.lock().expect("supervisor state mutex poisoned").metrics.clone()
    }

    /// Apply a usage update: compute new [`TokenMetrics`] from the
    /// reported per-turn figures and the running cumulative cost, then
    /// replace both (`spec.md` §4.4.4).
    pub fn record_usage(
        &self,
        tokens_used: u64,
        total_tokens: u64,
        output_tokens: u64,
        turn_cost_usd: Decimal,
        now_ms: i64,
    ) -> TokenMetrics {
        let mut locked = self.locked.lock().expect("supervisor state mutex poisoned");
        let metrics = TokenMetrics::from_usage(
            tokens_used,
            total_tokens,
            output_tokens,
            turn_cost_usd,
            locked.cumulative_cost_usd,
            now_ms,
        );
        locked.cumulative_cost_usd = metrics.cumulative_cost_usd;
        locked.metrics = metrics.clone();
        metrics
    }

    /// Current last-recorded error, if any.
    pub fn last_error(&self) -> Option<TurnError> {
        self.locked.lock().expect("supervisor state mutex poisoned").last_error.clone()
    }

    /// Record `error`, honoring the context-exceeded stickiness rule
    /// (`spec.md` §4.4.4, §4.4.5).
    pub fn record_error(&self, error: TurnError) {
        let mut locked = self.locked.lock().expect("supervisor state mutex poisoned");
        TurnError::record_sticky(&mut locked.last_error, error);
    }

    /// The shared output ring buffer.
    pub fn buffer(&self) -> &OutputBuffer {
        &self.buffer
    }
}
