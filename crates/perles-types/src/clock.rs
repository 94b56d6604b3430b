//! Wall-clock helper shared by every crate that stamps entities with
//! epoch milliseconds.

/// Current time as epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
