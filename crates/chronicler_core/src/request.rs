//! The outbound request model.

use crate::{CallType, ContentKey};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};

/// Identifier assigned to a request at submission.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::From,
)]
#[display("req-{}", _0)]
pub struct RequestId(u64);

impl RequestId {
    /// Raw numeric value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Dispatch lane of a request. Lanes are served in strict priority order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Priority {
    /// Player-facing, latency sensitive
    Urgent,
    /// Regular simulation content
    Standard,
    /// Ambient flavor; may starve under urgent load
    Background,
}

impl Priority {
    /// Lanes in the order they are served.
    pub const DISPATCH_ORDER: [Priority; 3] =
        [Priority::Urgent, Priority::Standard, Priority::Background];
}

/// One outbound generation call.
///
/// Everything except the retry bookkeeping (`attempt_count`,
/// `next_retry_tick`) is fixed at construction.
///
/// # Examples
///
/// ```
/// use chronicler_core::{CallType, Priority, Request, RequestId};
///
/// let request = Request::new(
///     RequestId::from(1),
///     Priority::Urgent,
///     "Interpret: raise taxes",
///     CallType::DecisionInterpretation,
///     10,
///     5,
///     3,
/// );
/// assert!(!request.is_expired(15));
/// assert!(request.is_expired(16));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct Request {
    id: RequestId,
    priority: Priority,
    prompt: String,
    call_type: CallType,
    enqueued_tick: u64,
    timeout_ticks: u64,
    attempt_count: u32,
    max_attempts: u32,
    next_retry_tick: u64,
}

impl Request {
    /// Create a request enqueued at `enqueued_tick`.
    pub fn new(
        id: RequestId,
        priority: Priority,
        prompt: impl Into<String>,
        call_type: CallType,
        enqueued_tick: u64,
        timeout_ticks: u64,
        max_attempts: u32,
    ) -> Self {
        Self {
            id,
            priority,
            prompt: prompt.into(),
            call_type,
            enqueued_tick,
            timeout_ticks,
            attempt_count: 0,
            max_attempts: max_attempts.max(1),
            next_retry_tick: enqueued_tick,
        }
    }

    /// Content key used for deduplication and caching.
    pub fn content_key(&self) -> ContentKey {
        ContentKey::new(&self.prompt, self.call_type)
    }

    /// Last tick on which this request may still be dispatched.
    pub fn deadline_tick(&self) -> u64 {
        self.enqueued_tick.saturating_add(self.timeout_ticks)
    }

    /// True once `enqueued_tick + timeout_ticks < current_tick`.
    pub fn is_expired(&self, current_tick: u64) -> bool {
        self.deadline_tick() < current_tick
    }

    /// True when no retry delay is pending at `current_tick`.
    pub fn is_ready(&self, current_tick: u64) -> bool {
        self.next_retry_tick <= current_tick
    }

    /// Attempts left before the retry budget is spent.
    pub fn attempts_remaining(&self) -> u32 {
        self.max_attempts.saturating_sub(self.attempt_count)
    }

    /// Count a dispatch attempt and return its zero-based number.
    pub fn begin_attempt(&mut self) -> u32 {
        let attempt = self.attempt_count;
        self.attempt_count += 1;
        attempt
    }

    /// Hold the request back until `tick`.
    pub fn schedule_retry(&mut self, tick: u64) {
        self.next_retry_tick = tick;
    }
}
