//! Request admission and queue timeout errors.

/// Specific queue error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum QueueErrorKind {
    /// The request's priority lane is at capacity
    #[display("{} lane is full ({} requests)", priority, capacity)]
    LaneFull {
        /// Lane that rejected the request
        priority: String,
        /// Lane capacity
        capacity: usize,
    },
    /// The queue as a whole is at capacity
    #[display("Request queue is full ({} requests)", capacity)]
    GlobalFull {
        /// Global capacity
        capacity: usize,
    },
    /// An identical request is already queued or in flight
    #[display("Duplicate of pending request req-{}", existing)]
    Duplicate {
        /// Id of the pending request the caller should wait on
        existing: u64,
    },
    /// The request waited past its deadline and was dropped
    #[display("Request req-{} timed out at tick {}", request_id, deadline_tick)]
    TimedOut {
        /// Dropped request
        request_id: u64,
        /// Last tick the request could have been dispatched
        deadline_tick: u64,
    },
}

/// Queue error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Queue Error: {} at line {} in {}", kind, line, file)]
pub struct QueueError {
    kind: QueueErrorKind,
    line: u32,
    file: &'static str,
}

impl QueueError {
    /// Create a new queue error with caller location tracking.
    #[track_caller]
    pub fn new(kind: QueueErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// Get the error kind.
    pub fn kind(&self) -> &QueueErrorKind {
        &self.kind
    }
}
