//! Bounded three-lane priority queue.

use chronicler_core::{ContentKey, Priority, Request, RequestId};
use chronicler_error::{QueueError, QueueErrorKind};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, instrument, warn};

/// Lane capacities, timeouts and dispatch budget.
#[derive(
    Debug,
    Clone,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct QueueConfig {
    /// Urgent lane capacity
    #[serde(default = "default_urgent_capacity")]
    urgent_capacity: usize,

    /// Standard lane capacity
    #[serde(default = "default_standard_capacity")]
    standard_capacity: usize,

    /// Background lane capacity
    #[serde(default = "default_background_capacity")]
    background_capacity: usize,

    /// Cap across all lanes
    #[serde(default = "default_global_capacity")]
    global_capacity: usize,

    /// Ticks an urgent request may wait
    #[serde(default = "default_urgent_timeout_ticks")]
    urgent_timeout_ticks: u64,

    /// Ticks a standard request may wait
    #[serde(default = "default_standard_timeout_ticks")]
    standard_timeout_ticks: u64,

    /// Ticks a background request may wait
    #[serde(default = "default_background_timeout_ticks")]
    background_timeout_ticks: u64,

    /// Requests dispatched per lane per tick
    #[serde(default = "default_dispatch_per_tick")]
    dispatch_per_tick: usize,
}

fn default_urgent_capacity() -> usize {
    5
}

fn default_standard_capacity() -> usize {
    3
}

fn default_background_capacity() -> usize {
    10
}

fn default_global_capacity() -> usize {
    15
}

fn default_urgent_timeout_ticks() -> u64 {
    5
}

fn default_standard_timeout_ticks() -> u64 {
    15
}

fn default_background_timeout_ticks() -> u64 {
    30
}

fn default_dispatch_per_tick() -> usize {
    1
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            urgent_capacity: default_urgent_capacity(),
            standard_capacity: default_standard_capacity(),
            background_capacity: default_background_capacity(),
            global_capacity: default_global_capacity(),
            urgent_timeout_ticks: default_urgent_timeout_ticks(),
            standard_timeout_ticks: default_standard_timeout_ticks(),
            background_timeout_ticks: default_background_timeout_ticks(),
            dispatch_per_tick: default_dispatch_per_tick(),
        }
    }
}

impl QueueConfig {
    /// Capacity of one lane.
    pub fn capacity(&self, priority: Priority) -> usize {
        match priority {
            Priority::Urgent => self.urgent_capacity,
            Priority::Standard => self.standard_capacity,
            Priority::Background => self.background_capacity,
        }
    }

    /// Default wait budget for a priority.
    pub fn timeout_ticks(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Urgent => self.urgent_timeout_ticks,
            Priority::Standard => self.standard_timeout_ticks,
            Priority::Background => self.background_timeout_ticks,
        }
    }

    /// Longest wait budget of any lane.
    pub fn max_timeout_ticks(&self) -> u64 {
        Priority::DISPATCH_ORDER
            .into_iter()
            .map(|priority| self.timeout_ticks(priority))
            .max()
            .unwrap_or(0)
    }
}

/// Queue depth per lane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueDepths {
    /// Urgent lane
    pub urgent: usize,
    /// Standard lane
    pub standard: usize,
    /// Background lane
    pub background: usize,
}

impl QueueDepths {
    /// Requests across all lanes.
    pub fn total(&self) -> usize {
        self.urgent + self.standard + self.background
    }
}

/// Three FIFO lanes drained in strict priority order.
///
/// A request holds its content key from admission until the orchestrator
/// calls [`release`](Self::release), so an identical prompt submitted while
/// the first is queued, retrying or in flight is recognised as a duplicate.
/// Background starvation under sustained urgent load is accepted.
#[derive(Debug, Clone)]
pub struct PriorityRequestQueue {
    config: QueueConfig,
    urgent: VecDeque<Request>,
    standard: VecDeque<Request>,
    background: VecDeque<Request>,
    pending: HashMap<ContentKey, RequestId>,
}

impl PriorityRequestQueue {
    /// Create an empty queue.
    pub fn new(config: QueueConfig) -> Self {
        debug!(
            global_capacity = config.global_capacity,
            "Creating priority request queue"
        );
        Self {
            config,
            urgent: VecDeque::new(),
            standard: VecDeque::new(),
            background: VecDeque::new(),
            pending: HashMap::new(),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    fn lane(&self, priority: Priority) -> &VecDeque<Request> {
        match priority {
            Priority::Urgent => &self.urgent,
            Priority::Standard => &self.standard,
            Priority::Background => &self.background,
        }
    }

    fn lane_mut(&mut self, priority: Priority) -> &mut VecDeque<Request> {
        match priority {
            Priority::Urgent => &mut self.urgent,
            Priority::Standard => &mut self.standard,
            Priority::Background => &mut self.background,
        }
    }

    /// Admit a request.
    ///
    /// # Errors
    ///
    /// `Duplicate` when the same content is already pending, `LaneFull` or
    /// `GlobalFull` when there is no room.
    #[instrument(skip(self, request), fields(id = %request.id(), priority = %request.priority()))]
    pub fn enqueue(&mut self, request: Request) -> Result<(), QueueError> {
        let key = request.content_key();
        if let Some(existing) = self.pending.get(&key) {
            debug!(existing = %existing, "Deduplicated request");
            return Err(QueueError::new(QueueErrorKind::Duplicate {
                existing: existing.value(),
            }));
        }

        let priority = *request.priority();
        let capacity = self.config.capacity(priority);
        if self.lane(priority).len() >= capacity {
            warn!(capacity, "Lane full, rejecting request");
            return Err(QueueError::new(QueueErrorKind::LaneFull {
                priority: priority.to_string(),
                capacity,
            }));
        }
        if self.len() >= self.config.global_capacity {
            warn!(capacity = self.config.global_capacity, "Queue full, rejecting request");
            return Err(QueueError::new(QueueErrorKind::GlobalFull {
                capacity: self.config.global_capacity,
            }));
        }

        self.pending.insert(key, *request.id());
        self.lane_mut(priority).push_back(request);
        debug!(depth = self.len(), "Request admitted");
        Ok(())
    }

    /// Take the next dispatchable request.
    ///
    /// Lanes are scanned urgent first; within a lane the oldest request that
    /// is ready (not waiting on a retry delay) and not expired wins.
    pub fn dequeue(&mut self, current_tick: u64) -> Option<Request> {
        Priority::DISPATCH_ORDER
            .into_iter()
            .find_map(|priority| self.dequeue_from(priority, current_tick))
    }

    /// Take the next dispatchable request from one lane.
    pub fn dequeue_from(&mut self, priority: Priority, current_tick: u64) -> Option<Request> {
        let lane = self.lane_mut(priority);
        let index = lane
            .iter()
            .position(|request| request.is_ready(current_tick) && !request.is_expired(current_tick))?;
        lane.remove(index)
    }

    /// Put a request back after a failed attempt.
    ///
    /// A retry is not a new admission: capacity is not re-checked and the
    /// content key stays reserved.
    pub fn requeue(&mut self, request: Request) {
        debug!(id = %request.id(), retry_tick = request.next_retry_tick(), "Requeued for retry");
        self.lane_mut(*request.priority()).push_back(request);
    }

    /// Drop every request whose deadline has passed and release its key.
    pub fn process_timeouts(&mut self, current_tick: u64) -> Vec<Request> {
        let mut expired = Vec::new();
        for priority in Priority::DISPATCH_ORDER {
            let lane = self.lane_mut(priority);
            let mut index = 0;
            while index < lane.len() {
                if lane[index].is_expired(current_tick) {
                    if let Some(request) = lane.remove(index) {
                        expired.push(request);
                    }
                } else {
                    index += 1;
                }
            }
        }
        for request in &expired {
            warn!(
                id = %request.id(),
                deadline = request.deadline_tick(),
                "Request timed out in queue"
            );
            self.release(&request.content_key());
        }
        expired
    }

    /// Free a content key once its request is resolved.
    pub fn release(&mut self, key: &ContentKey) {
        self.pending.remove(key);
    }

    /// Pending request for a content key, if any.
    pub fn pending_for(&self, key: &ContentKey) -> Option<RequestId> {
        self.pending.get(key).copied()
    }

    /// Requests across all lanes.
    pub fn len(&self) -> usize {
        self.urgent.len() + self.standard.len() + self.background.len()
    }

    /// Check if every lane is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth of every lane.
    pub fn depths(&self) -> QueueDepths {
        QueueDepths {
            urgent: self.urgent.len(),
            standard: self.standard.len(),
            background: self.background.len(),
        }
    }
}
