//! Virtual time for deferred leaf output.
//!
//! Time only advances when the host asks for it, which keeps delayed
//! propagation deterministic in tests. A real-time host sleeps for
//! `time_to_next_timer()` and then advances by the same amount.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Duration;

use super::event_loop::Task;

/// Entry for a pending timer.
#[derive(Debug)]
struct TimerEntry {
    /// When the timer should fire (virtual time)
    fire_at: Duration,
    /// Scheduling order, breaks ties between equal deadlines
    seq: u64,
    task: Task,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Min-heap: earlier deadline first, then earlier schedule
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

pub struct VirtualClock {
    now: Duration,
    next_seq: u64,
    pending: BinaryHeap<TimerEntry>,
}

impl VirtualClock {
    /// Create a clock starting at time 0.
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_seq: 0,
            pending: BinaryHeap::new(),
        }
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Schedule `task` to become runnable `delay` from now.
    pub fn schedule(&mut self, delay: Duration, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(TimerEntry {
            fire_at: self.now + delay,
            seq,
            task,
        });
    }

    /// Pop the earliest timer due at or before `deadline`, moving time to its
    /// fire time.
    pub fn pop_due(&mut self, deadline: Duration) -> Option<Task> {
        if self.pending.peek()?.fire_at > deadline {
            return None;
        }
        let entry = self.pending.pop()?;
        self.now = self.now.max(entry.fire_at);
        Some(entry.task)
    }

    /// Move time forward to `to`. Never moves backwards.
    pub fn advance_to(&mut self, to: Duration) {
        self.now = self.now.max(to);
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Deadline of the next timer, if any.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.peek().map(|entry| entry.fire_at)
    }

    /// Get the time until the next timer fires (if any).
    pub fn time_to_next_timer(&self) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_sub(self.now))
    }

    /// Clear all pending timers.
    pub fn clear_timers(&mut self) {
        self.pending.clear();
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}
