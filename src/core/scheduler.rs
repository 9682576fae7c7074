//! Deferred work run by the controller's own loop.
//!
//! There are no worker threads: a task queued here runs on the next turn
//! of the run loop after its due time. Handlers that answer
//! [`Outcome::Pending`](super::registry::Outcome::Pending) use this to report
//! their exit code later.

use std::time::{Duration, Instant};

/// Deferred unit of work.
pub type Task<C> = Box<dyn FnOnce(&C)>;

struct Scheduled<C> {
    due: Instant,
    seq: u64,
    task: Task<C>,
}

/// Time-ordered task queue. Tasks due at the same instant run in the order
/// they were scheduled.
pub struct Scheduler<C> {
    queue: Vec<Scheduled<C>>,
    next_seq: u64,
}

impl<C> Default for Scheduler<C> {
    fn default() -> Self {
        Self {
            queue: Vec::new(),
            next_seq: 0,
        }
    }
}

impl<C> Scheduler<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, now: Instant, delay: Duration, task: Task<C>) {
        let item = Scheduled {
            due: now + delay,
            seq: self.next_seq,
            task,
        };
        self.next_seq += 1;
        let pos = self
            .queue
            .iter()
            .position(|s| (s.due, s.seq) > (item.due, item.seq))
            .unwrap_or(self.queue.len());
        self.queue.insert(pos, item);
    }

    /// Remove the earliest task if it is due at `now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<Task<C>> {
        if self.queue.first().map_or(false, |s| s.due <= now) {
            Some(self.queue.remove(0).task)
        } else {
            None
        }
    }

    /// Time left until the earliest task is due.
    pub fn time_until_next(&self, now: Instant) -> Option<Duration> {
        self.queue
            .first()
            .map(|s| s.due.saturating_duration_since(now))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
