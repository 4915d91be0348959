//! Time-ordered event queue and logical clock.
//!
//! The scheduler is a min-heap keyed by `(time, id)`. Ids are assigned from a
//! monotonic counter at scheduling time, so events that fire at the same timestamp
//! run in the order they were scheduled. This tie-break decides, for example, which
//! of two simultaneous DIOs a node processes first and therefore which parent it
//! picks; it must not change.

use crate::{Event, EventId, EventPayload, SimTime};
use std::collections::BinaryHeap;

/// Logical clock plus pending events.
#[derive(Debug, Default)]
pub struct Scheduler {
    now: SimTime,
    queue: BinaryHeap<Event>,
    next_event_id: u64,
    processed: u64,
}

impl Scheduler {
    /// Create an empty scheduler at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current logical time.
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Number of events popped so far.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Fire time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.queue.peek().map(|e| e.time)
    }

    /// Schedule `payload` to fire `delay` after the current time.
    pub fn schedule_after(&mut self, delay: SimTime, payload: EventPayload) -> EventId {
        let time = self.now + delay;
        self.schedule_at(time, payload)
    }

    /// Schedule `payload` at an absolute time. Times in the past fire at `now`.
    pub fn schedule_at(&mut self, time: SimTime, payload: EventPayload) -> EventId {
        let id = EventId(self.next_event_id);
        self.next_event_id += 1;
        self.queue.push(Event {
            id,
            time: time.max(self.now),
            payload,
        });
        id
    }

    /// Pop the earliest event if it fires no later than `horizon`, advancing the clock.
    pub fn pop_due(&mut self, horizon: SimTime) -> Option<Event> {
        if self.queue.peek()?.time > horizon {
            return None;
        }
        let event = self.queue.pop()?;
        self.now = event.time;
        self.processed += 1;
        Some(event)
    }

    /// Move the clock forward to `horizon` once nothing earlier is pending.
    pub fn settle_at(&mut self, horizon: SimTime) {
        if horizon > self.now {
            self.now = horizon;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, TimerKind};

    fn trickle(node: u32) -> EventPayload {
        EventPayload::Timer {
            node: NodeId::new(node),
            kind: TimerKind::Trickle,
        }
    }

    #[test]
    fn test_fifo_at_same_time() {
        let mut sched = Scheduler::new();
        sched.schedule_after(SimTime::from_millis(10), trickle(1));
        sched.schedule_after(SimTime::from_millis(10), trickle(2));
        sched.schedule_after(SimTime::from_millis(10), trickle(3));

        let horizon = SimTime::from_millis(10);
        let targets: Vec<u32> = std::iter::from_fn(|| sched.pop_due(horizon))
            .filter_map(|e| e.payload.target())
            .map(|n| n.0)
            .collect();
        assert_eq!(targets, vec![1, 2, 3]);
        assert_eq!(sched.processed(), 3);
    }

    #[test]
    fn test_pop_due_respects_horizon() {
        let mut sched = Scheduler::new();
        sched.schedule_after(SimTime::from_millis(5), trickle(0));
        sched.schedule_after(SimTime::from_millis(15), trickle(1));

        let horizon = SimTime::from_millis(10);
        assert!(sched.pop_due(horizon).is_some());
        assert_eq!(sched.now(), SimTime::from_millis(5));
        assert!(sched.pop_due(horizon).is_none());
        assert_eq!(sched.len(), 1);

        sched.settle_at(horizon);
        assert_eq!(sched.now(), horizon);
        assert_eq!(sched.peek_time(), Some(SimTime::from_millis(15)));
    }

    #[test]
    fn test_schedule_after_is_relative_to_clock() {
        let mut sched = Scheduler::new();
        sched.schedule_after(SimTime::from_millis(7), trickle(0));
        sched.pop_due(SimTime::MAX);
        sched.schedule_after(SimTime::from_millis(3), trickle(0));
        assert_eq!(sched.peek_time(), Some(SimTime::from_millis(10)));

        // An absolute time in the past is clamped to now.
        sched.schedule_at(SimTime::ZERO, trickle(1));
        assert_eq!(sched.peek_time(), Some(SimTime::from_millis(7)));
    }
}
