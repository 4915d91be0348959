//! Execution context handed to event handlers.

use crate::{
    Event, EventId, EventPayload, EventRecord, RecordLog, Scheduler, SimError, SimTime,
    RNG_STREAM_PROTOCOL,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Something that reacts to events popped by the scheduler.
pub trait EventHandler {
    /// Run `event` to completion. Further work is scheduled through `ctx`.
    fn handle_event(&mut self, event: &Event, ctx: &mut SimContext) -> Result<(), SimError>;
}

/// Scheduler, record stream and randomness for one run.
///
/// Handlers never call each other directly; anything that should happen later (or to
/// another node) is posted here and runs as its own event.
pub struct SimContext {
    scheduler: Scheduler,
    records: RecordLog,
    rng: ChaCha8Rng,
}

impl SimContext {
    /// Create a context whose protocol RNG is derived from `seed`.
    pub fn new(seed: u64, records: RecordLog) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_stream(RNG_STREAM_PROTOCOL);
        SimContext {
            scheduler: Scheduler::new(),
            records,
            rng,
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.scheduler.now()
    }

    /// Protocol random number generator.
    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.rng
    }

    /// The underlying scheduler.
    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Records produced so far.
    pub fn records(&self) -> &RecordLog {
        &self.records
    }

    /// Schedule `payload` after `delay`. This is the only suspension primitive.
    pub fn post_event(&mut self, delay: SimTime, payload: EventPayload) -> EventId {
        self.scheduler.schedule_after(delay, payload)
    }

    /// Schedule `payload` at the current time, after everything already due now.
    pub fn post_immediate(&mut self, payload: EventPayload) -> EventId {
        self.scheduler.schedule_after(SimTime::ZERO, payload)
    }

    /// Append to the record stream.
    pub fn record(&mut self, record: EventRecord) {
        self.records.push(record);
    }

    /// Run the next event due at or before `horizon`.
    ///
    /// Returns the event's time, or `None` when nothing is due.
    pub fn step<H: EventHandler>(
        &mut self,
        horizon: SimTime,
        handler: &mut H,
    ) -> Result<Option<SimTime>, SimError> {
        let Some(event) = self.scheduler.pop_due(horizon) else {
            return Ok(None);
        };
        handler.handle_event(&event, self)?;
        Ok(Some(event.time))
    }

    /// Run every event due at or before `horizon`, then rest the clock at `horizon`.
    ///
    /// Returns the number of events processed.
    pub fn advance_to<H: EventHandler>(
        &mut self,
        horizon: SimTime,
        handler: &mut H,
    ) -> Result<u64, SimError> {
        let mut processed = 0;
        while self.step(horizon, handler)?.is_some() {
            processed += 1;
        }
        self.scheduler.settle_at(horizon);
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NodeId, RecordFilter, RecordKind, TimerKind};

    /// Re-arms itself every 10ms and records each firing.
    struct Ticker {
        fired: Vec<SimTime>,
    }

    impl EventHandler for Ticker {
        fn handle_event(&mut self, event: &Event, ctx: &mut SimContext) -> Result<(), SimError> {
            let node = event.payload.target().ok_or(SimError::UnexpectedEvent {
                time: ctx.time(),
                event: event.payload.to_string(),
            })?;
            self.fired.push(ctx.time());
            ctx.record(EventRecord::new(ctx.time(), node, RecordKind::TrickleFired));
            ctx.post_event(SimTime::from_millis(10), event.payload.clone());
            Ok(())
        }
    }

    #[test]
    fn test_advance_to_runs_due_events_and_settles() {
        let mut ctx = SimContext::new(7, RecordLog::new(RecordFilter::none()));
        ctx.post_immediate(EventPayload::Timer {
            node: NodeId::new(0),
            kind: TimerKind::Trickle,
        });

        let mut ticker = Ticker { fired: Vec::new() };
        let processed = ctx
            .advance_to(SimTime::from_millis(35), &mut ticker)
            .unwrap();

        assert_eq!(processed, 4);
        assert_eq!(
            ticker.fired,
            vec![
                SimTime::ZERO,
                SimTime::from_millis(10),
                SimTime::from_millis(20),
                SimTime::from_millis(30),
            ]
        );
        assert_eq!(ctx.time(), SimTime::from_millis(35));
        assert_eq!(ctx.records().count(RecordKind::TrickleFired), 4);
        assert_eq!(ctx.scheduler().peek_time(), Some(SimTime::from_millis(40)));
    }

    #[test]
    fn test_handler_error_stops_the_run() {
        let mut ctx = SimContext::new(7, RecordLog::default());
        ctx.post_immediate(EventPayload::CreateNode { index: 0 });

        let mut ticker = Ticker { fired: Vec::new() };
        let result = ctx.advance_to(SimTime::from_millis(100), &mut ticker);
        assert!(matches!(result, Err(SimError::UnexpectedEvent { .. })));
    }

    #[test]
    fn test_same_seed_same_stream() {
        use rand::Rng;
        let mut a = SimContext::new(99, RecordLog::default());
        let mut b = SimContext::new(99, RecordLog::default());
        let xs: Vec<u32> = (0..8).map(|_| a.rng().gen()).collect();
        let ys: Vec<u32> = (0..8).map(|_| b.rng().gen()).collect();
        assert_eq!(xs, ys);
    }
}
