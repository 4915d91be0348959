//! Trickle-like re-discovery timer state.
//!
//! The interval starts at `imin`. Every firing doubles it up to `imax` unless the
//! firing re-discovered at least one node, in which case it drops back to `imin`.
//! The delay until the next firing is drawn uniformly from `[imin, interval]`.

use crate::network::labels;
use crate::Network;
use rand::Rng;
use rplsim_common::{
    EventPayload, EventRecord, NodeId, RecordKind, SimContext, SimError, SimTime, TimerKind,
};
use rplsim_metrics::metric_defs;
use serde::Serialize;

/// Per-node timer state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trickle {
    imin: SimTime,
    imax: SimTime,
    interval: SimTime,
    next_fire_delay: SimTime,
}

impl Trickle {
    /// Fresh timer at `imin`, with the first delay drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(imin: SimTime, imax: SimTime, rng: &mut R) -> Self {
        let mut trickle = Trickle {
            imin,
            imax: imax.max(imin),
            interval: imin,
            next_fire_delay: imin,
        };
        trickle.redraw(rng);
        trickle
    }

    pub fn imin(&self) -> SimTime {
        self.imin
    }

    pub fn imax(&self) -> SimTime {
        self.imax
    }

    /// Current interval, always within `[imin, imax]`.
    pub fn interval(&self) -> SimTime {
        self.interval
    }

    /// Delay until the next firing.
    pub fn next_fire_delay(&self) -> SimTime {
        self.next_fire_delay
    }

    /// Back to `imin`.
    pub fn reset<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.interval = self.imin;
        self.redraw(rng);
    }

    /// Double the interval, capped at `imax`.
    pub fn double<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.interval = self.interval.saturating_mul(2).min(self.imax);
        self.redraw(rng);
    }

    fn redraw<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let micros = rng.gen_range(self.imin.as_micros()..=self.interval.as_micros());
        self.next_fire_delay = SimTime::from_micros(micros);
    }
}

impl Network {
    /// One firing of a node's re-discovery timer.
    ///
    /// A node without neighbors solicits every created node in range. Reaching at
    /// least one of them resets the interval; otherwise, and whenever the node still
    /// has neighbors, the interval doubles.
    pub(crate) fn trickle_fired(
        &mut self,
        node: NodeId,
        ctx: &mut SimContext,
    ) -> Result<(), SimError> {
        let isolated = self.get(node)?.neighbors.is_empty();
        let solicited = if isolated {
            self.broadcast_dis(node, ctx)?
        } else {
            0
        };

        let trickle = &mut self.get_mut(node)?.trickle;
        if solicited > 0 {
            trickle.reset(ctx.rng());
        } else {
            trickle.double(ctx.rng());
        }
        let interval = trickle.interval();
        let next = trickle.next_fire_delay();

        ctx.record(
            EventRecord::new(ctx.time(), node, RecordKind::TrickleFired)
                .with_detail("interval", interval)
                .with_detail("solicited", solicited),
        );
        metrics::counter!(metric_defs::TRICKLE_FIRED.name, &labels(node)).increment(1);
        metrics::histogram!(metric_defs::TRICKLE_INTERVAL.name, &labels(node))
            .record(interval.as_secs_f64());

        ctx.post_event(
            next,
            EventPayload::Timer {
                node,
                kind: TimerKind::Trickle,
            },
        );
        Ok(())
    }
}
