//! Shared simulation context.

use drxsim_common::{
    Event, EventQueue, EventTracer, PacketId, ScheduleOutcome, SimResult, SimTime,
};
use drxsim_model::SimulationConfig;
use tracing::trace;

/// State shared by every handler of one run: the pending schedule and its
/// clock, the run configuration, the packet id counter and the verbose trace.
///
/// Handlers receive it as `&mut SimContext`; nothing here is global, so any
/// number of simulations can coexist in one process.
pub struct SimContext {
    queue: EventQueue,
    config: SimulationConfig,
    subframe: SimTime,
    next_packet_id: PacketId,
    tracer: EventTracer,
}

impl SimContext {
    pub fn new(config: SimulationConfig, tracer: EventTracer) -> Self {
        SimContext {
            queue: EventQueue::new(config.horizon()),
            subframe: config.subframe(),
            config,
            next_packet_id: 0,
            tracer,
        }
    }

    /// Current simulation time.
    pub fn time(&self) -> SimTime {
        self.queue.now()
    }

    pub fn horizon(&self) -> SimTime {
        self.queue.horizon()
    }

    /// Length of one subframe.
    pub fn subframe(&self) -> SimTime {
        self.subframe
    }

    /// `n` subframes after `from`.
    pub fn after_subframes(&self, from: SimTime, n: u32) -> SimTime {
        from + self.subframe * n
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn tracer(&self) -> &EventTracer {
        &self.tracer
    }

    /// Read-only view of the pending schedule.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Allocate the id of a new packet.
    pub fn next_packet_id(&mut self) -> PacketId {
        let id = self.next_packet_id;
        self.next_packet_id += 1;
        id
    }

    /// Insert an event into the schedule.
    pub fn schedule(&mut self, event: Event) -> SimResult<ScheduleOutcome> {
        let outcome = self.queue.insert(event)?;
        trace!("SimContext: schedule {} -> {:?}", event, outcome);
        Ok(outcome)
    }

    /// Remove a pending event. Returns `false` if it already fired or was
    /// never scheduled.
    pub fn cancel(&mut self, event: &Event) -> bool {
        self.queue.cancel(event)
    }

    pub(crate) fn pop(&mut self) -> Option<Event> {
        self.queue.pop()
    }

    pub(crate) fn advance_to(&mut self, time: SimTime) -> SimResult<()> {
        self.queue.advance_to(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drxsim_common::{NodeRole, SimError, UeState};

    fn context() -> SimContext {
        let mut config = SimulationConfig::default();
        config.simulation.length_s = 1.0;
        SimContext::new(config, EventTracer::disabled())
    }

    #[test]
    fn test_packet_ids_are_sequential() {
        let mut ctx = context();
        assert_eq!(ctx.next_packet_id(), 0);
        assert_eq!(ctx.next_packet_id(), 1);
        assert_eq!(ctx.next_packet_id(), 2);
    }

    #[test]
    fn test_after_subframes() {
        let ctx = context();
        assert_eq!(ctx.subframe(), SimTime::from_millis(1));
        assert_eq!(
            ctx.after_subframes(SimTime::from_millis(10), 30),
            SimTime::from_millis(40)
        );
    }

    #[test]
    fn test_schedule_respects_horizon_and_clock() {
        let mut ctx = context();
        assert_eq!(ctx.horizon(), SimTime::from_millis(1000));

        let late = Event::state_transition(SimTime::from_millis(1001), UeState::Connected);
        assert_eq!(ctx.schedule(late).unwrap(), ScheduleOutcome::BeyondHorizon);

        ctx.advance_to(SimTime::from_millis(5)).unwrap();
        let past = Event::packet_drop(SimTime::from_millis(4), NodeRole::Terminal);
        assert!(matches!(
            ctx.schedule(past),
            Err(SimError::NonCausalEvent { .. })
        ));
    }

    #[test]
    fn test_cancel_is_a_noop_for_absent_events() {
        let mut ctx = context();
        let timer = Event::state_transition(SimTime::from_millis(10), UeState::ConnectedDrx);
        assert!(!ctx.cancel(&timer));
        ctx.schedule(timer).unwrap();
        assert!(ctx.cancel(&timer));
        assert!(!ctx.cancel(&timer));
        assert!(ctx.queue().is_empty());
    }
}
