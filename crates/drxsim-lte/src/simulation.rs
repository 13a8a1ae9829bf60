//! One base station, one terminal, one schedule.

use crate::enb::BaseStation;
use crate::report::{SimulationReport, StateTime};
use crate::ue::Terminal;
use crate::SimContext;
use drxsim_common::{
    Event, EventPayload, EventTracer, NodeRole, SimError, SimResult, SimTime, UeState,
};
use drxsim_metrics::metric_defs;
use drxsim_model::SimulationConfig;
use drxsim_traffic::TrafficSource;
use tracing::{debug, trace};

/// A complete simulation run.
///
/// Construction schedules the first downlink arrival, the first uplink
/// arrival and the terminal's initial CONNECTED transition, in that order.
pub struct Simulation {
    ctx: SimContext,
    enb: BaseStation,
    ue: Terminal,
}

impl Simulation {
    pub fn new(
        config: SimulationConfig,
        downlink: Box<dyn TrafficSource>,
        uplink: Box<dyn TrafficSource>,
        tracer: EventTracer,
    ) -> SimResult<Self> {
        let mut enb = BaseStation::new(&config, downlink);
        let mut ue = Terminal::new(&config, uplink);
        let mut ctx = SimContext::new(config, tracer);
        enb.start(&mut ctx)?;
        ue.start(&mut ctx)?;
        debug!(
            "Simulation: horizon {}s, subframe {}s, {} initial events",
            ctx.horizon(),
            ctx.subframe(),
            ctx.queue().len()
        );
        Ok(Simulation { ctx, enb, ue })
    }

    pub fn context(&self) -> &SimContext {
        &self.ctx
    }

    pub fn base_station(&self) -> &BaseStation {
        &self.enb
    }

    pub fn terminal(&self) -> &Terminal {
        &self.ue
    }

    /// Current simulation time.
    pub fn now(&self) -> SimTime {
        self.ctx.time()
    }

    /// Earliest pending event.
    pub fn peek(&self) -> Option<&Event> {
        self.ctx.queue().peek()
    }

    /// Remove the earliest pending event without dispatching it.
    pub fn next_event(&mut self) -> Option<Event> {
        self.ctx.pop()
    }

    /// Move the clock to the event's time and hand the event to its target.
    pub fn advance_and_dispatch(&mut self, event: Event) -> SimResult<()> {
        self.ctx.advance_to(event.time)?;
        trace!("Simulation: dispatch {}", event);

        let time = event.time;
        match (event.target, event.payload) {
            (NodeRole::BaseStation, EventPayload::PacketArrival { packet_id }) => {
                let terminal = self.ue.status();
                self.enb.on_arrival(time, packet_id, terminal, &mut self.ctx)
            }
            (NodeRole::BaseStation, EventPayload::PacketTransmission { packet_id }) => {
                let terminal = self.ue.status();
                self.enb
                    .on_transmission_complete(time, packet_id, terminal, &mut self.ctx)
            }
            (NodeRole::BaseStation, EventPayload::PacketDrop) => {
                self.enb.on_drop(time, &mut self.ctx);
                Ok(())
            }
            (NodeRole::BaseStation, EventPayload::StateTransition { .. }) => {
                Err(SimError::InvalidDispatch {
                    role: NodeRole::BaseStation,
                    kind: event.kind(),
                })
            }
            (NodeRole::Terminal, EventPayload::PacketArrival { packet_id }) => {
                self.ue.on_arrival(time, packet_id, &mut self.ctx)
            }
            (NodeRole::Terminal, EventPayload::PacketTransmission { packet_id }) => self
                .ue
                .on_transmission_complete(time, packet_id, &self.enb, &mut self.ctx),
            (NodeRole::Terminal, EventPayload::PacketDrop) => {
                self.ue.on_drop(time, &mut self.ctx);
                Ok(())
            }
            (NodeRole::Terminal, EventPayload::StateTransition { new_state }) => self
                .ue
                .on_state_transition(time, new_state, &mut self.enb, &mut self.ctx),
        }
    }

    /// Dispatch the earliest pending event. Returns `None` once the schedule
    /// is empty.
    pub fn step(&mut self) -> SimResult<Option<Event>> {
        let Some(event) = self.ctx.pop() else {
            return Ok(None);
        };
        self.advance_and_dispatch(event)?;
        Ok(Some(event))
    }

    /// Run until the schedule is empty. Returns the number of dispatched
    /// events.
    pub fn run(&mut self) -> SimResult<u64> {
        let mut dispatched = 0u64;
        while self.step()?.is_some() {
            dispatched += 1;
        }
        metrics::counter!(metric_defs::EVENTS_PROCESSED.name).increment(dispatched);
        debug!(
            "Simulation: finished at {}s after {} events",
            self.ctx.time(),
            dispatched
        );
        Ok(dispatched)
    }

    /// Statistics over `[0, horizon]`.
    pub fn report(&self) -> SimulationReport {
        let horizon = self.ctx.horizon();
        let length_s = horizon.as_secs_f64();
        let times = self.ue.state_times(horizon);
        let ue_states = UeState::ALL
            .iter()
            .map(|&state| {
                let seconds = times[state.index()].as_secs_f64();
                StateTime {
                    state,
                    seconds,
                    percent: if length_s > 0.0 {
                        100.0 * seconds / length_s
                    } else {
                        0.0
                    },
                }
            })
            .collect();

        SimulationReport {
            length_s,
            enb: self.enb.report(),
            enb_average_threshold: self.enb.average_threshold(horizon),
            ue: self.ue.report(),
            ue_states,
        }
    }
}
