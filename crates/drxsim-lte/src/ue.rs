//! The terminal (UE) and its power-state machine.
//!
//! A terminal with traffic in either direction sits in one of the CONNECTED
//! transfer states. Once both queues drain it returns to CONNECTED and, after
//! the inactivity timer, starts sleeping in CONNECTED_DRX cycles: short ones
//! first, long ones after `short_cycle_timer` consecutive cycles. Each cycle
//! ends with an on-duration back in CONNECTED. A longer silence moves it to
//! idle mode (or switches the radio off), from which it has to reconnect.
//!
//! Every transition goes through a [`UeState`] event addressed to the
//! terminal, including those decided at the same instant. The terminal keeps
//! at most one pending DRX timer and one pending idle-mode timer and cancels
//! them by value.

use crate::enb::BaseStation;
use crate::node::{NodeCore, NodeReport};
use crate::SimContext;
use drxsim_common::{
    Event, EventKind, NodeRole, PacketId, SimResult, SimTime, TraceRecord, UeState,
};
use drxsim_metrics::{metric_defs, MetricLabels};
use drxsim_model::{ConnectedDrxConfig, IdleDrxConfig, SimulationConfig};
use drxsim_traffic::TrafficSource;
use tracing::debug;

const STATE_COUNT: usize = UeState::ALL.len();

/// What the base station needs to know about the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalStatus {
    pub state: UeState,
    pub previous_state: UeState,
    /// Packets in the uplink queue.
    pub queued: usize,
}

/// Uplink node plus the DRX state machine.
pub struct Terminal {
    node: NodeCore,
    state: UeState,
    previous_state: UeState,
    time_in_state: [SimTime; STATE_COUNT],
    last_transition: SimTime,
    consecutive_drx_cycles: u32,
    drx_timer: Option<Event>,
    idle_timer: Option<Event>,

    drx: ConnectedDrxConfig,
    idle: IdleDrxConfig,
    connection_delay: u32,
    disconnect_radio: bool,
    labels: MetricLabels,
}

impl Terminal {
    pub fn new(config: &SimulationConfig, source: Box<dyn TrafficSource>) -> Self {
        let rate_window_s =
            f64::from(config.connected_drx.delay_threshold) * config.lte.subframe_s;
        Terminal {
            node: NodeCore::new(
                NodeRole::Terminal,
                source,
                config.uplink.max_queue_size,
                rate_window_s,
            ),
            state: UeState::Connected,
            previous_state: UeState::Connected,
            time_in_state: [SimTime::ZERO; STATE_COUNT],
            last_transition: SimTime::ZERO,
            consecutive_drx_cycles: 0,
            drx_timer: None,
            idle_timer: None,
            drx: config.connected_drx,
            idle: config.idle_drx,
            connection_delay: config.lte.connection_delay,
            disconnect_radio: config.lte.disconnect_radio,
            labels: MetricLabels::new(NodeRole::Terminal.tag()),
        }
    }

    /// Schedule the first uplink arrival and the initial CONNECTED transition.
    pub fn start(&mut self, ctx: &mut SimContext) -> SimResult<()> {
        self.node.start(ctx)?;
        ctx.schedule(Event::state_transition(SimTime::ZERO, UeState::Connected))?;
        Ok(())
    }

    pub fn status(&self) -> TerminalStatus {
        TerminalStatus {
            state: self.state,
            previous_state: self.previous_state,
            queued: self.node.queued(),
        }
    }

    // ========================================================================
    // Packet Events
    // ========================================================================

    /// Handle an uplink arrival: connect, or start transmitting.
    pub fn on_arrival(
        &mut self,
        time: SimTime,
        packet_id: PacketId,
        ctx: &mut SimContext,
    ) -> SimResult<()> {
        if !self.node.on_arrival(time, packet_id, ctx)? {
            return Ok(());
        }

        let next = match self.state {
            UeState::Disconnected | UeState::IdleDrx | UeState::IdleListening => {
                ctx.schedule(Event::state_transition(time, UeState::Connecting))?;
                return Ok(());
            }
            UeState::ConnectedDrx => UeState::Connected,
            UeState::Connected => UeState::ConnectedTx,
            UeState::ConnectedRx => UeState::ConnectedTxRx,
            _ => return Ok(()),
        };
        if let Some(head) = self.node.head() {
            let at = time + ctx.subframe();
            ctx.schedule(Event::transmission(at, NodeRole::Terminal, head))?;
        }
        ctx.schedule(Event::state_transition(time, next))?;
        Ok(())
    }

    pub fn on_drop(&mut self, time: SimTime, ctx: &mut SimContext) {
        self.node.on_drop(time, ctx);
    }

    /// Handle the end of an uplink transmission.
    pub fn on_transmission_complete(
        &mut self,
        time: SimTime,
        packet_id: PacketId,
        enb: &BaseStation,
        ctx: &mut SimContext,
    ) -> SimResult<()> {
        self.node.on_transmission_complete(time, packet_id, ctx)?;
        if self.node.is_empty() {
            let next = if self.state == UeState::ConnectedTxRx && enb.queued() > 0 {
                UeState::ConnectedRx
            } else {
                UeState::Connected
            };
            ctx.schedule(Event::state_transition(time, next))?;
        }
        Ok(())
    }

    // ========================================================================
    // State Machine
    // ========================================================================

    /// Enter `new_state`.
    ///
    /// The entry actions of the new state run first; they may consult the
    /// outgoing state, which is still current while they run.
    pub fn on_state_transition(
        &mut self,
        time: SimTime,
        new_state: UeState,
        enb: &mut BaseStation,
        ctx: &mut SimContext,
    ) -> SimResult<()> {
        match new_state {
            UeState::IdleDrx => {
                let wake = ctx.after_subframes(
                    time,
                    self.idle.cycle.saturating_sub(self.idle.on_duration),
                );
                self.set_idle_timer(Event::state_transition(wake, UeState::IdleListening), ctx)?;
                self.cancel_drx_timer(ctx);
            }
            UeState::IdleListening => {
                if enb.queued() > 0 {
                    ctx.schedule(Event::state_transition(time, UeState::Connecting))?;
                } else {
                    let sleep = ctx.after_subframes(time, self.idle.on_duration);
                    self.set_idle_timer(Event::state_transition(sleep, UeState::IdleDrx), ctx)?;
                }
            }
            UeState::Connecting => {
                self.cancel_idle_timer(ctx);
                let connected = ctx.after_subframes(time, self.connection_delay);
                ctx.schedule(Event::state_transition(connected, UeState::Connected))?;
            }
            UeState::Connected => self.enter_connected(time, enb, ctx)?,
            UeState::ConnectedTx | UeState::ConnectedRx | UeState::ConnectedTxRx => {
                self.consecutive_drx_cycles = 0;
                self.cancel_drx_timer(ctx);
                self.cancel_idle_timer(ctx);
            }
            UeState::ConnectedDrx => {
                if self.consecutive_drx_cycles == 0 {
                    enb.update_threshold(time, ctx);
                }
                self.consecutive_drx_cycles += 1;
                let cycle = self.drx_cycle(self.consecutive_drx_cycles);
                let wake = ctx.after_subframes(time, cycle.saturating_sub(self.drx.on_duration));
                self.set_drx_timer(Event::state_transition(wake, UeState::Connected), ctx)?;
            }
            UeState::Disconnected => self.cancel_drx_timer(ctx),
        }

        self.finish_transition(time, new_state, ctx);
        Ok(())
    }

    /// Entry actions of CONNECTED.
    ///
    /// With nothing to send either way the terminal arms its sleep timers:
    /// back to CONNECTED_DRX after the on-duration when it just woke from a
    /// DRX cycle, otherwise after the inactivity timer, plus the idle-mode
    /// timer. Otherwise it starts both queues and moves to the matching
    /// transfer state at once.
    fn enter_connected(
        &mut self,
        time: SimTime,
        enb: &BaseStation,
        ctx: &mut SimContext,
    ) -> SimResult<()> {
        let cycle = self.drx_cycle(self.consecutive_drx_cycles.saturating_add(1));
        if self.node.is_empty() && !enb.should_exit_drx(time, cycle, self.state, ctx) {
            let interval = if self.state == UeState::ConnectedDrx {
                self.drx.on_duration
            } else {
                let target = if self.disconnect_radio {
                    UeState::Disconnected
                } else {
                    UeState::IdleDrx
                };
                let at = ctx.after_subframes(time, self.idle.inactivity_timer);
                self.set_idle_timer(Event::state_transition(at, target), ctx)?;
                self.drx.inactivity_timer
            };
            let sleep = ctx.after_subframes(time, interval);
            self.set_drx_timer(Event::state_transition(sleep, UeState::ConnectedDrx), ctx)?;
            return Ok(());
        }

        let at = time + ctx.subframe();
        let uplink = self.node.head();
        let downlink = enb.head();
        if let Some(id) = uplink {
            ctx.schedule(Event::transmission(at, NodeRole::Terminal, id))?;
        }
        if let Some(id) = downlink {
            ctx.schedule(Event::transmission(at, NodeRole::BaseStation, id))?;
        }
        let next = match (uplink.is_some(), downlink.is_some()) {
            (true, false) => UeState::ConnectedTx,
            (false, true) => UeState::ConnectedRx,
            _ => UeState::ConnectedTxRx,
        };
        ctx.schedule(Event::state_transition(time, next))?;
        Ok(())
    }

    /// Length in subframes of DRX cycle number `count` of a sleep run.
    fn drx_cycle(&self, count: u32) -> u32 {
        if count <= self.drx.short_cycle_timer {
            self.drx.short_cycle
        } else {
            self.drx.long_cycle
        }
    }

    fn finish_transition(&mut self, time: SimTime, new_state: UeState, ctx: &SimContext) {
        let elapsed = time.saturating_sub(self.last_transition);
        self.time_in_state[self.state.index()] += elapsed;
        self.previous_state = self.state;
        self.state = new_state;
        self.last_transition = time;

        debug!(
            "Terminal: {} -> {} at {}",
            self.previous_state, self.state, time
        );
        let labels = self
            .labels
            .with(&[("state", new_state.as_str().to_string())]);
        metrics::counter!(metric_defs::UE_STATE_TRANSITIONS.name, &labels).increment(1);
        ctx.tracer().log(|| {
            TraceRecord::new(time, NodeRole::Terminal, EventKind::StateTransition)
                .with_field(new_state)
        });
    }

    // ========================================================================
    // Timers
    // ========================================================================

    fn set_drx_timer(&mut self, timer: Event, ctx: &mut SimContext) -> SimResult<()> {
        if let Some(old) = self.drx_timer.replace(timer) {
            ctx.cancel(&old);
        }
        ctx.schedule(timer)?;
        Ok(())
    }

    fn set_idle_timer(&mut self, timer: Event, ctx: &mut SimContext) -> SimResult<()> {
        if let Some(old) = self.idle_timer.replace(timer) {
            ctx.cancel(&old);
        }
        ctx.schedule(timer)?;
        Ok(())
    }

    fn cancel_drx_timer(&mut self, ctx: &mut SimContext) {
        if let Some(timer) = self.drx_timer.take() {
            ctx.cancel(&timer);
        }
    }

    fn cancel_idle_timer(&mut self, ctx: &mut SimContext) {
        if let Some(timer) = self.idle_timer.take() {
            ctx.cancel(&timer);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn node(&self) -> &NodeCore {
        &self.node
    }

    pub fn state(&self) -> UeState {
        self.state
    }

    pub fn previous_state(&self) -> UeState {
        self.previous_state
    }

    pub fn queued(&self) -> usize {
        self.node.queued()
    }

    pub fn consecutive_drx_cycles(&self) -> u32 {
        self.consecutive_drx_cycles
    }

    /// Pending DRX timer, if one was armed and not cancelled.
    pub fn drx_timer(&self) -> Option<Event> {
        self.drx_timer
    }

    pub fn idle_timer(&self) -> Option<Event> {
        self.idle_timer
    }

    /// Time spent in `state` up to the last transition.
    pub fn time_in_state(&self, state: UeState) -> SimTime {
        self.time_in_state[state.index()]
    }

    /// Time spent in every state over `[0, horizon]`, in [`UeState::ALL`]
    /// order. The current state is credited up to `horizon`.
    pub fn state_times(&self, horizon: SimTime) -> [SimTime; STATE_COUNT] {
        let mut times = self.time_in_state;
        times[self.state.index()] += horizon.saturating_sub(self.last_transition);
        times
    }

    pub fn report(&self) -> NodeReport {
        self.node.report()
    }
}
