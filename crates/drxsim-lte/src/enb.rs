//! The base station (eNB).
//!
//! Besides its downlink queue, the base station decides when the sleeping
//! terminal must leave connected-mode DRX. It does so with a queue-depth
//! threshold, either fixed or adapted once per sleep run so that the average
//! downlink delay approaches a target, and with an optional delay budget that
//! forces a wake-up before the head-of-line packet would exceed it.

use crate::node::{NodeCore, NodeReport};
use crate::ue::TerminalStatus;
use crate::SimContext;
use drxsim_common::{Event, NodeRole, PacketId, SimResult, SimTime, UeState};
use drxsim_metrics::{metric_defs, MetricLabels};
use drxsim_model::SimulationConfig;
use drxsim_traffic::TrafficSource;
use tracing::debug;

// ============================================================================
// Adaptive Threshold
// ============================================================================

/// State of the adaptive queue-threshold controller.
#[derive(Debug, Clone)]
struct AdaptiveThreshold {
    value: f64,
    ceiling: f64,
    cycle_sent: u64,
    cycle_delay_sum: f64,
    /// Integral of the effective threshold over time, up to `last_update`.
    weighted_sum: f64,
    last_update: SimTime,
}

impl AdaptiveThreshold {
    fn new(ceiling: u32) -> Self {
        AdaptiveThreshold {
            value: 1.0,
            ceiling: f64::from(ceiling),
            cycle_sent: 0,
            cycle_delay_sum: 0.0,
            weighted_sum: 0.0,
            last_update: SimTime::ZERO,
        }
    }

    /// Threshold in effect, in packets.
    fn effective(&self) -> u32 {
        self.value.ceil() as u32
    }
}

// ============================================================================
// Base Station
// ============================================================================

/// Downlink node plus the DRX exit controller.
pub struct BaseStation {
    node: NodeCore,
    /// Fixed queue threshold, `0` in adaptive mode.
    static_threshold: u32,
    /// Delay budget in subframes, `0` when disabled.
    delay_budget: u32,
    /// Target average delay in subframes.
    target_avg_delay: u32,
    /// Arrival time of the first packet queued while the terminal sleeps.
    hol_drx_time: Option<SimTime>,
    adaptive: Option<AdaptiveThreshold>,
    labels: MetricLabels,
}

impl BaseStation {
    pub fn new(config: &SimulationConfig, source: Box<dyn TrafficSource>) -> Self {
        let drx = &config.connected_drx;
        let rate_window_s = f64::from(drx.delay_threshold) * config.lte.subframe_s;
        BaseStation {
            node: NodeCore::new(
                NodeRole::BaseStation,
                source,
                config.downlink.max_queue_size,
                rate_window_s,
            ),
            static_threshold: drx.queue_threshold,
            delay_budget: drx.delay_threshold,
            target_avg_delay: drx.target_avg_delay,
            hol_drx_time: None,
            adaptive: drx
                .is_adaptive()
                .then(|| AdaptiveThreshold::new(drx.delay_threshold)),
            labels: MetricLabels::new(NodeRole::BaseStation.tag()),
        }
    }

    pub fn start(&mut self, ctx: &mut SimContext) -> SimResult<()> {
        self.node.start(ctx)
    }

    // ========================================================================
    // Event Handlers
    // ========================================================================

    /// Handle a downlink arrival, then wake or serve the terminal.
    pub fn on_arrival(
        &mut self,
        time: SimTime,
        packet_id: PacketId,
        terminal: TerminalStatus,
        ctx: &mut SimContext,
    ) -> SimResult<()> {
        if !self.node.on_arrival(time, packet_id, ctx)? {
            return Ok(());
        }

        let woke_from_drx = terminal.previous_state == UeState::ConnectedDrx;
        match terminal.state {
            UeState::IdleListening => {
                ctx.schedule(Event::state_transition(time, UeState::Connecting))?;
            }
            UeState::Connected
                if !woke_from_drx || self.node.queued() >= self.current_threshold() as usize =>
            {
                self.serve(time, UeState::ConnectedRx, ctx)?;
            }
            UeState::ConnectedTx => {
                self.serve(time, UeState::ConnectedTxRx, ctx)?;
            }
            _ => {}
        }

        let sleeping = terminal.state == UeState::ConnectedDrx
            || (terminal.state == UeState::Connected && woke_from_drx);
        if self.hol_drx_time.is_none() && sleeping {
            self.hol_drx_time = Some(time);
        }
        Ok(())
    }

    /// Start transmitting the queue head and move the terminal to `next`.
    fn serve(&mut self, time: SimTime, next: UeState, ctx: &mut SimContext) -> SimResult<()> {
        if let Some(head) = self.node.head() {
            let at = time + ctx.subframe();
            ctx.schedule(Event::transmission(at, NodeRole::BaseStation, head))?;
        }
        ctx.schedule(Event::state_transition(time, next))?;
        Ok(())
    }

    pub fn on_drop(&mut self, time: SimTime, ctx: &mut SimContext) {
        self.node.on_drop(time, ctx);
    }

    /// Handle the end of a downlink transmission.
    ///
    /// Once the queue drains the terminal drops back to uplink-only transfer
    /// or to plain CONNECTED.
    pub fn on_transmission_complete(
        &mut self,
        time: SimTime,
        packet_id: PacketId,
        terminal: TerminalStatus,
        ctx: &mut SimContext,
    ) -> SimResult<()> {
        self.node.on_transmission_complete(time, packet_id, ctx)?;

        if let Some(adaptive) = self.adaptive.as_mut() {
            adaptive.cycle_sent += 1;
            adaptive.cycle_delay_sum += self.node.last_delay();
        }

        if self.node.is_empty() {
            let next = if terminal.state == UeState::ConnectedTxRx && terminal.queued > 0 {
                UeState::ConnectedTx
            } else {
                UeState::Connected
            };
            ctx.schedule(Event::state_transition(time, next))?;
        }
        Ok(())
    }

    // ========================================================================
    // DRX Control
    // ========================================================================

    /// Queue depth that forces the terminal out of DRX.
    pub fn current_threshold(&self) -> u32 {
        match &self.adaptive {
            Some(adaptive) => adaptive.effective(),
            None => self.static_threshold,
        }
    }

    /// Whether a terminal about to start another DRX cycle of `cycle`
    /// subframes must stay awake instead.
    ///
    /// Only a terminal currently in CONNECTED_DRX is ever held awake. It is
    /// held when the downlink queue reached the threshold, or when sleeping
    /// one more cycle would push either the first packet queued during the
    /// sleep or the newest packet (which waits behind all the others) past
    /// the delay budget.
    pub fn should_exit_drx(
        &self,
        now: SimTime,
        cycle: u32,
        terminal_state: UeState,
        ctx: &SimContext,
    ) -> bool {
        if terminal_state != UeState::ConnectedDrx {
            return false;
        }
        let queued = self.node.queued();
        if queued >= self.current_threshold() as usize {
            return true;
        }
        let Some(hol) = self.hol_drx_time else {
            return false;
        };
        if self.delay_budget == 0 {
            return false;
        }

        let sf = i128::from(ctx.subframe().as_nanos());
        let now = i128::from(now.as_nanos());
        let cycle = i128::from(cycle);
        let budget = sf * i128::from(self.delay_budget);
        let hol_age = now - i128::from(hol.as_nanos()) + cycle * sf;
        let tail_age = now - i128::from(self.node.last_arrival().as_nanos())
            + (cycle + queued as i128 - 1) * sf;
        hol_age > budget || tail_age > budget
    }

    /// Close the current sleep-run accounting. Called when the terminal
    /// enters its first DRX cycle after activity.
    ///
    /// In adaptive mode, and only if packets were sent since the previous
    /// update, the threshold moves by `2 * rate * (target - average delay)`
    /// and is clamped to `[1, ceiling]`.
    pub fn update_threshold(&mut self, now: SimTime, ctx: &SimContext) {
        self.hol_drx_time = None;
        let Some(adaptive) = self.adaptive.as_mut() else {
            return;
        };
        if adaptive.cycle_sent == 0 {
            return;
        }

        let elapsed = now.saturating_sub(adaptive.last_update).as_secs_f64();
        adaptive.weighted_sum += f64::from(adaptive.effective()) * elapsed;
        adaptive.last_update = now;

        let cycle_avg_delay = adaptive.cycle_delay_sum / adaptive.cycle_sent as f64;
        let target = f64::from(self.target_avg_delay) * ctx.subframe().as_secs_f64();
        let previous = adaptive.value;
        adaptive.value += 2.0 * self.node.arrival_rate() * (target - cycle_avg_delay);
        if adaptive.value < 1.0 {
            adaptive.value = 1.0;
        } else if adaptive.value > adaptive.ceiling {
            adaptive.value = adaptive.ceiling;
        }
        adaptive.cycle_sent = 0;
        adaptive.cycle_delay_sum = 0.0;

        debug!(
            "BaseStation: queue threshold {:.3} -> {:.3} at {} (cycle average delay {:.6}s)",
            previous, adaptive.value, now, cycle_avg_delay
        );
        let labels = self.labels.to_labels();
        metrics::gauge!(metric_defs::ENB_QUEUE_THRESHOLD.name, &labels)
            .set(f64::from(adaptive.effective()));
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn node(&self) -> &NodeCore {
        &self.node
    }

    pub fn queued(&self) -> usize {
        self.node.queued()
    }

    pub fn head(&self) -> Option<PacketId> {
        self.node.head()
    }

    pub fn is_adaptive(&self) -> bool {
        self.adaptive.is_some()
    }

    /// Raw adaptive threshold, before rounding up.
    pub fn adaptive_threshold(&self) -> Option<f64> {
        self.adaptive.as_ref().map(|a| a.value)
    }

    pub fn hol_drx_time(&self) -> Option<SimTime> {
        self.hol_drx_time
    }

    /// Time-weighted average of the effective threshold over `[0, horizon]`.
    /// `None` unless adaptive.
    pub fn average_threshold(&self, horizon: SimTime) -> Option<f64> {
        let adaptive = self.adaptive.as_ref()?;
        let length = horizon.as_secs_f64();
        if length <= 0.0 {
            return None;
        }
        let tail = horizon.saturating_sub(adaptive.last_update).as_secs_f64();
        Some((adaptive.weighted_sum + f64::from(adaptive.effective()) * tail) / length)
    }

    pub fn report(&self) -> NodeReport {
        self.node.report()
    }
}
