//! Queueing and statistics shared by the base station and the terminal.
//!
//! A [`NodeCore`] owns one direction of the link: the traffic source feeding
//! it, the FIFO of packets waiting for a subframe, and the running counters
//! reported at the end of the run. The role-specific orchestration lives in
//! [`crate::enb`] and [`crate::ue`], which call into the core first and then
//! react to its new queue state.

use crate::SimContext;
use drxsim_common::{
    Event, EventKind, NodeRole, PacketId, SimError, SimResult, SimTime, TraceRecord,
};
use drxsim_metrics::{metric_defs, MetricLabels};
use drxsim_traffic::TrafficSource;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use tracing::trace;

/// A packet waiting in a node's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedPacket {
    pub id: PacketId,
    pub arrival: SimTime,
}

/// FIFO queue, counters and arrival-rate estimate of one node.
pub struct NodeCore {
    role: NodeRole,
    source: Box<dyn TrafficSource>,
    queue: VecDeque<QueuedPacket>,
    /// Maximum queued packets, `0` for unbounded.
    capacity: u32,
    /// Time constant scale of the rate estimator, in seconds.
    rate_window_s: f64,

    received: u64,
    sent: u64,
    dropped: u64,
    delay_sum: f64,
    delay_max: f64,
    last_delay: f64,
    arrival_rate: Option<f64>,
    last_arrival: SimTime,

    labels: MetricLabels,
}

impl NodeCore {
    /// Create a node.
    ///
    /// `rate_window_s` is the delay budget in seconds; it sets how quickly
    /// old inter-arrival times are forgotten by the rate estimator.
    pub fn new(
        role: NodeRole,
        source: Box<dyn TrafficSource>,
        capacity: u32,
        rate_window_s: f64,
    ) -> Self {
        NodeCore {
            role,
            source,
            queue: VecDeque::new(),
            capacity,
            rate_window_s,
            received: 0,
            sent: 0,
            dropped: 0,
            delay_sum: 0.0,
            delay_max: 0.0,
            last_delay: 0.0,
            arrival_rate: None,
            last_arrival: SimTime::ZERO,
            labels: MetricLabels::new(role.tag()),
        }
    }

    /// Schedule the first arrival.
    pub fn start(&mut self, ctx: &mut SimContext) -> SimResult<()> {
        self.schedule_next_arrival(ctx)
    }

    fn schedule_next_arrival(&mut self, ctx: &mut SimContext) -> SimResult<()> {
        let time = SimTime::from_secs(self.source.next_arrival());
        let packet_id = ctx.next_packet_id();
        ctx.schedule(Event::arrival(time, self.role, packet_id))?;
        Ok(())
    }

    // ========================================================================
    // Event Handlers
    // ========================================================================

    /// Handle a packet arrival.
    ///
    /// The packet is queued if there is room, otherwise a drop event is
    /// scheduled for the same instant. Either way the next arrival is drawn
    /// from the traffic source. Returns whether the packet was queued.
    pub fn on_arrival(
        &mut self,
        time: SimTime,
        packet_id: PacketId,
        ctx: &mut SimContext,
    ) -> SimResult<bool> {
        self.received += 1;
        let labels = self.labels.to_labels();
        metrics::counter!(metric_defs::PACKETS_RECEIVED.name, &labels).increment(1);

        let accepted = self.capacity == 0 || self.queue.len() < self.capacity as usize;
        if accepted {
            self.queue.push_back(QueuedPacket {
                id: packet_id,
                arrival: time,
            });
            self.update_arrival_rate(time);
            self.last_arrival = time;

            metrics::gauge!(metric_defs::QUEUE_SIZE.name, &labels).set(self.queue.len() as f64);
            metrics::gauge!(metric_defs::ARRIVAL_RATE.name, &labels).set(self.arrival_rate());
            ctx.tracer().log(|| {
                TraceRecord::new(time, self.role, EventKind::PacketArrival)
                    .with_field(packet_id)
                    .with_field(self.queue.len())
                    .with_field(format!("{:.6}", self.arrival_rate()))
            });
        } else {
            trace!(
                "{}: queue full ({} packets), dropping packet {}",
                self.role,
                self.queue.len(),
                packet_id
            );
            ctx.schedule(Event::packet_drop(time, self.role))?;
        }

        self.schedule_next_arrival(ctx)?;
        Ok(accepted)
    }

    /// Exponentially smoothed estimate of the arrival rate.
    ///
    /// Arrivals at the same instant as the previous one carry no rate
    /// information and leave the estimate unchanged.
    fn update_arrival_rate(&mut self, time: SimTime) {
        let dt = time.saturating_sub(self.last_arrival).as_secs_f64();
        if dt <= 0.0 {
            return;
        }
        let instantaneous = 1.0 / dt;
        self.arrival_rate = Some(match self.arrival_rate {
            Some(previous) => {
                let decay = if self.rate_window_s > 0.0 {
                    (-0.5 * dt / self.rate_window_s).exp()
                } else {
                    0.0
                };
                instantaneous + decay * (previous - instantaneous)
            }
            None => instantaneous,
        });
    }

    /// Handle a drop scheduled by [`NodeCore::on_arrival`].
    pub fn on_drop(&mut self, time: SimTime, ctx: &mut SimContext) {
        self.dropped += 1;
        let labels = self.labels.to_labels();
        metrics::counter!(metric_defs::PACKETS_DROPPED.name, &labels).increment(1);
        ctx.tracer().log(|| {
            TraceRecord::new(time, self.role, EventKind::PacketDrop).with_field(self.queue.len())
        });
    }

    /// Handle the end of the transmission of `packet_id`.
    ///
    /// The packet must be the queue head. Its delay excludes the subframe
    /// spent on the air. If more packets wait, the next head is scheduled
    /// one subframe later.
    pub fn on_transmission_complete(
        &mut self,
        time: SimTime,
        packet_id: PacketId,
        ctx: &mut SimContext,
    ) -> SimResult<()> {
        let packet = match self.queue.front() {
            Some(head) if head.id == packet_id => *head,
            other => {
                return Err(SimError::FifoViolation {
                    role: self.role,
                    expected: other.map(|p| p.id),
                    actual: packet_id,
                })
            }
        };
        self.queue.pop_front();
        self.sent += 1;

        let delay = time
            .saturating_sub(packet.arrival)
            .saturating_sub(ctx.subframe())
            .as_secs_f64();
        self.last_delay = delay;
        self.delay_sum += delay;
        if delay > self.delay_max {
            self.delay_max = delay;
        }

        let labels = self.labels.to_labels();
        metrics::counter!(metric_defs::PACKETS_SENT.name, &labels).increment(1);
        metrics::histogram!(metric_defs::PACKET_DELAY.name, &labels).record(delay);
        metrics::gauge!(metric_defs::QUEUE_SIZE.name, &labels).set(self.queue.len() as f64);
        ctx.tracer().log(|| {
            TraceRecord::new(time, self.role, EventKind::PacketTransmission)
                .with_field(packet_id)
                .with_field(self.queue.len())
        });

        if let Some(next) = self.queue.front() {
            let at = time + ctx.subframe();
            ctx.schedule(Event::transmission(at, self.role, next.id))?;
        }
        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Packets waiting in the queue.
    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Id of the packet at the head of the queue.
    pub fn head(&self) -> Option<PacketId> {
        self.queue.front().map(|p| p.id)
    }

    pub fn received(&self) -> u64 {
        self.received
    }

    pub fn sent(&self) -> u64 {
        self.sent
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Delay of the most recently transmitted packet, in seconds.
    pub fn last_delay(&self) -> f64 {
        self.last_delay
    }

    /// Smoothed arrival rate in packets per second, `0.0` before the first
    /// estimate.
    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate.unwrap_or(0.0)
    }

    /// Time of the last queued arrival.
    pub fn last_arrival(&self) -> SimTime {
        self.last_arrival
    }

    pub fn report(&self) -> NodeReport {
        let (average_delay_s, max_delay_s) = if self.sent > 0 {
            (Some(self.delay_sum / self.sent as f64), Some(self.delay_max))
        } else {
            (None, None)
        };
        NodeReport {
            node: self.role.tag().to_string(),
            received: self.received,
            sent: self.sent,
            dropped: self.dropped,
            queued: self.queue.len() as u64,
            average_delay_s,
            max_delay_s,
        }
    }
}

// ============================================================================
// Report
// ============================================================================

/// End-of-run packet statistics of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub node: String,
    pub received: u64,
    pub sent: u64,
    pub dropped: u64,
    /// Packets still waiting when the run ended.
    pub queued: u64,
    /// `None` when nothing was sent.
    pub average_delay_s: Option<f64>,
    pub max_delay_s: Option<f64>,
}

impl fmt::Display for NodeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} packets: received {} sent {} dropped {}",
            self.node, self.received, self.sent, self.dropped
        )?;
        if let (Some(average), Some(max)) = (self.average_delay_s, self.max_delay_s) {
            write!(
                f,
                "\n{} packet delay: average {:.9} max {:.9}",
                self.node, average, max
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use drxsim_common::{EventPayload, EventTracer};
    use drxsim_model::SimulationConfig;
    use drxsim_traffic::{SilentSource, TraceSource};

    fn context() -> SimContext {
        let mut config = SimulationConfig::default();
        config.simulation.length_s = 1.0;
        SimContext::new(config, EventTracer::disabled())
    }

    fn trace_node(interarrivals: &str, capacity: u32) -> NodeCore {
        let source = TraceSource::from_reader(interarrivals.as_bytes(), 1.0).unwrap();
        NodeCore::new(NodeRole::BaseStation, Box::new(source), capacity, 1.0)
    }

    /// Pop the next event, move the clock and return it.
    fn pop(ctx: &mut SimContext) -> Event {
        let event = ctx.pop().unwrap();
        ctx.advance_to(event.time).unwrap();
        event
    }

    #[test]
    fn test_start_schedules_first_arrival() {
        let mut ctx = context();
        let mut node = trace_node("0.010\n", 0);
        node.start(&mut ctx).unwrap();
        assert_eq!(
            ctx.queue().peek(),
            Some(&Event::arrival(SimTime::from_millis(10), NodeRole::BaseStation, 0))
        );
    }

    #[test]
    fn test_arrival_enqueues_and_schedules_next() {
        let mut ctx = context();
        let mut node = trace_node("0.010\n0.005\n", 0);
        node.start(&mut ctx).unwrap();

        let event = pop(&mut ctx);
        assert!(node.on_arrival(event.time, 0, &mut ctx).unwrap());
        assert_eq!(node.received(), 1);
        assert_eq!(node.queued(), 1);
        assert_eq!(node.head(), Some(0));
        assert_eq!(node.last_arrival(), SimTime::from_millis(10));
        assert_relative_eq!(node.arrival_rate(), 100.0, epsilon = 1e-9);
        assert_eq!(
            ctx.queue().peek(),
            Some(&Event::arrival(SimTime::from_millis(15), NodeRole::BaseStation, 1))
        );
    }

    #[test]
    fn test_rate_estimate_smoothing() {
        let mut ctx = context();
        let mut node = trace_node("0.010\n0.005\n", 0);
        node.start(&mut ctx).unwrap();
        let first = pop(&mut ctx);
        node.on_arrival(first.time, 0, &mut ctx).unwrap();
        let second = pop(&mut ctx);
        node.on_arrival(second.time, 1, &mut ctx).unwrap();

        // window of 1 s, dt of 5 ms, previous estimate 100/s, instantaneous 200/s
        let decay = (-0.5f64 * 0.005 / 1.0).exp();
        let expected = 200.0 + decay * (100.0 - 200.0);
        assert_relative_eq!(node.arrival_rate(), expected, epsilon = 1e-9);
    }

    #[test]
    fn test_simultaneous_arrival_keeps_rate() {
        let mut ctx = context();
        let mut node = trace_node("0.010\n0.0\n", 0);
        node.start(&mut ctx).unwrap();
        let first = pop(&mut ctx);
        node.on_arrival(first.time, 0, &mut ctx).unwrap();
        let second = pop(&mut ctx);
        assert_eq!(second.time, first.time);
        node.on_arrival(second.time, 1, &mut ctx).unwrap();
        assert_relative_eq!(node.arrival_rate(), 100.0, epsilon = 1e-9);
        assert!(node.arrival_rate().is_finite());
    }

    #[test]
    fn test_full_queue_schedules_drop() {
        let mut ctx = context();
        let mut node = trace_node("0.010\n0.0001\n", 1);
        node.start(&mut ctx).unwrap();

        let first = pop(&mut ctx);
        assert!(node.on_arrival(first.time, 0, &mut ctx).unwrap());
        let second = pop(&mut ctx);
        assert!(!node.on_arrival(second.time, 1, &mut ctx).unwrap());
        assert_eq!(node.queued(), 1);

        let drop = pop(&mut ctx);
        assert_eq!(drop.payload, EventPayload::PacketDrop);
        assert_eq!(drop.time, second.time);
        node.on_drop(drop.time, &mut ctx);

        assert_eq!(node.received(), 2);
        assert_eq!(node.dropped(), 1);
        assert_eq!(node.received(), node.sent() + node.dropped() + node.queued() as u64);
    }

    #[test]
    fn test_transmission_delay_and_chaining() {
        let mut ctx = context();
        let mut node = trace_node("0.010\n0.0\n", 0);
        node.start(&mut ctx).unwrap();
        let a = pop(&mut ctx);
        node.on_arrival(a.time, 0, &mut ctx).unwrap();
        let b = pop(&mut ctx);
        node.on_arrival(b.time, 1, &mut ctx).unwrap();

        // First packet leaves one subframe after arriving: no queueing delay.
        ctx.advance_to(SimTime::from_millis(11)).unwrap();
        node.on_transmission_complete(SimTime::from_millis(11), 0, &mut ctx)
            .unwrap();
        assert_eq!(node.last_delay(), 0.0);
        let chained = Event::transmission(SimTime::from_millis(12), NodeRole::BaseStation, 1);
        assert!(ctx.queue().contains(&chained));

        ctx.advance_to(SimTime::from_millis(12)).unwrap();
        node.on_transmission_complete(SimTime::from_millis(12), 1, &mut ctx)
            .unwrap();
        assert_relative_eq!(node.last_delay(), 0.001, epsilon = 1e-12);
        assert!(node.is_empty());

        let report = node.report();
        assert_eq!(report.sent, 2);
        assert_relative_eq!(report.average_delay_s.unwrap(), 0.0005, epsilon = 1e-12);
        assert_relative_eq!(report.max_delay_s.unwrap(), 0.001, epsilon = 1e-12);
    }

    #[test]
    fn test_fifo_violation() {
        let mut ctx = context();
        let mut node = trace_node("0.010\n", 0);
        let err = node
            .on_transmission_complete(SimTime::ZERO, 4, &mut ctx)
            .unwrap_err();
        assert_eq!(
            err,
            SimError::FifoViolation {
                role: NodeRole::BaseStation,
                expected: None,
                actual: 4
            }
        );

        node.start(&mut ctx).unwrap();
        let a = pop(&mut ctx);
        node.on_arrival(a.time, 0, &mut ctx).unwrap();
        let err = node
            .on_transmission_complete(SimTime::from_millis(11), 9, &mut ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            SimError::FifoViolation { expected: Some(0), actual: 9, .. }
        ));
        assert_eq!(node.queued(), 1);
    }

    #[test]
    fn test_silent_source_never_schedules() {
        let mut ctx = context();
        let mut node = NodeCore::new(NodeRole::Terminal, Box::new(SilentSource), 0, 1.0);
        node.start(&mut ctx).unwrap();
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_trace_lines() {
        let mut config = SimulationConfig::default();
        config.simulation.length_s = 1.0;
        let (tracer, buffer) = EventTracer::capture();
        let mut ctx = SimContext::new(config, tracer);
        let mut node = trace_node("0.010\n0.0\n", 1);
        node.start(&mut ctx).unwrap();
        let a = pop(&mut ctx);
        node.on_arrival(a.time, 0, &mut ctx).unwrap();
        let b = pop(&mut ctx);
        node.on_arrival(b.time, 1, &mut ctx).unwrap();
        let drop = pop(&mut ctx);
        node.on_drop(drop.time, &mut ctx);
        ctx.advance_to(SimTime::from_millis(11)).unwrap();
        node.on_transmission_complete(SimTime::from_millis(11), 0, &mut ctx)
            .unwrap();

        assert_eq!(
            buffer.lines(),
            vec![
                "0.010000000 ENB PacketArrivalEvent 0 1 100.000000",
                "0.010000000 ENB PacketDropEvent 1",
                "0.011000000 ENB PacketTransmissionEvent 0 0",
            ]
        );
    }

    #[test]
    fn test_report_format() {
        let report = NodeReport {
            node: "UE".to_string(),
            received: 3,
            sent: 2,
            dropped: 1,
            queued: 0,
            average_delay_s: Some(0.0015),
            max_delay_s: Some(0.002),
        };
        assert_eq!(
            report.to_string(),
            "UE packets: received 3 sent 2 dropped 1\n\
             UE packet delay: average 0.001500000 max 0.002000000"
        );

        let idle = NodeReport {
            sent: 0,
            average_delay_s: None,
            max_delay_s: None,
            ..report
        };
        assert_eq!(idle.to_string(), "UE packets: received 3 sent 0 dropped 1");
    }
}
