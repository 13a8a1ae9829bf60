//! Metrics for the DRX simulator.
//!
//! Every metric the simulator records is declared once here as a [`Metric`]
//! constant. Recording goes through the `metrics` facade, so nothing is
//! collected unless the embedding application installs a recorder.
//!
//! ```rust,ignore
//! use drxsim_metrics::{describe_metrics, metric_defs, MetricLabels};
//!
//! describe_metrics();
//!
//! let labels = MetricLabels::new("ENB");
//! metrics::counter!(metric_defs::PACKETS_RECEIVED.name, &labels.to_labels()).increment(1);
//! ```

pub use metrics;

use metrics::{describe_counter, describe_gauge, describe_histogram, Unit};

/// The kind of metric (counter, gauge, or histogram).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    /// A monotonically increasing counter.
    Counter,
    /// A gauge that can go up and down.
    Gauge,
    /// A histogram for recording distributions.
    Histogram,
}

/// A metric declaration with its metadata.
///
/// ```rust
/// use drxsim_metrics::{Metric, MetricKind};
/// use metrics::Unit;
///
/// const DROPS: Metric = Metric::counter("drxsim.node.packets_dropped")
///     .with_description("Arrivals refused by a full queue")
///     .with_unit(Unit::Count)
///     .with_labels(&["node"]);
///
/// assert_eq!(DROPS.kind, MetricKind::Counter);
/// ```
#[derive(Debug, Clone)]
pub struct Metric {
    /// The metric name (e.g., "drxsim.node.queue_size").
    pub name: &'static str,
    pub kind: MetricKind,
    pub description: &'static str,
    pub unit: Option<Unit>,
    /// Expected label keys for this metric.
    pub labels: &'static [&'static str],
}

impl Metric {
    pub const fn counter(name: &'static str) -> Self {
        Self::new(name, MetricKind::Counter)
    }

    pub const fn gauge(name: &'static str) -> Self {
        Self::new(name, MetricKind::Gauge)
    }

    pub const fn histogram(name: &'static str) -> Self {
        Self::new(name, MetricKind::Histogram)
    }

    const fn new(name: &'static str, kind: MetricKind) -> Self {
        Self {
            name,
            kind,
            description: "",
            unit: None,
            labels: &[],
        }
    }

    pub const fn with_description(mut self, description: &'static str) -> Self {
        self.description = description;
        self
    }

    pub const fn with_unit(mut self, unit: Unit) -> Self {
        self.unit = Some(unit);
        self
    }

    pub const fn with_labels(mut self, labels: &'static [&'static str]) -> Self {
        self.labels = labels;
        self
    }

    /// Registers this metric's description with the installed recorder.
    pub fn describe(&self) {
        match (self.kind, self.unit) {
            (MetricKind::Counter, Some(unit)) => {
                describe_counter!(self.name, unit, self.description);
            }
            (MetricKind::Counter, None) => {
                describe_counter!(self.name, self.description);
            }
            (MetricKind::Gauge, Some(unit)) => {
                describe_gauge!(self.name, unit, self.description);
            }
            (MetricKind::Gauge, None) => {
                describe_gauge!(self.name, self.description);
            }
            (MetricKind::Histogram, Some(unit)) => {
                describe_histogram!(self.name, unit, self.description);
            }
            (MetricKind::Histogram, None) => {
                describe_histogram!(self.name, self.description);
            }
        }
    }
}

/// All metric definitions for the simulator.
pub mod metric_defs {
    use super::{Metric, Unit};

    /// Label present on every node-scoped metric.
    pub const NODE_LABELS: &[&str] = &["node"];

    // ========================================================================
    // Node Queueing
    // ========================================================================

    /// Packets that arrived at a node, including dropped ones.
    pub const PACKETS_RECEIVED: Metric = Metric::counter("drxsim.node.packets_received")
        .with_description("Packets arriving at the node's transmission queue")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Packets whose transmission completed.
    pub const PACKETS_SENT: Metric = Metric::counter("drxsim.node.packets_sent")
        .with_description("Packets transmitted by the node")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Packets refused by a full queue.
    pub const PACKETS_DROPPED: Metric = Metric::counter("drxsim.node.packets_dropped")
        .with_description("Packets dropped because the queue was full")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Queueing delay of each transmitted packet, excluding its own subframe.
    pub const PACKET_DELAY: Metric = Metric::histogram("drxsim.node.packet_delay_s")
        .with_description("Queueing delay of transmitted packets in seconds")
        .with_unit(Unit::Seconds)
        .with_labels(NODE_LABELS);

    /// Packets waiting in the queue.
    pub const QUEUE_SIZE: Metric = Metric::gauge("drxsim.node.queue_size")
        .with_description("Packets waiting in the node's transmission queue")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    /// Smoothed arrival-rate estimate.
    pub const ARRIVAL_RATE: Metric = Metric::gauge("drxsim.node.arrival_rate")
        .with_description("Exponentially smoothed packet arrival rate")
        .with_unit(Unit::CountPerSecond)
        .with_labels(NODE_LABELS);

    // ========================================================================
    // DRX Control
    // ========================================================================

    /// Terminal state transitions, by entered state.
    ///
    /// Labels: node, state
    pub const UE_STATE_TRANSITIONS: Metric = Metric::counter("drxsim.ue.state_transitions")
        .with_description("Terminal power-state transitions by entered state")
        .with_unit(Unit::Count)
        .with_labels(&["node", "state"]);

    /// Queue threshold in effect after each adaptive update.
    pub const ENB_QUEUE_THRESHOLD: Metric = Metric::gauge("drxsim.enb.queue_threshold")
        .with_description("Downlink queue depth that forces the terminal out of DRX")
        .with_unit(Unit::Count)
        .with_labels(NODE_LABELS);

    // ========================================================================
    // Engine
    // ========================================================================

    /// Events dispatched by the event loop.
    pub const EVENTS_PROCESSED: Metric = Metric::counter("drxsim.sim.events_processed")
        .with_description("Events dispatched by the simulation loop")
        .with_unit(Unit::Count);

    /// Returns a slice of all defined metrics.
    pub const ALL: &[&Metric] = &[
        &PACKETS_RECEIVED,
        &PACKETS_SENT,
        &PACKETS_DROPPED,
        &PACKET_DELAY,
        &QUEUE_SIZE,
        &ARRIVAL_RATE,
        &UE_STATE_TRANSITIONS,
        &ENB_QUEUE_THRESHOLD,
        &EVENTS_PROCESSED,
    ];
}

/// Labels identifying the node a metric belongs to.
///
/// ```rust
/// use drxsim_metrics::MetricLabels;
///
/// let labels = MetricLabels::new("UE").with_run("seed-7");
/// assert_eq!(labels.to_labels().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct MetricLabels {
    /// Node tag ("ENB" or "UE").
    pub node: String,
    /// Optional run identifier, for recorders shared between runs.
    pub run: Option<String>,
}

impl MetricLabels {
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            run: None,
        }
    }

    pub fn with_run(mut self, run: impl Into<String>) -> Self {
        self.run = Some(run.into());
        self
    }

    /// Converts the labels to the `metrics` crate label format.
    pub fn to_labels(&self) -> Vec<(&'static str, String)> {
        let mut labels = vec![("node", self.node.clone())];
        if let Some(run) = &self.run {
            labels.push(("run", run.clone()));
        }
        labels
    }

    /// Returns labels with additional key-value pairs.
    pub fn with(&self, extra: &[(&'static str, String)]) -> Vec<(&'static str, String)> {
        let mut labels = self.to_labels();
        labels.extend_from_slice(extra);
        labels
    }
}

/// Registers the description of every metric with the installed recorder.
///
/// Call once at startup, after installing a recorder.
pub fn describe_metrics() {
    for metric in metric_defs::ALL {
        metric.describe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_labels_new() {
        let labels = MetricLabels::new("ENB");
        assert_eq!(labels.node, "ENB");
        assert!(labels.run.is_none());
        assert_eq!(labels.to_labels(), vec![("node", "ENB".to_string())]);
    }

    #[test]
    fn test_to_labels_with_run() {
        let labels = MetricLabels::new("UE").with_run("1");
        let label_vec = labels.to_labels();
        assert_eq!(label_vec.len(), 2);
        assert!(label_vec.contains(&("run", "1".to_string())));
    }

    #[test]
    fn test_with_extra_labels() {
        let labels = MetricLabels::new("UE");
        let extended = labels.with(&[("state", "CONNECTED_DRX".to_string())]);
        assert_eq!(extended.len(), 2);
        assert!(extended.contains(&("state", "CONNECTED_DRX".to_string())));
    }

    #[test]
    fn test_metric_definitions() {
        assert_eq!(metric_defs::PACKETS_SENT.name, "drxsim.node.packets_sent");
        assert_eq!(metric_defs::PACKETS_SENT.kind, MetricKind::Counter);
        assert_eq!(metric_defs::PACKET_DELAY.kind, MetricKind::Histogram);
        assert_eq!(metric_defs::PACKET_DELAY.unit, Some(Unit::Seconds));
        assert_eq!(metric_defs::QUEUE_SIZE.kind, MetricKind::Gauge);
        assert_eq!(metric_defs::UE_STATE_TRANSITIONS.labels, &["node", "state"]);
        assert!(metric_defs::EVENTS_PROCESSED.labels.is_empty());
    }

    #[test]
    fn test_all_metric_names_are_unique_and_prefixed() {
        let mut names: Vec<&str> = metric_defs::ALL.iter().map(|m| m.name).collect();
        assert!(names.iter().all(|n| n.starts_with("drxsim.")));
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), metric_defs::ALL.len());
    }

    #[test]
    fn test_describe_without_recorder_is_noop() {
        describe_metrics();
    }

    #[test]
    fn test_metric_minimal() {
        const MINIMAL: Metric = Metric::gauge("minimal");
        assert_eq!(MINIMAL.kind, MetricKind::Gauge);
        assert_eq!(MINIMAL.description, "");
        assert_eq!(MINIMAL.unit, None);
        assert!(MINIMAL.labels.is_empty());
    }
}
