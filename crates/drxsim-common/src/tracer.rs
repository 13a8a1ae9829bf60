//! Verbose per-event trace.
//!
//! When enabled, every handled event produces one line of the form
//!
//! ```text
//! 0.010000000 ENB PacketArrivalEvent 0 1 100.000000
//! ```
//!
//! i.e. the time with nanosecond precision, the node tag, the event name and
//! a kind-specific list of fields. This trace is part of the simulator's
//! output and is independent of `tracing` log levels.
//!
//! ```rust,ignore
//! use drxsim_common::tracer::{EventTracer, TraceRecord};
//!
//! let tracer = EventTracer::stdout();
//! tracer.log(|| TraceRecord::new(now, NodeRole::Terminal, EventKind::StateTransition)
//!     .with_field(UeState::Connected));
//! ```

use crate::{EventKind, NodeRole, SimTime};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Trace Records
// ============================================================================

/// One line of the verbose trace.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceRecord {
    /// Simulation time of the handled event.
    pub time: SimTime,
    /// Node that handled it.
    pub role: NodeRole,
    /// Event kind.
    pub kind: EventKind,
    /// Kind-specific fields, already formatted.
    pub fields: Vec<String>,
}

impl TraceRecord {
    pub fn new(time: SimTime, role: NodeRole, kind: EventKind) -> Self {
        TraceRecord {
            time,
            role,
            kind,
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, value: impl fmt::Display) -> Self {
        self.fields.push(value.to_string());
        self
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.time, self.role, self.kind)?;
        for field in &self.fields {
            write!(f, " {}", field)?;
        }
        Ok(())
    }
}

// ============================================================================
// Event Tracer
// ============================================================================

/// Shared in-memory trace buffer, filled by [`EventTracer::capture`].
#[derive(Debug, Clone, Default)]
pub struct TraceBuffer(Arc<Mutex<Vec<String>>>);

impl TraceBuffer {
    /// Copy of all captured lines.
    pub fn lines(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn push(&self, line: String) {
        self.0.lock().push(line);
    }
}

#[derive(Debug, Clone)]
enum Sink {
    Disabled,
    Stdout,
    Capture(TraceBuffer),
}

/// Writes [`TraceRecord`]s to their destination.
///
/// Cloning is cheap; clones share the same destination.
#[derive(Debug, Clone)]
pub struct EventTracer {
    sink: Sink,
}

impl EventTracer {
    /// A tracer that discards everything.
    pub fn disabled() -> Self {
        EventTracer { sink: Sink::Disabled }
    }

    /// A tracer printing one line per record on standard output.
    pub fn stdout() -> Self {
        EventTracer { sink: Sink::Stdout }
    }

    /// A tracer collecting lines in memory, returned alongside it.
    pub fn capture() -> (Self, TraceBuffer) {
        let buffer = TraceBuffer::default();
        (
            EventTracer {
                sink: Sink::Capture(buffer.clone()),
            },
            buffer,
        )
    }

    /// Select stdout or disabled from a verbose flag.
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Self::stdout()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.sink, Sink::Disabled)
    }

    /// Record a trace line. The record is only built when tracing is enabled.
    pub fn log(&self, f: impl FnOnce() -> TraceRecord) {
        match &self.sink {
            Sink::Disabled => {}
            Sink::Stdout => println!("{}", f()),
            Sink::Capture(buffer) => buffer.push(f().to_string()),
        }
    }
}

impl Default for EventTracer {
    fn default() -> Self {
        Self::disabled()
    }
}
