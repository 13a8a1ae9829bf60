//! The pending-event schedule.
//!
//! Events are kept in ascending time order; events with equal times keep their
//! insertion order. The queue also carries the simulation clock, so it can
//! reject events that would fire in the past.
//!
//! Timers are cancelled by value: the caller keeps a copy of the event it
//! scheduled and asks the queue to remove an equal entry. A secondary index
//! keyed by event value makes that lookup `O(log n)` instead of a scan.

use crate::{Event, SimError, SimResult, SimTime};
use std::collections::{BTreeMap, HashMap};
use tracing::trace;

/// Ordering key: event time, then insertion sequence number.
type SlotKey = (SimTime, u64);

/// What happened to an event handed to [`EventQueue::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The event is now pending.
    Inserted,
    /// The event fires after the horizon and was discarded.
    BeyondHorizon,
    /// An equal event is already pending; nothing changed.
    Duplicate,
}

impl ScheduleOutcome {
    pub fn is_inserted(self) -> bool {
        self == ScheduleOutcome::Inserted
    }
}

/// Time-ordered pending-event set with a monotonic clock.
#[derive(Debug, Clone)]
pub struct EventQueue {
    slots: BTreeMap<SlotKey, Event>,
    index: HashMap<Event, SlotKey>,
    next_seq: u64,
    now: SimTime,
    horizon: SimTime,
}

impl EventQueue {
    /// Create an empty queue whose clock starts at zero.
    ///
    /// Events later than `horizon` are never inserted.
    pub fn new(horizon: SimTime) -> Self {
        EventQueue {
            slots: BTreeMap::new(),
            index: HashMap::new(),
            next_seq: 0,
            now: SimTime::ZERO,
            horizon,
        }
    }

    /// Current simulation clock (time of the last dispatched event).
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// Last instant at which an event may fire.
    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Schedule an event.
    ///
    /// Scheduling before the clock is a fatal error. Events beyond the horizon
    /// and duplicates of pending events are discarded and reported through the
    /// returned [`ScheduleOutcome`].
    pub fn insert(&mut self, event: Event) -> SimResult<ScheduleOutcome> {
        if event.time < self.now {
            return Err(SimError::NonCausalEvent {
                requested: event.time,
                current: self.now,
            });
        }
        if event.time > self.horizon {
            trace!("EventQueue: discarding {} beyond horizon", event);
            return Ok(ScheduleOutcome::BeyondHorizon);
        }
        if self.index.contains_key(&event) {
            trace!("EventQueue: discarding duplicate {}", event);
            return Ok(ScheduleOutcome::Duplicate);
        }

        let key = (event.time, self.next_seq);
        self.next_seq += 1;
        self.slots.insert(key, event);
        self.index.insert(event, key);
        Ok(ScheduleOutcome::Inserted)
    }

    /// Earliest pending event, without removing it.
    pub fn peek(&self) -> Option<&Event> {
        self.slots.values().next()
    }

    /// Remove and return the earliest pending event.
    ///
    /// This does not move the clock; see [`EventQueue::advance_to`].
    pub fn pop(&mut self) -> Option<Event> {
        let (_, event) = self.slots.pop_first()?;
        self.index.remove(&event);
        Some(event)
    }

    /// Remove the pending event equal to `event`.
    ///
    /// Returns `false` (and changes nothing) if no such event is pending, which
    /// is the normal outcome for a timer that already fired.
    pub fn cancel(&mut self, event: &Event) -> bool {
        match self.index.remove(event) {
            Some(key) => {
                self.slots.remove(&key);
                trace!("EventQueue: cancelled {}", event);
                true
            }
            None => false,
        }
    }

    /// Whether an event equal to `event` is pending.
    pub fn contains(&self, event: &Event) -> bool {
        self.index.contains_key(event)
    }

    /// Move the clock forward to `time`.
    pub fn advance_to(&mut self, time: SimTime) -> SimResult<()> {
        if time < self.now {
            return Err(SimError::NonCausalEvent {
                requested: time,
                current: self.now,
            });
        }
        self.now = time;
        Ok(())
    }

    /// Pending events in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.slots.values()
    }
}
