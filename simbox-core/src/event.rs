//! Event records and the per-sandbox future-event list.
//!
//! Events are totally ordered by `(time, index)`: the scheduled timestamp
//! first, then the creation index, which gives strict FIFO execution among
//! events that share a timestamp, across the entire sandbox tree, since the
//! index counter is owned by the tree root.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::SimTime;

/// Unique, monotonically increasing identifier for events.
///
/// Allocated by the tree that owns the scheduling sandbox: the counter starts
/// at 0 and each allocation returns the current value before incrementing.
/// For two events scheduled in order at the same timestamp, the earlier one
/// always carries the smaller id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventId(pub u64);

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Event({})", self.0)
    }
}

/// Ordering key of an event inside a future-event list.
pub(crate) type EventKey = (SimTime, EventId);

/// The payload invoked when an event fires.
pub(crate) type Action = Box<dyn FnOnce() + Send>;

/// An immutable scheduled-event record.
///
/// Constructed by `Sandbox::schedule*` and consumed exactly once when the run
/// loop pops it from its owner's future-event list.
pub(crate) struct Event {
    pub(crate) id: EventId,
    pub(crate) time: SimTime,
    pub(crate) owner: Uuid,
    pub(crate) action: Option<Action>,
    pub(crate) tag: Option<String>,
}

impl Event {
    pub(crate) fn key(&self) -> EventKey {
        (self.time, self.id)
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Event")
            .field("id", &self.id)
            .field("time", &self.time)
            .field("owner", &self.owner)
            .field("has_action", &self.action.is_some())
            .field("tag", &self.tag)
            .finish()
    }
}

/// Token returned by `Sandbox::schedule*`, usable for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub(crate) owner: usize,
    pub(crate) key: EventKey,
}

impl ScheduledEvent {
    /// The absolute timestamp the event will fire at.
    pub fn time(&self) -> SimTime {
        self.key.0
    }

    /// The event's creation index.
    pub fn id(&self) -> EventId {
        self.key.1
    }
}

/// A sandbox's future-event list.
///
/// Backed by a `BTreeMap` keyed by `(time, id)`: logarithmic insert and
/// removal by identity, with the head event as the first entry. The key is
/// globally unique because ids never repeat.
#[derive(Debug, Default)]
pub(crate) struct Fel {
    events: BTreeMap<EventKey, Event>,
}

impl Fel {
    pub(crate) fn insert(&mut self, event: Event) -> EventKey {
        let key = event.key();
        let evicted = self.events.insert(key, event);
        debug_assert!(evicted.is_none(), "duplicate event key {key:?}");
        key
    }

    pub(crate) fn min(&self) -> Option<&Event> {
        self.events.values().next()
    }

    pub(crate) fn remove(&mut self, key: EventKey) -> Option<Event> {
        self.events.remove(&key)
    }

    #[allow(dead_code)]
    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.events.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: u64, time: SimTime) -> Event {
        Event {
            id: EventId(id),
            time,
            owner: Uuid::from_u128(1),
            action: None,
            tag: None,
        }
    }

    #[test]
    fn test_key_orders_by_time_then_id() {
        let early = event(7, SimTime::from_secs(1)).key();
        let late = event(2, SimTime::from_secs(2)).key();
        assert!(early < late);

        // Same time: the smaller id wins.
        let first = event(1, SimTime::from_secs(1)).key();
        let second = event(2, SimTime::from_secs(1)).key();
        assert!(first < second);
    }

    #[test]
    fn test_fel_min_is_earliest() {
        let mut fel = Fel::default();
        fel.insert(event(3, SimTime::from_secs(5)));
        fel.insert(event(4, SimTime::from_secs(1)));
        fel.insert(event(5, SimTime::from_secs(3)));

        assert_eq!(fel.min().unwrap().id, EventId(4));
        assert_eq!(
            fel.min().unwrap().key(),
            (SimTime::from_secs(1), EventId(4))
        );
        assert_eq!(fel.len(), 3);
    }

    #[test]
    fn test_fel_fifo_within_timestamp() {
        let mut fel = Fel::default();
        let t = SimTime::from_secs(2);
        fel.insert(event(10, t));
        fel.insert(event(11, t));
        fel.insert(event(12, t));

        let mut popped = Vec::new();
        while let Some(key) = fel.min().map(Event::key) {
            popped.push(fel.remove(key).unwrap().id);
        }
        assert_eq!(popped, vec![EventId(10), EventId(11), EventId(12)]);
    }

    #[test]
    fn test_fel_remove_by_identity() {
        let mut fel = Fel::default();
        let t = SimTime::from_secs(1);
        let key_a = fel.insert(event(1, t));
        let key_b = fel.insert(event(2, t));

        // Removing a specific event at a shared timestamp leaves the other.
        assert!(fel.remove(key_a).is_some());
        assert!(fel.remove(key_a).is_none());
        assert_eq!(fel.min().map(Event::key), Some(key_b));
    }

    #[test]
    fn test_fel_clear() {
        let mut fel = Fel::default();
        fel.insert(event(1, SimTime::from_secs(1)));
        fel.insert(event(2, SimTime::from_secs(2)));
        fel.clear();
        assert!(fel.is_empty());
        assert!(fel.min().is_none());
    }
}
