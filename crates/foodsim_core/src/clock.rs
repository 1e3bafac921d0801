//! Simulated time and the event queue (spec.md §4.1, §4.3).
//!
//! Time is tracked in whole simulated minutes from `start_date`. Events are kept in a
//! `BinaryHeap` min-heap keyed by time; ties are broken by insertion order via a
//! monotonic sequence number (see DESIGN.md's Open Question decision — spec.md defines
//! no meaningful cross-kind priority, only "ties broken by insertion order").

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{DeliveryPartnerId, OrderId, RestaurantId, ReviewId, UserId};

/// Simulated time, in whole minutes elapsed since the configured start date.
pub type SimTime = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    PlaceOrder,
    PrepareOrder,
    OrderReady,
    AssignDeliveryPartner,
    PickUpOrder,
    OrderInTransit,
    CheckDeliveryStatus,
    DeliverOrder,
    CancelOrder,
    UpdateRestaurantStatus,
    UpdatePartnerLocation,
    MoveDeliveryPartner,
    DeliveryPartnerGoOffline,
    DeliveryPartnerGoOnline,
    UserRateOrder,
    RestaurantOpenClose,
    UpdateTraffic,
    AddNewUser,
    AddNewRestaurant,
    AddNewPartner,
    UpdateUserBehaviour,
    GenerateReview,
}

/// The entity an event concerns. A small closed payload, not an untyped blob, so
/// dispatch stays an exhaustive `match` (spec.md §9: "avoid dynamic type reflection").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSubject {
    User(UserId),
    Restaurant(RestaurantId),
    Partner(DeliveryPartnerId),
    Order(OrderId),
    Review(ReviewId),
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledEvent {
    pub time: SimTime,
    pub kind: EventKind,
    pub subject: EventSubject,
    seq: u64,
}

impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse so pop() yields the earliest time / lowest seq.
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Owns the simulated time cursor and the event min-heap (spec.md C3). Single-writer:
/// the Simulation Loop is the only caller (spec.md §5).
#[derive(Debug, Clone)]
pub struct SimClock {
    now: SimTime,
    start_date: DateTime<Utc>,
    queue: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl SimClock {
    pub fn new(start_date: DateTime<Utc>) -> Self {
        Self {
            now: 0,
            start_date,
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn now_datetime(&self) -> DateTime<Utc> {
        self.to_datetime(self.now)
    }

    pub fn to_datetime(&self, t: SimTime) -> DateTime<Utc> {
        self.start_date + Duration::minutes(t)
    }

    /// Enqueue an event. `time` must be `>= now()` (spec.md §3 invariant: "handlers may
    /// enqueue only events with time ≥ clock").
    pub fn enqueue(&mut self, time: SimTime, kind: EventKind, subject: EventSubject) {
        debug_assert!(time >= self.now, "event scheduled in the past");
        let time = time.max(self.now);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(ScheduledEvent {
            time,
            kind,
            subject,
            seq,
        });
    }

    pub fn enqueue_in(&mut self, delta_minutes: i64, kind: EventKind, subject: EventSubject) {
        self.enqueue(self.now + delta_minutes.max(0), kind, subject);
    }

    /// Pop the earliest event, advancing `now` to its time. Returns `None` if empty.
    pub fn dequeue(&mut self) -> Option<ScheduledEvent> {
        let event = self.queue.pop()?;
        self.now = self.now.max(event.time);
        Some(event)
    }

    pub fn peek(&self) -> Option<&ScheduledEvent> {
        self.queue.peek()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Pop up to `n` events (still ordered earliest-first).
    pub fn dequeue_batch(&mut self, n: usize) -> Vec<ScheduledEvent> {
        let mut out = Vec::with_capacity(n.min(self.queue.len()));
        for _ in 0..n {
            match self.dequeue() {
                Some(e) => out.push(e),
                None => break,
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn epoch() -> DateTime<Utc> {
        "2024-01-01T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn dequeues_in_time_order_with_fifo_ties() {
        let mut clock = SimClock::new(epoch());
        clock.enqueue(20, EventKind::PlaceOrder, EventSubject::None);
        clock.enqueue(5, EventKind::PlaceOrder, EventSubject::None);
        clock.enqueue(20, EventKind::OrderReady, EventSubject::None);
        clock.enqueue(10, EventKind::PlaceOrder, EventSubject::None);

        assert_eq!(clock.dequeue().unwrap().time, 5);
        assert_eq!(clock.now(), 5);
        assert_eq!(clock.dequeue().unwrap().time, 10);

        // Same timestamp (20): FIFO by insertion order, so PlaceOrder (enqueued first) wins.
        let third = clock.dequeue().unwrap();
        assert_eq!(third.time, 20);
        assert_eq!(third.kind, EventKind::PlaceOrder);
        let fourth = clock.dequeue().unwrap();
        assert_eq!(fourth.kind, EventKind::OrderReady);

        assert!(clock.dequeue().is_none());
        assert!(clock.is_empty());
    }

    #[test]
    fn clock_is_non_decreasing() {
        let mut clock = SimClock::new(epoch());
        clock.enqueue(5, EventKind::PlaceOrder, EventSubject::None);
        clock.dequeue();
        clock.enqueue_in(10, EventKind::PlaceOrder, EventSubject::None);
        let e = clock.dequeue().unwrap();
        assert_eq!(e.time, 15);
        assert!(clock.now() >= 5);
    }

    #[test]
    fn dequeue_batch_respects_order_and_limit() {
        let mut clock = SimClock::new(epoch());
        for t in [30, 10, 20, 40] {
            clock.enqueue(t, EventKind::UpdateTraffic, EventSubject::None);
        }
        let batch = clock.dequeue_batch(2);
        assert_eq!(batch.iter().map(|e| e.time).collect::<Vec<_>>(), vec![10, 20]);
        assert_eq!(clock.len(), 2);
    }
}
