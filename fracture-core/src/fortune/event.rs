//! Sweep event queue.
//!
//! Site and circle events share one binary heap ordered by (y, x) with circle
//! events winning exact ties. Circle events live in a slot pool; cancelling one
//! bumps its slot generation so the heap entry goes stale and is skipped on
//! pop instead of being searched for and removed.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::beachline::{ArcId, CircleId};

/// A predicted collapse of `arc` into a diagram vertex
#[derive(Debug, Clone, Copy)]
pub(crate) struct CircleEvent {
    pub arc: ArcId,
    /// Circumcenter x
    pub x: f64,
    /// Circumcenter y; the event fires at `y_center + radius`
    pub y_center: f64,
    generation: u32,
    live: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Event {
    /// Index into the caller's input site slice
    Site(usize),
    Circle(CircleId),
}

#[derive(Debug, Clone, Copy)]
enum Payload {
    Site(usize),
    Circle { id: CircleId, generation: u32 },
}

#[derive(Debug, Clone, Copy)]
struct Queued {
    x: f64,
    y: f64,
    seq: u64,
    payload: Payload,
}

impl Queued {
    fn rank(&self) -> u8 {
        match self.payload {
            Payload::Circle { .. } => 0,
            Payload::Site(_) => 1,
        }
    }

    /// Processing order: smaller first
    fn priority(&self, other: &Self) -> Ordering {
        self.y
            .total_cmp(&other.y)
            .then(self.x.total_cmp(&other.x))
            .then(self.rank().cmp(&other.rank()))
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.priority(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Queued {
    // BinaryHeap is a max-heap; invert so the earliest event is on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other.priority(self)
    }
}

#[derive(Debug, Default)]
pub(crate) struct EventQueue {
    heap: BinaryHeap<Queued>,
    circles: Vec<CircleEvent>,
    free: Vec<CircleId>,
    seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    pub fn push_site(&mut self, index: usize, x: f64, y: f64) {
        let seq = self.next_seq();
        self.heap.push(Queued { x, y, seq, payload: Payload::Site(index) });
    }

    /// Schedule a circle event firing when the sweep reaches `y`, reusing a
    /// released slot when one is free.
    pub fn push_circle(&mut self, arc: ArcId, x: f64, y: f64, y_center: f64) -> CircleId {
        let id = match self.free.pop() {
            Some(id) => {
                let slot = &mut self.circles[id];
                *slot = CircleEvent { arc, x, y_center, generation: slot.generation, live: true };
                id
            }
            None => {
                self.circles.push(CircleEvent { arc, x, y_center, generation: 0, live: true });
                self.circles.len() - 1
            }
        };
        let generation = self.circles[id].generation;
        let seq = self.next_seq();
        self.heap.push(Queued { x, y, seq, payload: Payload::Circle { id, generation } });
        id
    }

    pub fn circle(&self, id: CircleId) -> &CircleEvent {
        &self.circles[id]
    }

    /// Invalidate a scheduled circle event and release its slot.
    pub fn cancel(&mut self, id: CircleId) {
        let slot = &mut self.circles[id];
        if slot.live {
            slot.live = false;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(id);
        }
    }

    /// Next live event, skipping cancelled circle entries
    pub fn pop(&mut self) -> Option<Event> {
        while let Some(q) = self.heap.pop() {
            match q.payload {
                Payload::Site(index) => return Some(Event::Site(index)),
                Payload::Circle { id, generation } => {
                    let slot = &self.circles[id];
                    if slot.live && slot.generation == generation {
                        return Some(Event::Circle(id));
                    }
                }
            }
        }
        None
    }

    /// Drop pending events and release every circle slot; the pool is kept.
    pub fn clear(&mut self) {
        self.heap.clear();
        for id in 0..self.circles.len() {
            self.cancel(id);
        }
        self.seq = 0;
    }

    #[cfg(test)]
    fn pool_size(&self) -> usize {
        self.circles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orders_by_y_then_x() {
        let mut q = EventQueue::new();
        q.push_site(0, 5.0, 3.0);
        q.push_site(1, 1.0, 3.0);
        q.push_site(2, 9.0, -1.0);
        q.push_site(3, 0.0, 10.0);
        let order: Vec<Event> = std::iter::from_fn(|| q.pop()).collect();
        assert_eq!(
            order,
            vec![Event::Site(2), Event::Site(1), Event::Site(0), Event::Site(3)]
        );
    }

    #[test]
    fn test_circle_wins_exact_tie() {
        let mut q = EventQueue::new();
        q.push_site(0, 2.0, 4.0);
        let c = q.push_circle(7, 2.0, 4.0, 1.0);
        assert_eq!(q.pop(), Some(Event::Circle(c)));
        assert_eq!(q.pop(), Some(Event::Site(0)));
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_cancelled_circle_is_skipped_and_slot_reused() {
        let mut q = EventQueue::new();
        let a = q.push_circle(1, 0.0, 1.0, 0.0);
        q.push_site(0, 0.0, 2.0);
        q.cancel(a);
        // Reuse the slot for a later event; the stale entry must not resurface
        let b = q.push_circle(2, 0.0, 3.0, 0.0);
        assert_eq!(a, b);
        assert_eq!(q.pool_size(), 1);
        assert_eq!(q.pop(), Some(Event::Site(0)));
        assert_eq!(q.pop(), Some(Event::Circle(b)));
        assert_eq!(q.circle(b).arc, 2);
        assert_eq!(q.pop(), None);
    }

    #[test]
    fn test_clear_keeps_pool() {
        let mut q = EventQueue::new();
        q.push_circle(0, 0.0, 0.0, 0.0);
        q.push_circle(1, 0.0, 1.0, 0.0);
        q.clear();
        assert_eq!(q.pop(), None);
        q.push_circle(2, 0.0, 0.0, 0.0);
        assert_eq!(q.pool_size(), 2);
    }
}
