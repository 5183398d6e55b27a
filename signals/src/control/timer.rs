use common::FastMap;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Payload carried by a controller timer.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TimerKind {
    /// Periodic demand recalculation (high density mode)
    RecalcFired,
    /// The current phase's time is up
    SwitchFired,
}

/// Opaque handle to a pending timer, owned by the scheduler.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerHandle(pub u64);

/// The event substrate the controller arms its timers on.
pub trait EventScheduler {
    /// Arms a timer firing `delay` seconds after the scheduler's current time.
    fn schedule(&mut self, delay: f64, kind: TimerKind) -> TimerHandle;

    /// Cancels a pending timer. Cancelling a fired or unknown handle does nothing.
    fn cancel(&mut self, handle: TimerHandle);
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Fired {
    pub time: f64,
    pub kind: TimerKind,
    pub handle: TimerHandle,
}

/// Deterministic discrete-event queue: timers fire in time order, ties in arming order.
#[derive(Debug, Default)]
pub struct TimerQueue {
    now: f64,
    next_id: u64,
    heap: BinaryHeap<Reverse<(OrderedFloat<f64>, u64)>>,
    pending: FastMap<u64, TimerKind>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.now
    }

    /// Moves the clock forward without firing anything. Never moves backward.
    pub fn advance_to(&mut self, time: f64) {
        self.now = self.now.max(time);
    }

    /// Number of timers still pending.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_pending(&self, handle: TimerHandle) -> bool {
        self.pending.contains_key(&handle.0)
    }

    /// Time of the next live timer.
    pub fn peek_time(&mut self) -> Option<f64> {
        self.drop_cancelled();
        self.heap.peek().map(|Reverse((t, _))| t.0)
    }

    /// Fires the next live timer, advancing the clock to its time.
    pub fn pop(&mut self) -> Option<Fired> {
        self.drop_cancelled();
        let Reverse((time, id)) = self.heap.pop()?;
        let kind = self.pending.remove(&id)?;
        self.now = time.0;
        Some(Fired {
            time: time.0,
            kind,
            handle: TimerHandle(id),
        })
    }

    /// Like [`TimerQueue::pop`], but only if the next timer fires at or before `time`.
    pub fn pop_until(&mut self, time: f64) -> Option<Fired> {
        if self.peek_time()? > time {
            return None;
        }
        self.pop()
    }

    fn drop_cancelled(&mut self) {
        while let Some(Reverse((_, id))) = self.heap.peek() {
            if self.pending.contains_key(id) {
                return;
            }
            self.heap.pop();
        }
    }
}

impl EventScheduler for TimerQueue {
    fn schedule(&mut self, delay: f64, kind: TimerKind) -> TimerHandle {
        let id = self.next_id;
        self.next_id += 1;
        let at = self.now + delay.max(0.0);
        self.heap.push(Reverse((OrderedFloat(at), id)));
        self.pending.insert(id, kind);
        TimerHandle(id)
    }

    fn cancel(&mut self, handle: TimerHandle) {
        self.pending.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_in_time_order() {
        let mut q = TimerQueue::new();
        q.schedule(10.0, TimerKind::SwitchFired);
        q.schedule(5.0, TimerKind::RecalcFired);
        q.schedule(5.0, TimerKind::SwitchFired);

        let a = q.pop().unwrap();
        assert_eq!((a.time, a.kind), (5.0, TimerKind::RecalcFired));
        let b = q.pop().unwrap();
        assert_eq!((b.time, b.kind), (5.0, TimerKind::SwitchFired));
        assert_eq!(q.now(), 5.0);

        // Delays are relative to the last firing
        q.schedule(1.0, TimerKind::RecalcFired);
        assert_eq!(q.pop().unwrap().time, 6.0);
        assert_eq!(q.pop().unwrap().time, 10.0);
        assert!(q.pop().is_none());
    }

    #[test]
    fn cancelled_timers_never_fire() {
        let mut q = TimerQueue::new();
        let h = q.schedule(1.0, TimerKind::SwitchFired);
        q.schedule(2.0, TimerKind::RecalcFired);
        q.cancel(h);
        assert!(!q.is_pending(h));
        assert_eq!(q.len(), 1);
        assert_eq!(q.peek_time(), Some(2.0));
        assert_eq!(q.pop().unwrap().kind, TimerKind::RecalcFired);

        // Cancelling again or after firing is harmless
        q.cancel(h);
        assert!(q.is_empty());
    }

    #[test]
    fn pop_until_respects_horizon() {
        let mut q = TimerQueue::new();
        q.schedule(3.0, TimerKind::SwitchFired);
        assert!(q.pop_until(2.9).is_none());
        assert_eq!(q.pop_until(3.0).unwrap().time, 3.0);
    }

    #[test]
    fn clock_only_moves_forward() {
        let mut q = TimerQueue::new();
        q.advance_to(4.0);
        q.advance_to(1.0);
        assert_eq!(q.now(), 4.0);
        q.schedule(1.0, TimerKind::SwitchFired);
        assert_eq!(q.peek_time(), Some(5.0));
    }
}
