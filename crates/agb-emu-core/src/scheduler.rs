//! Cycle-driven event scheduler.
//!
//! Hardware units register the key of an event together with the number of
//! cycles until it should happen. The clock driver asks for the [`horizon`]
//! before running the CPU, then hands the cycles it actually executed to
//! [`step`], which fires every event that came due.
//!
//! Events that share a target cycle fire in the order they were registered.
//! Every [`add`] call takes a ticket from a global sequence counter, and the
//! pending list is ordered by `(target, sequence)`.
//!
//! [`horizon`]: Scheduler::horizon
//! [`step`]: Scheduler::step
//! [`add`]: Scheduler::add

use std::collections::VecDeque;
use std::fmt;

/// A count of emulated CPU cycles.
pub type Cycles = u64;

#[cfg(feature = "sched-trace")]
macro_rules! sched_trace {
    ($($arg:tt)*) => {
        log::trace!(target: "agb_emu_core::scheduler", $($arg)*);
    };
}
#[cfg(not(feature = "sched-trace"))]
macro_rules! sched_trace {
    ($($arg:tt)*) => {};
}

/// Something that reacts when one of its scheduled events comes due.
///
/// `K` identifies the event. An implementor usually owns several hardware
/// units and routes each key to the unit it belongs to.
pub trait EventDevice<K> {
    /// Called exactly once each time `event` reaches its target cycle.
    ///
    /// At this point `event` is no longer registered. Returning `Some(wait)`
    /// re-arms it `wait` cycles from now. Returning `None` leaves it
    /// unregistered. The callback may also `add`/`cancel` any other key
    /// through `scheduler`. Re-arming `event` both through `scheduler` and
    /// through the return value is a double registration.
    fn tick(&mut self, event: K, scheduler: &mut Scheduler<K>) -> Option<Cycles>;
}

#[derive(Clone, Copy, Debug)]
struct Entry<K> {
    key: K,
    target: Cycles,
    seq: u64,
}

#[derive(Clone, Copy, Debug)]
struct Firing<K> {
    key: K,
    target: Cycles,
}

/// Per-machine event scheduler.
pub struct Scheduler<K> {
    now: Cycles,
    next_seq: u64,
    /// Registered events, sorted by `(target, seq)`.
    pending: Vec<Entry<K>>,
    /// Events extracted by the running sweep that have not fired yet.
    due: VecDeque<Entry<K>>,
    firing: Option<Firing<K>>,
    sweeping: bool,
}

impl<K: Copy + Eq + fmt::Debug> Scheduler<K> {
    pub fn new() -> Self {
        Self {
            now: 0,
            next_seq: 0,
            pending: Vec::with_capacity(16),
            due: VecDeque::with_capacity(16),
            firing: None,
            sweeping: false,
        }
    }

    /// Total cycles elapsed since construction or the last [`reset`](Self::reset).
    #[inline]
    pub fn now(&self) -> Cycles {
        self.now
    }

    /// Register `key` to fire `cycles` cycles from now.
    ///
    /// With `cycles == 0` the event fires on the next [`step`](Self::step),
    /// never within the sweep that is currently running.
    ///
    /// # Panics
    ///
    /// Panics if `key` is already registered.
    pub fn add(&mut self, key: K, cycles: Cycles) {
        assert!(
            !self.is_pending(key),
            "event {key:?} is already scheduled; cancel it first"
        );

        let target = self.now + cycles;
        let seq = self.next_seq;
        self.next_seq += 1;

        // Tickets only grow, so the new entry goes after everything that
        // shares its target.
        let at = self.pending.partition_point(|e| e.target <= target);
        self.pending.insert(at, Entry { key, target, seq });
        sched_trace!("add {key:?} at {target} (now {})", self.now);
    }

    /// Remove `key` if it is registered. Returns whether anything was removed.
    pub fn cancel(&mut self, key: K) -> bool {
        if let Some(i) = self.pending.iter().position(|e| e.key == key) {
            self.pending.remove(i);
            sched_trace!("cancel {key:?} (pending)");
            return true;
        }
        if let Some(i) = self.due.iter().position(|e| e.key == key) {
            self.due.remove(i);
            sched_trace!("cancel {key:?} (due)");
            return true;
        }
        false
    }

    /// Cancel `key` if needed and register it again `cycles` from now.
    pub fn reschedule(&mut self, key: K, cycles: Cycles) {
        self.cancel(key);
        self.add(key, cycles);
    }

    /// Whether `key` is waiting to fire, including events already selected by
    /// the running sweep. The event currently inside its own `tick` is not
    /// pending.
    pub fn is_pending(&self, key: K) -> bool {
        self.pending.iter().any(|e| e.key == key) || self.due.iter().any(|e| e.key == key)
    }

    /// Cycles left before `key` fires, or `None` when it is not registered.
    pub fn wait_cycles(&self, key: K) -> Option<Cycles> {
        self.pending
            .iter()
            .chain(self.due.iter())
            .find(|e| e.key == key)
            .map(|e| e.target.saturating_sub(self.now))
    }

    /// Cycles until the earliest pending event. `None` means nothing is
    /// scheduled, so the caller has no upper bound and should poll again after
    /// a fixed slice instead of running unboundedly.
    pub fn horizon(&self) -> Option<Cycles> {
        if !self.due.is_empty() {
            return Some(0);
        }
        self.pending
            .first()
            .map(|e| e.target.saturating_sub(self.now))
    }

    /// The event whose `tick` is running, if any.
    pub fn firing(&self) -> Option<K> {
        self.firing.map(|f| f.key)
    }

    /// How many cycles after its target the running event fired.
    ///
    /// This is non-zero only when a `step` overshot the horizon. Periodic
    /// devices subtract it from their period to stay phase-locked.
    pub fn late(&self) -> Cycles {
        self.firing
            .map(|f| self.now.saturating_sub(f.target))
            .unwrap_or(0)
    }

    /// Number of registered events.
    pub fn len(&self) -> usize {
        self.pending.len() + self.due.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every registration and rewind the clock to zero.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a `tick`.
    pub fn reset(&mut self) {
        assert!(!self.sweeping, "Scheduler::reset called during a sweep");
        self.now = 0;
        self.next_seq = 0;
        self.pending.clear();
        self.due.clear();
        self.firing = None;
    }

    /// Advance the clock by `cycles` and fire everything that came due.
    ///
    /// The due set is taken once, before any callback runs. Events added
    /// while it is being processed wait for the next `step`, even when they
    /// are due immediately. Events cancelled while it is being processed do
    /// not fire.
    ///
    /// # Panics
    ///
    /// Panics when called from inside a `tick`.
    pub fn step<D>(&mut self, cycles: Cycles, devices: &mut D)
    where
        D: EventDevice<K> + ?Sized,
    {
        assert!(!self.sweeping, "Scheduler::step re-entered from a tick");

        self.now += cycles;

        let now = self.now;
        let n = self.pending.partition_point(|e| e.target <= now);
        if n == 0 {
            return;
        }

        self.sweeping = true;
        self.due.extend(self.pending.drain(..n));

        while let Some(entry) = self.due.pop_front() {
            sched_trace!(
                "fire {:?} target {} now {} (late {})",
                entry.key,
                entry.target,
                now,
                now - entry.target
            );
            self.firing = Some(Firing {
                key: entry.key,
                target: entry.target,
            });
            let rearm = devices.tick(entry.key, self);
            self.firing = None;

            if let Some(wait) = rearm {
                self.add(entry.key, wait);
            }
        }

        self.sweeping = false;
    }
}

impl<K: Copy + Eq + fmt::Debug> Default for Scheduler<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug> fmt::Debug for Scheduler<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("pending", &self.pending)
            .field("due", &self.due)
            .finish()
    }
}
