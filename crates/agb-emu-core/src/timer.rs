use crate::event::Event;
use crate::scheduler::{Cycles, Scheduler};

/// log2 of the prescaler selected by TMxCNT_H bits 0-1 (1, 64, 256, 1024).
const PRESCALER_SHIFT: [u32; 4] = [0, 6, 8, 10];

const CNT_COUNT_UP: u16 = 0x04;
const CNT_IRQ: u16 = 0x40;
const CNT_ENABLE: u16 = 0x80;

#[derive(Clone, Debug, Default)]
struct Timer {
    reload: u16,
    /// Counter value as of `latched_at`.
    counter: u16,
    control: u16,
    latched_at: Cycles,
}

impl Timer {
    fn enabled(&self) -> bool {
        self.control & CNT_ENABLE != 0
    }

    fn count_up(&self) -> bool {
        self.control & CNT_COUNT_UP != 0
    }

    /// Counting on its own prescaler rather than on the previous timer.
    fn free_running(&self) -> bool {
        self.enabled() && !self.count_up()
    }

    fn shift(&self) -> u32 {
        PRESCALER_SHIFT[(self.control & 0x03) as usize]
    }
}

/// The four 16-bit timers.
///
/// A free-running timer does not count cycle by cycle. It keeps the counter
/// value from the last time it was latched and derives the live value from
/// the scheduler clock. Its only scheduled activity is the overflow event.
#[derive(Clone, Debug, Default)]
pub struct Timers {
    channels: [Timer; 4],
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Live counter value of timer `n`.
    pub fn counter(&self, n: usize, now: Cycles) -> u16 {
        let t = &self.channels[n];
        if !t.free_running() {
            return t.counter;
        }
        let ticks = now.saturating_sub(t.latched_at) >> t.shift();
        (u64::from(t.counter) + ticks).min(0xFFFF) as u16
    }

    pub fn reload(&self, n: usize) -> u16 {
        self.channels[n].reload
    }

    /// Cycles between two overflows once the counter restarts from reload.
    pub fn period(&self, n: usize) -> Cycles {
        let t = &self.channels[n];
        (0x1_0000 - u64::from(t.reload)) << t.shift()
    }

    /// Register read for offsets 0x00-0x0F relative to 0x0400_0100.
    pub fn read(&self, offset: u32, now: Cycles) -> u16 {
        let n = (offset >> 2) as usize & 3;
        if offset & 2 == 0 {
            self.counter(n, now)
        } else {
            self.channels[n].control
        }
    }

    /// Register write for offsets 0x00-0x0F relative to 0x0400_0100.
    pub fn write(&mut self, offset: u32, val: u16, scheduler: &mut Scheduler<Event>) {
        let n = (offset >> 2) as usize & 3;
        if offset & 2 == 0 {
            // Takes effect at the next start or overflow.
            self.channels[n].reload = val;
        } else {
            self.write_control(n, val, scheduler);
        }
    }

    fn write_control(&mut self, n: usize, val: u16, scheduler: &mut Scheduler<Event>) {
        let now = scheduler.now();
        self.latch(n, now);

        let t = &mut self.channels[n];
        let was_enabled = t.enabled();
        let was_running = t.free_running();

        // Timer 0 has nothing to count up from.
        let writable = if n == 0 { 0x00C3 } else { 0x00C7 };
        t.control = val & writable;

        if !was_enabled && t.enabled() {
            t.counter = t.reload;
            t.latched_at = now;
        } else if !was_running && t.free_running() {
            t.latched_at = now;
        }

        scheduler.cancel(Event::Timer(n as u8));
        if t.free_running() {
            let wait = self.cycles_to_overflow(n, now);
            scheduler.add(Event::Timer(n as u8), wait);
        }
    }

    /// Fold elapsed prescaler ticks into the stored counter.
    fn latch(&mut self, n: usize, now: Cycles) {
        let t = &mut self.channels[n];
        if !t.free_running() {
            return;
        }
        let shift = t.shift();
        let ticks = now.saturating_sub(t.latched_at) >> shift;
        t.counter = (u64::from(t.counter) + ticks).min(0xFFFF) as u16;
        t.latched_at += ticks << shift;
    }

    fn cycles_to_overflow(&self, n: usize, now: Cycles) -> Cycles {
        let t = &self.channels[n];
        let full = (0x1_0000 - u64::from(t.counter)) << t.shift();
        full.saturating_sub(now.saturating_sub(t.latched_at))
    }

    /// Restart timer `n` from its reload value at cycle `at`. Returns whether
    /// the overflow requests an interrupt.
    pub fn overflow(&mut self, n: usize, at: Cycles) -> bool {
        let t = &mut self.channels[n];
        t.counter = t.reload;
        t.latched_at = at;
        t.control & CNT_IRQ != 0
    }

    /// Feed one overflow of timer `n - 1` into timer `n`. Returns `true` when
    /// timer `n` wraps and must overflow in turn.
    pub fn count_up(&mut self, n: usize) -> bool {
        let t = &mut self.channels[n];
        if !t.enabled() || !t.count_up() {
            return false;
        }
        if t.counter == 0xFFFF {
            return true;
        }
        t.counter += 1;
        false
    }
}
