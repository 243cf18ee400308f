use crate::event::Event;
use crate::hardware::Hardware;
use crate::scheduler::{Cycles, Scheduler};

/// The processor as seen by the clock driver.
///
/// Instruction semantics live outside this crate. The core only needs to
/// know how many cycles the processor spent.
pub trait Cpu: Send {
    /// Run for at most `budget` cycles and return how many were spent.
    ///
    /// The result must not exceed `budget` and must be non-zero when `budget`
    /// is. Before touching the bus the CPU reports the cycles it has spent so
    /// far with [`Bus::advance`], so every access happens at its real cycle.
    /// Returning early is expected after anything that can move the next
    /// event closer, such as an I/O write or a write to HALTCNT, because
    /// `budget` was computed from the schedule at the start of the call.
    fn run(&mut self, budget: Cycles, bus: &mut Bus<'_>) -> Cycles;

    fn reset(&mut self) {}
}

/// Stand-in processor that spends every cycle it is offered.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleCpu;

impl Cpu for IdleCpu {
    fn run(&mut self, budget: Cycles, _bus: &mut Bus<'_>) -> Cycles {
        budget
    }
}

/// The processor's view of the machine for the duration of one batch.
///
/// The bus tracks how far into the batch the CPU has advanced. Reads see the
/// machine at that cycle, and writes first bring the scheduler up to it so
/// their side effects are anchored where they happened.
pub struct Bus<'a> {
    hw: &'a mut Hardware,
    scheduler: &'a mut Scheduler<Event>,
    budget: Cycles,
    /// Cycles the CPU has reported since the start of the batch.
    elapsed: Cycles,
    /// Part of `elapsed` already handed to the scheduler.
    synced: Cycles,
}

impl<'a> Bus<'a> {
    pub fn new(hw: &'a mut Hardware, scheduler: &'a mut Scheduler<Event>, budget: Cycles) -> Self {
        Self {
            hw,
            scheduler,
            budget,
            elapsed: 0,
            synced: 0,
        }
    }

    /// Record that the CPU has spent `cycles` more cycles.
    ///
    /// # Panics
    ///
    /// Panics if the total passes the batch budget.
    pub fn advance(&mut self, cycles: Cycles) {
        self.elapsed += cycles;
        assert!(
            self.elapsed <= self.budget,
            "CPU advanced {} cycles with a budget of {}",
            self.elapsed,
            self.budget
        );
    }

    /// Cycles reported through [`advance`](Self::advance) in this batch.
    pub fn elapsed(&self) -> Cycles {
        self.elapsed
    }

    /// Cycles of `elapsed` the scheduler has already been stepped through.
    pub fn synced(&self) -> Cycles {
        self.synced
    }

    /// Current cycle from the CPU's point of view.
    pub fn now(&self) -> Cycles {
        self.scheduler.now() + self.lag()
    }

    /// Cycles from the CPU's current position to the next event, including
    /// events added by writes made during the batch.
    pub fn horizon(&self) -> Option<Cycles> {
        self.scheduler
            .horizon()
            .map(|h| h.saturating_sub(self.lag()))
    }

    fn lag(&self) -> Cycles {
        self.elapsed - self.synced
    }

    /// Step the scheduler up to the CPU's position.
    fn sync(&mut self) {
        let lag = self.lag();
        if lag > 0 {
            self.scheduler.step(lag, &mut *self.hw);
            self.synced = self.elapsed;
        }
    }

    pub fn read8(&self, addr: u32) -> u8 {
        self.hw.read8(addr, self.now())
    }

    pub fn read16(&self, addr: u32) -> u16 {
        self.hw.read16(addr, self.now())
    }

    pub fn read32(&self, addr: u32) -> u32 {
        self.hw.read32(addr, self.now())
    }

    pub fn write8(&mut self, addr: u32, val: u8) {
        self.sync();
        self.hw.write8(addr, val, self.scheduler);
    }

    pub fn write16(&mut self, addr: u32, val: u16) {
        self.sync();
        self.hw.write16(addr, val, self.scheduler);
    }

    pub fn write32(&mut self, addr: u32, val: u32) {
        self.sync();
        self.hw.write32(addr, val, self.scheduler);
    }

    /// An enabled interrupt is requested and IME is set.
    pub fn irq_pending(&mut self) -> bool {
        self.sync();
        self.hw.irq.pending()
    }

    /// Acknowledge requests the same way a write to IF does.
    pub fn acknowledge(&mut self, mask: u16) {
        self.sync();
        self.hw.irq.acknowledge(mask);
    }

    pub fn halt(&mut self) {
        self.sync();
        self.hw.irq.halt();
    }

    pub fn halted(&self) -> bool {
        self.hw.irq.halted()
    }
}
