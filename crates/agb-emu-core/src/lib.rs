//! Event-scheduled Game Boy Advance hardware core.
//!
//! The core has no notion of wall-clock time. A clock driver ([`Core`])
//! asks the [`scheduler`] how far away the next hardware event is, lets the
//! CPU run up to that point, then advances the scheduler by the cycles the
//! CPU actually spent. Every hardware unit reacts only when one of its own
//! events comes due.

/// Master clock of the machine in Hz (2^24).
pub const CLOCK_HZ: u64 = 16_777_216;

/// Direct-sound FIFOs and the output sample clock.
pub mod audio;

/// Construction-time settings for a machine.
pub mod config;

/// Processor interface and the bus it sees.
pub mod cpu;

/// The four DMA channels.
pub mod dma;

/// Scheduler keys for every hardware unit.
pub mod event;

/// Memory map and event dispatch for one machine.
pub mod hardware;

/// Interrupt controller.
pub mod irq;

/// KEYINPUT/KEYCNT.
pub mod keypad;

/// Clock driver and the facade frontends talk to.
pub mod machine;

/// Work RAM and game pak storage.
pub mod memory;

/// Cycle-driven event scheduler.
pub mod scheduler;

/// Serial port and link cable plumbing.
pub mod serial;

/// The four hardware timers.
pub mod timer;

/// Display timing, video memory and frame output.
pub mod video;

pub use crate::config::CoreConfig;
pub use crate::event::Event;
pub use crate::machine::Core;
pub use crate::scheduler::{Cycles, EventDevice, Scheduler};
