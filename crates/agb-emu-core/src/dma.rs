use log::debug;

use crate::event::Event;
use crate::scheduler::{Cycles, Scheduler};

/// Cycles between a trigger and the first unit being moved.
pub const DMA_START_DELAY: Cycles = 2;

const SRC_MASK: [u32; 4] = [0x07FF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF, 0x0FFF_FFFF];
const DST_MASK: [u32; 4] = [0x07FF_FFFF, 0x07FF_FFFF, 0x07FF_FFFF, 0x0FFF_FFFF];
const MAX_COUNT: [u32; 4] = [0x4000, 0x4000, 0x4000, 0x1_0000];

const CNT_REPEAT: u16 = 1 << 9;
const CNT_WORD: u16 = 1 << 10;
const CNT_IRQ: u16 = 1 << 14;
const CNT_ENABLE: u16 = 1 << 15;

/// Start condition selected by DMAxCNT_H bits 12-13.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DmaTiming {
    Immediate,
    VBlank,
    HBlank,
    /// Sound FIFO refill on channels 1 and 2. Unused on channel 0, video
    /// capture on channel 3.
    Special,
}

impl DmaTiming {
    fn from_control(control: u16) -> Self {
        match (control >> 12) & 3 {
            0 => Self::Immediate,
            1 => Self::VBlank,
            2 => Self::HBlank,
            _ => Self::Special,
        }
    }
}

/// Address step applied after each unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressControl {
    Increment,
    Decrement,
    Fixed,
    /// Increment, and restore the destination when a repeat starts.
    IncrementReload,
}

impl AddressControl {
    fn from_bits(bits: u16) -> Self {
        match bits & 3 {
            0 => Self::Increment,
            1 => Self::Decrement,
            2 => Self::Fixed,
            _ => Self::IncrementReload,
        }
    }

    fn step(self, unit: u32) -> u32 {
        match self {
            Self::Increment | Self::IncrementReload => unit,
            Self::Decrement => unit.wrapping_neg(),
            Self::Fixed => 0,
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Channel {
    sad: u32,
    dad: u32,
    count: u16,
    control: u16,
    // Internal registers latched when the channel is enabled.
    src: u32,
    dst: u32,
}

/// One transfer as decided when a channel fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transfer {
    pub channel: usize,
    pub src: u32,
    pub dst: u32,
    pub units: u32,
    pub word: bool,
    pub src_step: u32,
    pub dst_step: u32,
}

/// The four DMA channels.
///
/// A trigger does not move data directly. It schedules `Event::Dma(n)`
/// [`DMA_START_DELAY`] cycles ahead. Channels triggered together therefore
/// fire in channel order, which matches their hardware priority.
#[derive(Clone, Debug, Default)]
pub struct Dma {
    channels: [Channel; 4],
}

impl Dma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enabled(&self, n: usize) -> bool {
        self.channels[n].control & CNT_ENABLE != 0
    }

    pub fn timing(&self, n: usize) -> DmaTiming {
        DmaTiming::from_control(self.channels[n].control)
    }

    /// Register read for offsets 0x00-0x2F relative to 0x0400_00B0. Only the
    /// control halves are readable.
    pub fn read(&self, offset: u32) -> u16 {
        let n = (offset / 12) as usize;
        match offset % 12 {
            10 => self.channels[n].control,
            _ => 0,
        }
    }

    /// Last value written to a register, including the write-only ones.
    pub fn raw(&self, offset: u32) -> u16 {
        let ch = &self.channels[(offset / 12) as usize];
        match offset % 12 {
            0 => ch.sad as u16,
            2 => (ch.sad >> 16) as u16,
            4 => ch.dad as u16,
            6 => (ch.dad >> 16) as u16,
            8 => ch.count,
            _ => ch.control,
        }
    }

    /// Register write for offsets 0x00-0x2F relative to 0x0400_00B0.
    pub fn write(&mut self, offset: u32, val: u16, scheduler: &mut Scheduler<Event>) {
        let n = (offset / 12) as usize;
        let ch = &mut self.channels[n];
        match offset % 12 {
            0 => ch.sad = (ch.sad & 0xFFFF_0000) | u32::from(val),
            2 => ch.sad = (ch.sad & 0x0000_FFFF) | (u32::from(val) << 16),
            4 => ch.dad = (ch.dad & 0xFFFF_0000) | u32::from(val),
            6 => ch.dad = (ch.dad & 0x0000_FFFF) | (u32::from(val) << 16),
            8 => ch.count = val,
            10 => self.write_control(n, val, scheduler),
            _ => {}
        }
    }

    fn write_control(&mut self, n: usize, val: u16, scheduler: &mut Scheduler<Event>) {
        let ch = &mut self.channels[n];
        let was_enabled = ch.control & CNT_ENABLE != 0;
        ch.control = val & 0xF7E0;
        let enabled = ch.control & CNT_ENABLE != 0;

        if !was_enabled && enabled {
            ch.src = ch.sad & SRC_MASK[n];
            ch.dst = ch.dad & DST_MASK[n];
            debug!(
                "DMA{n} armed: {:08X} -> {:08X} x{} ({:?})",
                ch.src,
                ch.dst,
                ch.count,
                DmaTiming::from_control(ch.control)
            );
            if DmaTiming::from_control(ch.control) == DmaTiming::Immediate {
                scheduler.add(Event::Dma(n as u8), DMA_START_DELAY);
            }
        } else if was_enabled && !enabled {
            scheduler.cancel(Event::Dma(n as u8));
        }
    }

    /// Start every enabled channel waiting on `timing`.
    pub fn trigger(&mut self, timing: DmaTiming, scheduler: &mut Scheduler<Event>) {
        for n in 0..4 {
            if self.enabled(n) && self.timing(n) == timing {
                self.schedule(n, scheduler);
            }
        }
    }

    /// A sound FIFO asked for data. FIFO A is served by channel 1 and FIFO B
    /// by channel 2, if the channel is set up for FIFO transfers.
    pub fn request_fifo(&mut self, fifo: usize, scheduler: &mut Scheduler<Event>) {
        let n = fifo + 1;
        if self.enabled(n) && self.timing(n) == DmaTiming::Special {
            self.schedule(n, scheduler);
        }
    }

    fn schedule(&mut self, n: usize, scheduler: &mut Scheduler<Event>) {
        let event = Event::Dma(n as u8);
        // A second trigger before the first is served folds into it.
        if !scheduler.is_pending(event) {
            scheduler.add(event, DMA_START_DELAY);
        }
    }

    /// Describe the transfer channel `n` performs now.
    pub fn begin(&self, n: usize) -> Transfer {
        let ch = &self.channels[n];
        let fifo = (n == 1 || n == 2) && self.timing(n) == DmaTiming::Special;
        let word = fifo || ch.control & CNT_WORD != 0;
        let unit = if word { 4 } else { 2 };

        let count = u32::from(ch.count) & (MAX_COUNT[n] - 1);
        let units = if fifo {
            4
        } else if count == 0 {
            MAX_COUNT[n]
        } else {
            count
        };

        let dst_step = if fifo {
            0
        } else {
            AddressControl::from_bits(ch.control >> 5).step(unit)
        };
        // Source control 3 is prohibited and behaves like increment.
        let src_step = match (ch.control >> 7) & 3 {
            1 => unit.wrapping_neg(),
            2 => 0,
            _ => unit,
        };

        Transfer {
            channel: n,
            src: ch.src,
            dst: ch.dst,
            units,
            word,
            src_step,
            dst_step,
        }
    }

    /// Store the final addresses of a transfer and update the enable bit.
    /// Returns whether the channel requests an interrupt.
    pub fn finish(&mut self, transfer: &Transfer, src: u32, dst: u32) -> bool {
        let n = transfer.channel;
        let timing = self.timing(n);
        let ch = &mut self.channels[n];
        ch.src = src & SRC_MASK[n];
        ch.dst = dst & DST_MASK[n];

        let repeat = ch.control & CNT_REPEAT != 0 && timing != DmaTiming::Immediate;
        if repeat {
            if AddressControl::from_bits(ch.control >> 5) == AddressControl::IncrementReload {
                ch.dst = ch.dad & DST_MASK[n];
            }
        } else {
            ch.control &= !CNT_ENABLE;
        }

        ch.control & CNT_IRQ != 0
    }
}
