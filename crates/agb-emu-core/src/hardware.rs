use log::trace;

use crate::audio::Audio;
use crate::config::CoreConfig;
use crate::dma::Dma;
use crate::event::Event;
use crate::irq::{Interrupt, Irq};
use crate::keypad::Keypad;
use crate::memory::{EWRAM_SIZE, GAMEPAK_MAX, IWRAM_SIZE, Memory, read_le, write_le};
use crate::scheduler::{Cycles, EventDevice, Scheduler};
use crate::serial::Serial;
use crate::timer::Timers;
use crate::video::{OAM_SIZE, PRAM_SIZE, Video};

/// Every hardware unit of one machine, plus the memory map that ties them
/// together.
///
/// `Hardware` is the dispatch table behind the scheduler: each [`Event`]
/// variant is routed to the unit that owns it.
pub struct Hardware {
    pub irq: Irq,
    pub timers: Timers,
    pub dma: Dma,
    pub video: Video,
    pub audio: Audio,
    pub serial: Serial,
    pub keypad: Keypad,
    pub memory: Memory,
    waitcnt: u16,
    postflg: u8,
}

impl Hardware {
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            irq: Irq::new(),
            timers: Timers::new(),
            dma: Dma::new(),
            video: Video::new(),
            audio: Audio::new(config.audio_sample_rate),
            serial: Serial::new(),
            keypad: Keypad::new(),
            memory: Memory::new(),
            waitcnt: 0,
            postflg: 0,
        }
    }

    /// Register the events that run for the whole life of the machine.
    pub fn power_on(&self, scheduler: &mut Scheduler<Event>) {
        scheduler.add(Event::Video, Video::first_wait());
        scheduler.add(Event::AudioSample, self.audio.sample_period());
    }

    pub fn read8(&self, addr: u32, now: Cycles) -> u8 {
        self.read(addr, 1, now) as u8
    }

    pub fn read16(&self, addr: u32, now: Cycles) -> u16 {
        self.read(addr, 2, now) as u16
    }

    pub fn read32(&self, addr: u32, now: Cycles) -> u32 {
        self.read(addr, 4, now)
    }

    pub fn write8(&mut self, addr: u32, val: u8, scheduler: &mut Scheduler<Event>) {
        self.write(addr, 1, u32::from(val), scheduler);
    }

    pub fn write16(&mut self, addr: u32, val: u16, scheduler: &mut Scheduler<Event>) {
        self.write(addr, 2, u32::from(val), scheduler);
    }

    pub fn write32(&mut self, addr: u32, val: u32, scheduler: &mut Scheduler<Event>) {
        self.write(addr, 4, val, scheduler);
    }

    fn read(&self, addr: u32, width: usize, now: Cycles) -> u32 {
        let addr = addr & !(width as u32 - 1);
        let offset = addr as usize;
        match addr >> 24 {
            0x02 => read_le(&self.memory.ewram, offset & (EWRAM_SIZE - 1), width),
            0x03 => read_le(&self.memory.iwram, offset & (IWRAM_SIZE - 1), width),
            0x04 => self.read_io(addr & 0x00FF_FFFF, width, now),
            0x05 => read_le(&self.video.pram, offset & (PRAM_SIZE - 1), width),
            0x06 => read_le(&self.video.vram, vram_offset(addr), width),
            0x07 => read_le(&self.video.oam, offset & (OAM_SIZE - 1), width),
            0x08..=0x0D => self
                .memory
                .gamepak
                .as_deref()
                .map(|rom| read_le(rom, offset & (GAMEPAK_MAX - 1), width))
                .unwrap_or(0),
            _ => 0,
        }
    }

    fn write(&mut self, addr: u32, width: usize, val: u32, scheduler: &mut Scheduler<Event>) {
        let addr = addr & !(width as u32 - 1);
        let offset = addr as usize;
        match addr >> 24 {
            0x02 => write_le(&mut self.memory.ewram, offset & (EWRAM_SIZE - 1), width, val),
            0x03 => write_le(&mut self.memory.iwram, offset & (IWRAM_SIZE - 1), width, val),
            0x04 => self.write_io(addr & 0x00FF_FFFF, width, val, scheduler),
            // Byte writes to palette RAM and VRAM land on both halves.
            0x05 if width == 1 => {
                let val = u32::from(val as u8) * 0x0101;
                write_le(&mut self.video.pram, offset & (PRAM_SIZE - 2), 2, val);
            }
            0x05 => write_le(&mut self.video.pram, offset & (PRAM_SIZE - 1), width, val),
            0x06 if width == 1 => {
                let val = u32::from(val as u8) * 0x0101;
                write_le(&mut self.video.vram, vram_offset(addr) & !1, 2, val);
            }
            0x06 => write_le(&mut self.video.vram, vram_offset(addr), width, val),
            0x07 if width == 1 => {}
            0x07 => write_le(&mut self.video.oam, offset & (OAM_SIZE - 1), width, val),
            _ => {}
        }
    }

    fn read_io(&self, offset: u32, width: usize, now: Cycles) -> u32 {
        match width {
            1 => {
                let half = self.io_read16(offset & !1, now);
                u32::from((half >> ((offset & 1) * 8)) as u8)
            }
            2 => u32::from(self.io_read16(offset, now)),
            _ => {
                let lo = u32::from(self.io_read16(offset, now));
                let hi = u32::from(self.io_read16(offset + 2, now));
                lo | (hi << 16)
            }
        }
    }

    fn write_io(&mut self, offset: u32, width: usize, val: u32, scheduler: &mut Scheduler<Event>) {
        match width {
            1 => self.io_write8(offset, val as u8, scheduler),
            2 => self.io_write16(offset, val as u16, scheduler),
            _ => {
                self.io_write16(offset, val as u16, scheduler);
                self.io_write16(offset + 2, (val >> 16) as u16, scheduler);
            }
        }
    }

    fn io_read16(&self, offset: u32, now: Cycles) -> u16 {
        match offset {
            0x000..=0x05F => self.video.read(offset),
            0x060..=0x0AF => self.audio.read(offset),
            0x0B0..=0x0DF => self.dma.read(offset - 0xB0),
            0x100..=0x10F => self.timers.read(offset - 0x100, now),
            0x120..=0x12F | 0x134 => self.serial.read(offset),
            0x130 => self.keypad.keyinput(),
            0x132 => self.keypad.keycnt(),
            0x200 => self.irq.ie,
            0x202 => self.irq.if_reg,
            0x204 => self.waitcnt,
            0x208 => u16::from(self.irq.ime),
            0x300 => u16::from(self.postflg),
            _ => 0,
        }
    }

    fn io_write16(&mut self, offset: u32, val: u16, scheduler: &mut Scheduler<Event>) {
        match offset {
            0x000..=0x05F => self.video.write(offset, val),
            0x060..=0x0AF => self.audio.write(offset, val),
            0x0B0..=0x0DF => self.dma.write(offset - 0xB0, val, scheduler),
            0x100..=0x10F => self.timers.write(offset - 0x100, val, scheduler),
            0x120..=0x12F | 0x134 => self.serial.write(offset, val, scheduler),
            0x132 => self.keypad.write_keycnt(val, &mut self.irq),
            0x200 => self.irq.write_ie(val),
            0x202 => self.irq.acknowledge(val),
            0x204 => self.waitcnt = val,
            0x208 => self.irq.write_ime(val),
            0x300 => {
                self.postflg = val as u8;
                self.write_haltcnt((val >> 8) as u8);
            }
            _ => {}
        }
    }

    fn io_write8(&mut self, offset: u32, val: u8, scheduler: &mut Scheduler<Event>) {
        match offset {
            0x202 | 0x203 => self.irq.acknowledge(u16::from(val) << ((offset & 1) * 8)),
            0x300 => self.postflg = val,
            0x301 => self.write_haltcnt(val),
            0x0A0..=0x0A7 => self.audio.write_fifo_byte(offset, val),
            _ => {
                let aligned = offset & !1;
                let shift = (offset & 1) * 8;
                let old = self.io_write_base(aligned, scheduler.now());
                let new = (old & !(0xFF << shift)) | (u16::from(val) << shift);
                self.io_write16(aligned, new, scheduler);
            }
        }
    }

    /// Current contents of a register as seen by a partial write. Differs
    /// from a read for write-only registers and for the timer counters.
    fn io_write_base(&self, offset: u32, now: Cycles) -> u16 {
        match offset {
            0x0B0..=0x0DF => self.dma.raw(offset - 0xB0),
            0x100..=0x10F if offset & 2 == 0 => {
                self.timers.reload(((offset - 0x100) >> 2) as usize)
            }
            _ => self.io_read16(offset, now),
        }
    }

    fn write_haltcnt(&mut self, val: u8) {
        // Stop mode is not modelled separately.
        if val & 0x80 != 0 {
            trace!("HALTCNT: stop requested, treating as halt");
        }
        self.irq.halt();
    }

    /// Overflow timer `n` at cycle `at` and let the overflow ripple into the
    /// sound FIFOs and any count-up timers above it.
    fn timer_overflow(&mut self, n: usize, at: Cycles, scheduler: &mut Scheduler<Event>) {
        let mut n = n;
        loop {
            if self.timers.overflow(n, at) {
                self.irq.raise(Interrupt::timer(n));
            }
            if n < 2 {
                let refill = self.audio.timer_overflow(n);
                for (fifo, wanted) in refill.into_iter().enumerate() {
                    if wanted {
                        self.dma.request_fifo(fifo, scheduler);
                    }
                }
            }
            if n == 3 || !self.timers.count_up(n + 1) {
                break;
            }
            n += 1;
        }
    }

    fn run_dma(&mut self, n: usize, scheduler: &mut Scheduler<Event>) {
        if !self.dma.enabled(n) {
            return;
        }

        let transfer = self.dma.begin(n);
        let width = if transfer.word { 4 } else { 2 };
        let (mut src, mut dst) = (transfer.src, transfer.dst);
        let now = scheduler.now();
        for _ in 0..transfer.units {
            let val = self.read(src, width, now);
            self.write(dst, width, val, scheduler);
            src = src.wrapping_add(transfer.src_step);
            dst = dst.wrapping_add(transfer.dst_step);
        }
        trace!(
            "DMA{n}: moved {} units from {:08X} to {:08X}",
            transfer.units, transfer.src, transfer.dst
        );

        if self.dma.finish(&transfer, src, dst) {
            self.irq.raise(Interrupt::dma(n));
        }
    }
}

impl EventDevice<Event> for Hardware {
    fn tick(&mut self, event: Event, scheduler: &mut Scheduler<Event>) -> Option<Cycles> {
        let late = scheduler.late();
        match event {
            Event::Video => {
                // Replay every phase change the step ran past.
                let mut late = late;
                loop {
                    let step = self.video.on_event(&mut self.irq);
                    if let Some(timing) = step.dma {
                        self.dma.trigger(timing, scheduler);
                    }
                    if late < step.wait {
                        return Some(step.wait - late);
                    }
                    late -= step.wait;
                }
            }
            Event::AudioSample => {
                let period = self.audio.sample_period();
                for _ in 0..=late / period {
                    self.audio.on_sample();
                }
                Some(period - late % period)
            }
            Event::Timer(n) => {
                let n = usize::from(n);
                let period = self.timers.period(n);
                let target = scheduler.now() - late;
                for k in 0..=late / period {
                    self.timer_overflow(n, target + k * period, scheduler);
                }
                Some(period - late % period)
            }
            Event::Dma(n) => {
                self.run_dma(usize::from(n), scheduler);
                None
            }
            Event::Serial => {
                self.serial.on_event(&mut self.irq);
                None
            }
        }
    }
}

/// VRAM is 96 KiB mirrored in 128 KiB steps, with the last 32 KiB repeating
/// the 32 KiB before it.
fn vram_offset(addr: u32) -> usize {
    let offset = (addr & 0x1_FFFF) as usize;
    if offset >= 0x1_8000 {
        offset - 0x8000
    } else {
        offset
    }
}
