use std::collections::VecDeque;

use crate::CLOCK_HZ;
use crate::scheduler::Cycles;

const FIFO_CAPACITY: usize = 32;
/// A FIFO at or below this fill level asks its DMA channel for more data.
const FIFO_REFILL_LEVEL: usize = 16;

const SOUNDCNT_X_MASTER: u16 = 1 << 7;

/// One direct-sound channel: a queue of signed 8-bit samples plus the value
/// currently being played.
#[derive(Clone, Debug, Default)]
struct Fifo {
    samples: VecDeque<i8>,
    latch: i8,
}

impl Fifo {
    fn push(&mut self, sample: i8) {
        if self.samples.len() < FIFO_CAPACITY {
            self.samples.push_back(sample);
        }
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.latch = 0;
    }
}

/// Direct-sound FIFOs and the output sample clock.
///
/// The FIFOs advance on timer 0/1 overflows. A separate periodic event mixes
/// the two latched samples into the output buffer at the configured rate.
pub struct Audio {
    soundcnt_h: u16,
    soundcnt_x: u16,
    soundbias: u16,
    fifo: [Fifo; 2],
    sample_period: Cycles,
    samples: Vec<[i16; 2]>,
}

impl Audio {
    pub fn new(sample_rate: u32) -> Self {
        let rate = u64::from(sample_rate.max(1));
        Self {
            soundcnt_h: 0,
            soundcnt_x: 0,
            soundbias: 0x0200,
            fifo: [Fifo::default(), Fifo::default()],
            sample_period: (CLOCK_HZ / rate).max(1),
            samples: Vec::with_capacity(1024),
        }
    }

    /// Cycles between two output samples.
    pub fn sample_period(&self) -> Cycles {
        self.sample_period
    }

    /// Register read for offsets 0x80-0x8F relative to 0x0400_0000.
    pub fn read(&self, offset: u32) -> u16 {
        match offset {
            0x82 => self.soundcnt_h & 0x770F,
            0x84 => self.soundcnt_x & SOUNDCNT_X_MASTER,
            0x88 => self.soundbias,
            _ => 0,
        }
    }

    /// Register write for offsets 0x80-0xA7 relative to 0x0400_0000.
    pub fn write(&mut self, offset: u32, val: u16) {
        match offset {
            0x82 => {
                self.soundcnt_h = val;
                if val & (1 << 11) != 0 {
                    self.fifo[0].reset();
                }
                if val & (1 << 15) != 0 {
                    self.fifo[1].reset();
                }
            }
            0x84 => self.soundcnt_x = val,
            0x88 => self.soundbias = val & 0xC3FE,
            0xA0 | 0xA2 => self.push_pair(0, val),
            0xA4 | 0xA6 => self.push_pair(1, val),
            _ => {}
        }
    }

    /// Byte writes into FIFO A (0xA0-0xA3) or B (0xA4-0xA7).
    pub fn write_fifo_byte(&mut self, offset: u32, val: u8) {
        let fifo = usize::from(offset >= 0xA4);
        self.fifo[fifo].push(val as i8);
    }

    fn push_pair(&mut self, fifo: usize, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.fifo[fifo].push(lo as i8);
        self.fifo[fifo].push(hi as i8);
    }

    pub fn fifo_len(&self, fifo: usize) -> usize {
        self.fifo[fifo].samples.len()
    }

    /// Advance every FIFO clocked by `timer`. Returns, per FIFO, whether it
    /// wants a refill.
    pub fn timer_overflow(&mut self, timer: usize) -> [bool; 2] {
        let mut refill = [false; 2];
        for (n, fifo) in self.fifo.iter_mut().enumerate() {
            let select = (self.soundcnt_h >> (10 + 4 * n)) & 1;
            if usize::from(select) != timer {
                continue;
            }
            if let Some(sample) = fifo.samples.pop_front() {
                fifo.latch = sample;
            }
            refill[n] = fifo.samples.len() <= FIFO_REFILL_LEVEL;
        }
        refill
    }

    /// Handle `Event::AudioSample`.
    pub fn on_sample(&mut self) {
        let (mut left, mut right) = (0i32, 0i32);
        if self.soundcnt_x & SOUNDCNT_X_MASTER != 0 {
            for (n, fifo) in self.fifo.iter().enumerate() {
                let full_volume = self.soundcnt_h & (1 << (2 + n)) != 0;
                let level = i32::from(fifo.latch) << if full_volume { 2 } else { 1 };
                if self.soundcnt_h & (1 << (8 + 4 * n)) != 0 {
                    right += level;
                }
                if self.soundcnt_h & (1 << (9 + 4 * n)) != 0 {
                    left += level;
                }
            }
        }

        let bias = i32::from(self.soundbias & 0x3FE);
        let output = |v: i32| {
            let dac = (v + bias).clamp(0, 0x3FF) - 0x200;
            (dac << 6) as i16
        };
        self.samples.push([output(left), output(right)]);
    }

    /// Hand the samples produced so far to the caller.
    pub fn take_samples(&mut self) -> Vec<[i16; 2]> {
        std::mem::take(&mut self.samples)
    }
}
