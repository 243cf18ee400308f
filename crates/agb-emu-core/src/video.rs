use crate::dma::DmaTiming;
use crate::irq::{Interrupt, Irq};
use crate::scheduler::Cycles;

pub const SCREEN_WIDTH: usize = 240;
pub const SCREEN_HEIGHT: usize = 160;

pub const HDRAW_CYCLES: Cycles = 1006;
pub const HBLANK_CYCLES: Cycles = 226;
pub const LINE_CYCLES: Cycles = HDRAW_CYCLES + HBLANK_CYCLES;
pub const VISIBLE_LINES: u16 = 160;
pub const TOTAL_LINES: u16 = 228;
pub const FRAME_CYCLES: Cycles = LINE_CYCLES * TOTAL_LINES as Cycles;

pub const PRAM_SIZE: usize = 0x400;
pub const VRAM_SIZE: usize = 0x1_8000;
pub const OAM_SIZE: usize = 0x400;

const DISPCNT_FORCED_BLANK: u16 = 1 << 7;

const STAT_VBLANK: u16 = 1 << 0;
const STAT_HBLANK: u16 = 1 << 1;
const STAT_VCOUNT: u16 = 1 << 2;
const STAT_VBLANK_IRQ: u16 = 1 << 3;
const STAT_HBLANK_IRQ: u16 = 1 << 4;
const STAT_VCOUNT_IRQ: u16 = 1 << 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VideoPhase {
    HDraw,
    HBlank,
}

/// Result of one video event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoStep {
    /// Cycles until the next video event.
    pub wait: Cycles,
    /// DMA start condition raised by this event.
    pub dma: Option<DmaTiming>,
}

/// Display timing and the memories the display reads from.
///
/// The unit keeps one event pending at all times. It alternates between the
/// end of HDraw and the end of HBlank. Pixel composition is not modelled, so
/// a published frame is the backdrop colour.
pub struct Video {
    pub dispcnt: u16,
    dispstat: u16,
    vcount: u16,
    phase: VideoPhase,
    /// Background, window and blend registers (0x008-0x05F), stored as
    /// written.
    regs: [u16; 0x2C],
    pub pram: Box<[u8]>,
    pub vram: Box<[u8]>,
    pub oam: Box<[u8]>,
    framebuffer: Box<[u32]>,
    frame_ready: bool,
    frame_count: u64,
}

impl Video {
    pub fn new() -> Self {
        Self {
            dispcnt: 0x0080,
            dispstat: 0,
            vcount: 0,
            phase: VideoPhase::HDraw,
            regs: [0; 0x2C],
            pram: vec![0; PRAM_SIZE].into_boxed_slice(),
            vram: vec![0; VRAM_SIZE].into_boxed_slice(),
            oam: vec![0; OAM_SIZE].into_boxed_slice(),
            framebuffer: vec![0xFF_FFFF; SCREEN_WIDTH * SCREEN_HEIGHT].into_boxed_slice(),
            frame_ready: false,
            frame_count: 0,
        }
    }

    /// Delay of the first event after power-on.
    pub const fn first_wait() -> Cycles {
        HDRAW_CYCLES
    }

    pub fn vcount(&self) -> u16 {
        self.vcount
    }

    pub fn phase(&self) -> VideoPhase {
        self.phase
    }

    /// Register read for offsets 0x00-0x5F relative to 0x0400_0000.
    pub fn read(&self, offset: u32) -> u16 {
        match offset {
            0x00 => self.dispcnt,
            0x04 => self.dispstat,
            0x06 => self.vcount,
            0x08..=0x5F => self.regs[((offset - 0x08) >> 1) as usize],
            _ => 0,
        }
    }

    /// Register write for offsets 0x00-0x5F relative to 0x0400_0000.
    pub fn write(&mut self, offset: u32, val: u16) {
        match offset {
            0x00 => self.dispcnt = val,
            0x04 => self.dispstat = (self.dispstat & 0x0007) | (val & 0xFF38),
            0x08..=0x5F => self.regs[((offset - 0x08) >> 1) as usize] = val,
            _ => {}
        }
    }

    /// Handle `Event::Video`.
    pub fn on_event(&mut self, irq: &mut Irq) -> VideoStep {
        match self.phase {
            VideoPhase::HDraw => {
                self.phase = VideoPhase::HBlank;
                self.dispstat |= STAT_HBLANK;
                if self.dispstat & STAT_HBLANK_IRQ != 0 {
                    irq.raise(Interrupt::HBlank);
                }
                let dma = (self.vcount < VISIBLE_LINES).then_some(DmaTiming::HBlank);
                VideoStep {
                    wait: HBLANK_CYCLES,
                    dma,
                }
            }
            VideoPhase::HBlank => {
                self.phase = VideoPhase::HDraw;
                self.dispstat &= !STAT_HBLANK;
                let dma = self.next_line(irq);
                VideoStep {
                    wait: HDRAW_CYCLES,
                    dma,
                }
            }
        }
    }

    fn next_line(&mut self, irq: &mut Irq) -> Option<DmaTiming> {
        self.vcount = (self.vcount + 1) % TOTAL_LINES;

        let target = self.dispstat >> 8;
        if self.vcount == target {
            self.dispstat |= STAT_VCOUNT;
            if self.dispstat & STAT_VCOUNT_IRQ != 0 {
                irq.raise(Interrupt::VCount);
            }
        } else {
            self.dispstat &= !STAT_VCOUNT;
        }

        match self.vcount {
            VISIBLE_LINES => {
                self.dispstat |= STAT_VBLANK;
                if self.dispstat & STAT_VBLANK_IRQ != 0 {
                    irq.raise(Interrupt::VBlank);
                }
                self.publish_frame();
                Some(DmaTiming::VBlank)
            }
            // The flag drops one line early.
            227 => {
                self.dispstat &= !STAT_VBLANK;
                None
            }
            _ => None,
        }
    }

    fn publish_frame(&mut self) {
        let colour = if self.dispcnt & DISPCNT_FORCED_BLANK != 0 {
            0xFF_FFFF
        } else {
            bgr555_to_rgb888(u16::from_le_bytes([self.pram[0], self.pram[1]]))
        };
        self.framebuffer.fill(colour);
        self.frame_ready = true;
        self.frame_count += 1;
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// 0x00RRGGBB pixels, row-major.
    pub fn framebuffer(&self) -> &[u32] {
        &self.framebuffer
    }

    /// Frames published since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Default for Video {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a 15-bit BGR colour to 0x00RRGGBB.
pub fn bgr555_to_rgb888(c: u16) -> u32 {
    let expand = |v: u16| {
        let v = u32::from(v & 0x1F);
        (v << 3) | (v >> 2)
    };
    (expand(c) << 16) | (expand(c >> 5) << 8) | expand(c >> 10)
}
