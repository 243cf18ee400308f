use log::debug;

use crate::event::Event;
use crate::irq::{Interrupt, Irq};
use crate::scheduler::{Cycles, Scheduler};

pub trait LinkPort: Send {
    /// Exchange a byte with the link partner and return the partner's byte.
    /// Implementations may perform the exchange immediately.
    fn transfer(&mut self, byte: u8) -> u8;
}

/// A stub link port used when no cable is attached.
/// By default it emulates a "line dead" scenario where incoming bits are all 1,
/// so any transfer receives 0xFF. When `loopback` is true the sent byte is
/// echoed back instead.
#[derive(Default)]
pub struct NullLinkPort {
    loopback: bool,
}

impl NullLinkPort {
    pub fn new(loopback: bool) -> Self {
        Self { loopback }
    }
}

impl LinkPort for NullLinkPort {
    fn transfer(&mut self, byte: u8) -> u8 {
        if self.loopback { byte } else { 0xFF }
    }
}

const CNT_INTERNAL_CLOCK: u16 = 1 << 0;
const CNT_2MHZ: u16 = 1 << 1;
const CNT_START: u16 = 1 << 7;
const CNT_32BIT: u16 = 1 << 12;
const CNT_IRQ: u16 = 1 << 14;

/// Cycles per shifted bit for the 256 KHz and 2 MHz internal clocks.
pub const fn cycles_per_bit(fast: bool) -> Cycles {
    if fast { 8 } else { 64 }
}

/// Serial port in normal (SPI-like) mode.
///
/// Starting a transfer with the internal clock schedules `Event::Serial` for
/// the moment the last bit has been shifted. The data exchange with the link
/// partner and the interrupt happen when that event fires.
pub struct Serial {
    siocnt: u16,
    data32: u32,
    data8: u16,
    rcnt: u16,
    port: Box<dyn LinkPort + Send>,
    pub(crate) out_buf: Vec<u8>,
}

impl Serial {
    pub fn new() -> Self {
        Self {
            siocnt: 0,
            data32: 0,
            data8: 0,
            rcnt: 0,
            port: Box::new(NullLinkPort::default()),
            out_buf: Vec::new(),
        }
    }

    pub fn connect(&mut self, port: Box<dyn LinkPort + Send>) {
        self.port = port;
    }

    /// Detach the current link partner, leaving the port unconnected.
    pub fn take_port(&mut self) -> Box<dyn LinkPort + Send> {
        std::mem::replace(&mut self.port, Box::new(NullLinkPort::default()))
    }

    /// Whether a transfer has been started and has not completed.
    pub fn busy(&self) -> bool {
        self.siocnt & CNT_START != 0
    }

    /// Length of a transfer with the current SIOCNT settings.
    pub fn transfer_cycles(&self) -> Cycles {
        let bits = if self.siocnt & CNT_32BIT != 0 { 32 } else { 8 };
        bits * cycles_per_bit(self.siocnt & CNT_2MHZ != 0)
    }

    /// Register read for offsets 0x120-0x135 relative to 0x0400_0000.
    pub fn read(&self, offset: u32) -> u16 {
        match offset {
            0x120 => self.data32 as u16,
            0x122 => (self.data32 >> 16) as u16,
            0x128 => self.siocnt,
            0x12A => self.data8,
            0x134 => self.rcnt,
            _ => 0,
        }
    }

    /// Register write for offsets 0x120-0x135 relative to 0x0400_0000.
    pub fn write(&mut self, offset: u32, val: u16, scheduler: &mut Scheduler<Event>) {
        match offset {
            0x120 => self.data32 = (self.data32 & 0xFFFF_0000) | u32::from(val),
            0x122 => self.data32 = (self.data32 & 0x0000_FFFF) | (u32::from(val) << 16),
            0x128 => self.write_control(val, scheduler),
            0x12A => self.data8 = val & 0x00FF,
            0x134 => self.rcnt = val,
            _ => {}
        }
    }

    fn write_control(&mut self, val: u16, scheduler: &mut Scheduler<Event>) {
        let was_busy = self.busy();
        // Bit 2 reflects the SI line and is read-only.
        self.siocnt = (self.siocnt & 0x0004) | (val & 0x7F8B);

        if was_busy && !self.busy() {
            scheduler.cancel(Event::Serial);
            return;
        }
        if was_busy || !self.busy() {
            return;
        }

        if self.siocnt & CNT_INTERNAL_CLOCK != 0 {
            let cycles = self.transfer_cycles();
            scheduler.add(Event::Serial, cycles);
        } else {
            // With an external clock the partner drives the shift register.
            // Without one the transfer never completes, as on hardware.
            debug!("SIO: waiting for external clock");
        }
    }

    /// Handle `Event::Serial`: exchange the data and finish the transfer.
    pub fn on_event(&mut self, irq: &mut Irq) {
        if self.siocnt & CNT_32BIT != 0 {
            let mut incoming = [0u8; 4];
            for (i, byte) in self.data32.to_le_bytes().into_iter().enumerate() {
                incoming[i] = self.port.transfer(byte);
                self.out_buf.push(byte);
            }
            self.data32 = u32::from_le_bytes(incoming);
        } else {
            let byte = self.data8 as u8;
            self.data8 = u16::from(self.port.transfer(byte));
            self.out_buf.push(byte);
        }

        self.siocnt &= !CNT_START;
        if self.siocnt & CNT_IRQ != 0 {
            irq.raise(Interrupt::Serial);
        }
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.out_buf)
    }
}

impl Default for Serial {
    fn default() -> Self {
        Self::new()
    }
}
