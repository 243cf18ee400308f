#![allow(dead_code)]

use agb_emu_core::{Core, CoreConfig};

pub const IO: u32 = 0x0400_0000;
pub const EWRAM: u32 = 0x0200_0000;
pub const IWRAM: u32 = 0x0300_0000;

pub fn new_core() -> Core {
    Core::new(CoreConfig::default())
}

pub fn write8(core: &mut Core, addr: u32, val: u8) {
    core.hw.write8(addr, val, &mut core.scheduler);
}

pub fn write16(core: &mut Core, addr: u32, val: u16) {
    core.hw.write16(addr, val, &mut core.scheduler);
}

pub fn write32(core: &mut Core, addr: u32, val: u32) {
    core.hw.write32(addr, val, &mut core.scheduler);
}

pub fn read16(core: &Core, addr: u32) -> u16 {
    core.hw.read16(addr, core.cycles())
}

pub fn read32(core: &Core, addr: u32) -> u32 {
    core.hw.read32(addr, core.cycles())
}

/// Program DMA channel `n` in one go, control last.
pub fn setup_dma(core: &mut Core, n: u32, src: u32, dst: u32, count: u16, control: u16) {
    let base = IO + 0xB0 + 12 * n;
    write32(core, base, src);
    write32(core, base + 4, dst);
    write16(core, base + 8, count);
    write16(core, base + 10, control);
}
