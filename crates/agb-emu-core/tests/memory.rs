mod common;

use agb_emu_core::memory::GAMEPAK_MAX;
use common::{EWRAM, IWRAM, new_core, read16, read32, write8, write16, write32};

#[test]
fn little_endian_access_widths() {
    let mut core = new_core();
    write32(&mut core, EWRAM, 0x1122_3344);
    assert_eq!(read16(&core, EWRAM), 0x3344);
    assert_eq!(read16(&core, EWRAM + 2), 0x1122);
    assert_eq!(core.hw.read8(EWRAM + 3, 0), 0x11);

    write8(&mut core, EWRAM + 1, 0xAA);
    assert_eq!(read32(&core, EWRAM), 0x1122_AA44);
}

#[test]
fn unaligned_access_is_forced_aligned() {
    let mut core = new_core();
    write32(&mut core, IWRAM + 3, 0xCAFE_BABE);
    assert_eq!(read32(&core, IWRAM), 0xCAFE_BABE);
    assert_eq!(read16(&core, IWRAM + 1), 0xBABE);
}

#[test]
fn work_ram_mirrors() {
    let mut core = new_core();
    write16(&mut core, EWRAM + 0x4_0000, 0x1234);
    assert_eq!(read16(&core, EWRAM), 0x1234);

    write16(&mut core, IWRAM + 0x8000, 0x5678);
    assert_eq!(read16(&core, IWRAM), 0x5678);
    assert_eq!(read16(&core, IWRAM + 0x00FF_8000), 0x5678);
}

#[test]
fn bios_and_unmapped_read_zero() {
    let mut core = new_core();
    write32(&mut core, 0x0000_0000, 0xFFFF_FFFF);
    assert_eq!(read32(&core, 0x0000_0000), 0);
    assert_eq!(read32(&core, 0x1000_0000), 0);
    assert_eq!(read32(&core, 0x0800_0000), 0);
}

#[test]
fn gamepak_is_read_only_and_mirrored_across_wait_states() {
    let mut core = new_core();
    core.load_gamepak(vec![0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);

    assert_eq!(read32(&core, 0x0800_0000), 0x0403_0201);
    assert_eq!(read32(&core, 0x0A00_0000), 0x0403_0201);
    assert_eq!(read16(&core, 0x0C00_0004), 0x0605);
    // Past the end of the image.
    assert_eq!(read32(&core, 0x0800_0008), 0);

    write32(&mut core, 0x0800_0000, 0);
    assert_eq!(read32(&core, 0x0800_0000), 0x0403_0201);
}

#[test]
fn oversized_gamepak_is_truncated() {
    let mut core = new_core();
    core.load_gamepak(vec![0xEE; GAMEPAK_MAX + 16]);
    assert_eq!(
        core.hw.memory.gamepak.as_deref().map(<[u8]>::len),
        Some(GAMEPAK_MAX)
    );
}

#[test]
fn byte_writes_to_video_memory() {
    let mut core = new_core();

    write8(&mut core, 0x0500_0001, 0x12);
    assert_eq!(read16(&core, 0x0500_0000), 0x1212);

    write8(&mut core, 0x0600_0004, 0x34);
    assert_eq!(read16(&core, 0x0600_0004), 0x3434);

    write16(&mut core, 0x0700_0000, 0xABCD);
    write8(&mut core, 0x0700_0000, 0x00);
    assert_eq!(read16(&core, 0x0700_0000), 0xABCD);
}

#[test]
fn vram_upper_mirror() {
    let mut core = new_core();
    write16(&mut core, 0x0601_0000, 0x4242);
    assert_eq!(read16(&core, 0x0601_8000), 0x4242);
    assert_eq!(read16(&core, 0x0603_0000), 0x4242);
}
