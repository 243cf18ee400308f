mod common;

use agb_emu_core::Event;
use agb_emu_core::dma::DMA_START_DELAY;
use agb_emu_core::video::{HDRAW_CYCLES, LINE_CYCLES, VISIBLE_LINES};
use common::{EWRAM, IO, IWRAM, new_core, read16, read32, setup_dma, write16, write32};

const CNT_ENABLE: u16 = 0x8000;
const CNT_IRQ: u16 = 0x4000;
const CNT_REPEAT: u16 = 0x0200;
const CNT_WORD: u16 = 0x0400;
const TIMING_VBLANK: u16 = 0x1000;
const TIMING_HBLANK: u16 = 0x2000;
const TIMING_SPECIAL: u16 = 0x3000;
const DST_FIXED: u16 = 0x0040;

fn dma_cnt_h(n: u32) -> u32 {
    IO + 0xB0 + 12 * n + 10
}

#[test]
fn immediate_transfer_starts_after_delay() {
    let mut core = new_core();
    for i in 0..4 {
        write16(&mut core, EWRAM + 2 * i, 0x1000 + i as u16);
    }
    setup_dma(&mut core, 3, EWRAM, IWRAM, 4, CNT_ENABLE);

    assert_eq!(
        core.scheduler.wait_cycles(Event::Dma(3)),
        Some(DMA_START_DELAY)
    );
    core.run_cycles(DMA_START_DELAY - 1);
    assert_eq!(read16(&core, IWRAM), 0);

    core.run_cycles(1);
    for i in 0..4 {
        assert_eq!(read16(&core, IWRAM + 2 * i), 0x1000 + i as u16);
    }
    // One-shot: enable drops and nothing re-arms.
    assert_eq!(read16(&core, dma_cnt_h(3)) & CNT_ENABLE, 0);
    assert!(!core.scheduler.is_pending(Event::Dma(3)));
}

#[test]
fn word_transfer_with_irq() {
    let mut core = new_core();
    write32(&mut core, EWRAM, 0xDEAD_BEEF);
    write32(&mut core, EWRAM + 4, 0x0123_4567);
    setup_dma(&mut core, 0, EWRAM, IWRAM + 0x100, 2, CNT_ENABLE | CNT_IRQ | CNT_WORD);

    core.run_cycles(DMA_START_DELAY);
    assert_eq!(read32(&core, IWRAM + 0x100), 0xDEAD_BEEF);
    assert_eq!(read32(&core, IWRAM + 0x104), 0x0123_4567);
    assert_ne!(core.hw.irq.if_reg & (1 << 8), 0);
}

#[test]
fn zero_count_means_maximum() {
    let mut core = new_core();
    write16(&mut core, EWRAM, 0x1234);
    write16(&mut core, EWRAM + 0x7FFE, 0xBEEF);
    write16(&mut core, EWRAM + 0x8000, 0xCAFE);
    setup_dma(&mut core, 0, EWRAM, IWRAM, 0, CNT_ENABLE);

    core.run_cycles(DMA_START_DELAY);
    assert_eq!(read16(&core, IWRAM + 0x7FFE), 0xBEEF);
    // 0x4000 halfwords exactly fill IWRAM. One more would have landed on the
    // mirror of its first halfword.
    assert_eq!(read16(&core, IWRAM), 0x1234);
}

#[test]
fn decrementing_source() {
    let mut core = new_core();
    write16(&mut core, EWRAM, 0x0001);
    write16(&mut core, EWRAM + 2, 0x0002);
    // Source control 1 (decrement) lives in bits 7-8.
    setup_dma(&mut core, 3, EWRAM + 2, IWRAM, 2, CNT_ENABLE | 0x0080);

    core.run_cycles(DMA_START_DELAY);
    assert_eq!(read16(&core, IWRAM), 0x0002);
    assert_eq!(read16(&core, IWRAM + 2), 0x0001);
}

#[test]
fn disabling_before_start_cancels() {
    let mut core = new_core();
    write16(&mut core, EWRAM, 0x5555);
    setup_dma(&mut core, 3, EWRAM, IWRAM, 1, CNT_ENABLE);
    write16(&mut core, dma_cnt_h(3), 0);

    assert!(!core.scheduler.is_pending(Event::Dma(3)));
    core.run_cycles(100);
    assert_eq!(read16(&core, IWRAM), 0);
}

#[test]
fn hblank_repeat_runs_every_visible_line() {
    let mut core = new_core();
    for i in 0..4 {
        write16(&mut core, EWRAM + 2 * i, 0xA0 + i as u16);
    }
    setup_dma(
        &mut core,
        0,
        EWRAM,
        IWRAM,
        1,
        CNT_ENABLE | CNT_REPEAT | TIMING_HBLANK,
    );
    assert!(!core.scheduler.is_pending(Event::Dma(0)));

    core.run_cycles(HDRAW_CYCLES + DMA_START_DELAY);
    assert_eq!(read16(&core, IWRAM), 0xA0);
    assert_eq!(read16(&core, IWRAM + 2), 0);
    assert_ne!(read16(&core, dma_cnt_h(0)) & CNT_ENABLE, 0);

    core.run_cycles(LINE_CYCLES);
    assert_eq!(read16(&core, IWRAM + 2), 0xA1);
}

#[test]
fn hblank_trigger_stops_during_vblank() {
    let mut core = new_core();
    setup_dma(
        &mut core,
        0,
        EWRAM,
        IWRAM,
        1,
        CNT_ENABLE | CNT_REPEAT | TIMING_HBLANK | DST_FIXED,
    );

    // Run to the end of HDraw on the first VBlank line.
    core.run_cycles(LINE_CYCLES * u64::from(VISIBLE_LINES) + HDRAW_CYCLES);
    assert!(!core.scheduler.is_pending(Event::Dma(0)));
}

#[test]
fn vblank_transfer_fires_at_line_160() {
    let mut core = new_core();
    write16(&mut core, EWRAM, 0x7777);
    setup_dma(&mut core, 3, EWRAM, IWRAM, 1, CNT_ENABLE | TIMING_VBLANK);

    let vblank = LINE_CYCLES * u64::from(VISIBLE_LINES);
    core.run_cycles(vblank);
    assert_eq!(read16(&core, IWRAM), 0);
    assert!(core.scheduler.is_pending(Event::Dma(3)));

    core.run_cycles(DMA_START_DELAY);
    assert_eq!(read16(&core, IWRAM), 0x7777);
}

#[test]
fn simultaneous_triggers_fire_in_channel_order() {
    let mut core = new_core();
    write16(&mut core, EWRAM, 0x1111);
    write16(&mut core, EWRAM + 2, 0x2222);
    let target = IWRAM + 0x40;
    // Program channel 1 first so registration order alone would be wrong.
    setup_dma(&mut core, 1, EWRAM + 2, target, 1, CNT_ENABLE | TIMING_HBLANK);
    setup_dma(&mut core, 0, EWRAM, target, 1, CNT_ENABLE | TIMING_HBLANK);

    core.run_cycles(HDRAW_CYCLES + DMA_START_DELAY);
    // Channel 0 ran first, channel 1 overwrote it.
    assert_eq!(read16(&core, target), 0x2222);
    assert_eq!(read16(&core, dma_cnt_h(0)) & CNT_ENABLE, 0);
    assert_eq!(read16(&core, dma_cnt_h(1)) & CNT_ENABLE, 0);
}

#[test]
fn repeat_with_reload_restores_destination() {
    let mut core = new_core();
    for i in 0..4 {
        write16(&mut core, EWRAM + 2 * i, 0xB0 + i as u16);
    }
    // Destination control 3: increment and reload.
    setup_dma(
        &mut core,
        0,
        EWRAM,
        IWRAM,
        2,
        CNT_ENABLE | CNT_REPEAT | TIMING_HBLANK | 0x0060,
    );

    core.run_cycles(HDRAW_CYCLES + DMA_START_DELAY);
    assert_eq!(read16(&core, IWRAM), 0xB0);
    assert_eq!(read16(&core, IWRAM + 2), 0xB1);

    core.run_cycles(LINE_CYCLES);
    assert_eq!(read16(&core, IWRAM), 0xB2);
    assert_eq!(read16(&core, IWRAM + 2), 0xB3);
    assert_eq!(read16(&core, IWRAM + 4), 0);
}

#[test]
fn sound_fifo_request_runs_special_dma() {
    let mut core = new_core();
    for i in 0..4 {
        write32(&mut core, EWRAM + 4 * i, 0x0403_0201);
    }
    // FIFO A on timer 0.
    write16(&mut core, IO + 0x82, 0x0304);
    write16(&mut core, IO + 0x84, 0x0080);
    setup_dma(
        &mut core,
        1,
        EWRAM,
        IO + 0xA0,
        4,
        CNT_ENABLE | CNT_REPEAT | CNT_WORD | TIMING_SPECIAL,
    );
    write16(&mut core, IO + 0x100, 0xFF00);
    write16(&mut core, IO + 0x102, 0x0080);

    core.run_cycles(256 + DMA_START_DELAY);
    assert_eq!(core.hw.audio.fifo_len(0), 16);
    assert_ne!(read16(&core, dma_cnt_h(1)) & CNT_ENABLE, 0);
}
