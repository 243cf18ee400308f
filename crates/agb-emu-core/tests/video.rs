mod common;

use agb_emu_core::Event;
use agb_emu_core::video::{
    FRAME_CYCLES, HDRAW_CYCLES, LINE_CYCLES, SCREEN_HEIGHT, SCREEN_WIDTH, VISIBLE_LINES,
    VideoPhase, bgr555_to_rgb888,
};
use common::{IO, new_core, read16, write16};

const DISPCNT: u32 = IO;
const DISPSTAT: u32 = IO + 0x04;
const VCOUNT: u32 = IO + 0x06;

const IF_VBLANK: u16 = 1 << 0;
const IF_HBLANK: u16 = 1 << 1;
const IF_VCOUNT: u16 = 1 << 2;

fn vblank_start() -> u64 {
    LINE_CYCLES * u64::from(VISIBLE_LINES)
}

#[test]
fn frame_timing_constants() {
    assert_eq!(LINE_CYCLES, 1232);
    assert_eq!(FRAME_CYCLES, 280_896);
    let fps = agb_emu_core::CLOCK_HZ as f64 / FRAME_CYCLES as f64;
    assert!((fps - 59.7275).abs() < 0.001, "{fps}");
}

#[test]
fn video_event_is_always_pending() {
    let mut core = new_core();
    assert_eq!(core.scheduler.wait_cycles(Event::Video), Some(HDRAW_CYCLES));
    for _ in 0..10 {
        core.run_cycles(777);
        assert!(core.scheduler.is_pending(Event::Video));
    }
}

#[test]
fn hblank_flag_follows_line_phase() {
    let mut core = new_core();
    core.run_cycles(HDRAW_CYCLES - 1);
    assert_eq!(core.hw.video.phase(), VideoPhase::HDraw);
    assert_eq!(read16(&core, DISPSTAT) & 0x2, 0);

    core.run_cycles(1);
    assert_eq!(core.hw.video.phase(), VideoPhase::HBlank);
    assert_ne!(read16(&core, DISPSTAT) & 0x2, 0);

    core.run_cycles(LINE_CYCLES - HDRAW_CYCLES);
    assert_eq!(read16(&core, DISPSTAT) & 0x2, 0);
    assert_eq!(read16(&core, VCOUNT), 1);
}

#[test]
fn hblank_irq_when_enabled() {
    let mut core = new_core();
    write16(&mut core, DISPSTAT, 0x0010);
    core.run_cycles(HDRAW_CYCLES);
    assert_ne!(core.hw.irq.if_reg & IF_HBLANK, 0);
}

#[test]
fn vcount_advances_every_line_and_wraps() {
    let mut core = new_core();
    core.run_cycles(LINE_CYCLES * 5);
    assert_eq!(read16(&core, VCOUNT), 5);

    core.run_cycles(FRAME_CYCLES);
    assert_eq!(read16(&core, VCOUNT), 5);

    core.run_cycles(LINE_CYCLES * 223);
    assert_eq!(read16(&core, VCOUNT), 0);
}

#[test]
fn vblank_sets_flag_raises_irq_and_publishes_frame() {
    let mut core = new_core();
    write16(&mut core, DISPSTAT, 0x0008);

    core.run_cycles(vblank_start() - 1);
    assert_eq!(core.hw.irq.if_reg & IF_VBLANK, 0);
    assert_eq!(core.frame_count(), 0);

    core.run_cycles(1);
    assert_ne!(read16(&core, DISPSTAT) & 0x1, 0);
    assert_ne!(core.hw.irq.if_reg & IF_VBLANK, 0);
    assert_eq!(core.frame_count(), 1);
    assert!(core.frame_ready());
}

#[test]
fn vblank_flag_clears_on_last_line() {
    let mut core = new_core();
    core.run_cycles(LINE_CYCLES * 226);
    assert_ne!(read16(&core, DISPSTAT) & 0x1, 0);

    core.run_cycles(LINE_CYCLES);
    assert_eq!(read16(&core, VCOUNT), 227);
    assert_eq!(read16(&core, DISPSTAT) & 0x1, 0);
}

#[test]
fn vcount_match_flag_and_irq() {
    let mut core = new_core();
    write16(&mut core, DISPSTAT, (3 << 8) | 0x0020);

    core.run_cycles(LINE_CYCLES * 3 - 1);
    assert_eq!(core.hw.irq.if_reg & IF_VCOUNT, 0);

    core.run_cycles(1);
    assert_ne!(read16(&core, DISPSTAT) & 0x4, 0);
    assert_ne!(core.hw.irq.if_reg & IF_VCOUNT, 0);

    core.run_cycles(LINE_CYCLES);
    assert_eq!(read16(&core, DISPSTAT) & 0x4, 0);
}

#[test]
fn dispstat_status_bits_are_read_only() {
    let mut core = new_core();
    core.run_cycles(HDRAW_CYCLES);
    write16(&mut core, DISPSTAT, 0x0000);
    assert_ne!(read16(&core, DISPSTAT) & 0x2, 0);
}

#[test]
fn run_frame_returns_once_per_frame() {
    let mut core = new_core();
    core.run_frame();
    assert_eq!(core.cycles(), vblank_start());

    core.run_frame();
    assert_eq!(core.cycles(), vblank_start() + FRAME_CYCLES);
    assert_eq!(core.frame_count(), 2);
}

#[test]
fn frame_is_backdrop_colour() {
    let mut core = new_core();

    // Forced blank at power-on shows white.
    let frame = core.run_frame();
    assert_eq!(frame.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    assert!(frame.iter().all(|&p| p == 0xFF_FFFF));

    write16(&mut core, DISPCNT, 0x0000);
    write16(&mut core, 0x0500_0000, 0x001F);
    let frame = core.run_frame();
    assert!(frame.iter().all(|&p| p == 0xFF_0000));
}

#[test]
fn colour_expansion() {
    assert_eq!(bgr555_to_rgb888(0x0000), 0x00_0000);
    assert_eq!(bgr555_to_rgb888(0x7FFF), 0xFF_FFFF);
    assert_eq!(bgr555_to_rgb888(0x03E0), 0x00_FF00);
    assert_eq!(bgr555_to_rgb888(0x7C00), 0x00_00FF);
    assert_eq!(bgr555_to_rgb888(0x0010), 0x84_0000);
}

#[test]
fn whole_frame_in_one_step_keeps_line_timing() {
    let mut core = new_core();
    write16(&mut core, DISPSTAT, 0x0008);

    core.scheduler.step(FRAME_CYCLES, &mut core.hw);
    assert_eq!(core.frame_count(), 1);
    assert_ne!(core.hw.irq.if_reg & IF_VBLANK, 0);
    assert_eq!(read16(&core, VCOUNT), 0);
    assert_eq!(core.hw.video.phase(), VideoPhase::HDraw);
    assert_eq!(core.scheduler.wait_cycles(Event::Video), Some(HDRAW_CYCLES));
}
