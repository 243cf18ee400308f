use log::{debug, trace};

use crate::config::CoreConfig;
use crate::cpu::{Bus, Cpu, IdleCpu};
use crate::event::Event;
use crate::hardware::Hardware;
use crate::keypad::{Key, KeyState};
use crate::scheduler::{Cycles, Scheduler};
use crate::serial::{LinkPort, NullLinkPort};
use crate::video::FRAME_CYCLES;

/// Batch length used when nothing is scheduled at all.
pub const IDLE_SLICE: Cycles = 1232;

/// One emulated machine: a scheduler, the hardware it drives and the CPU.
///
/// Nothing here is global, so any number of machines can run side by side.
pub struct Core {
    pub scheduler: Scheduler<Event>,
    pub hw: Hardware,
    cpu: Box<dyn Cpu>,
    config: CoreConfig,
}

impl Core {
    pub fn new(config: CoreConfig) -> Self {
        Self::with_cpu(config, Box::new(IdleCpu))
    }

    pub fn with_cpu(config: CoreConfig, cpu: Box<dyn Cpu>) -> Self {
        let mut scheduler = Scheduler::new();
        let hw = Hardware::new(&config);
        hw.power_on(&mut scheduler);
        Self {
            scheduler,
            hw,
            cpu,
            config,
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Cycles elapsed since power-on or the last reset.
    pub fn cycles(&self) -> Cycles {
        self.scheduler.now()
    }

    /// Return to the power-on state, keeping the game pak and link cable.
    pub fn reset(&mut self) {
        let gamepak = self.hw.memory.gamepak.take();
        let link = self.hw.serial.take_port();

        self.scheduler.reset();
        self.hw = Hardware::new(&self.config);
        self.hw.memory.gamepak = gamepak;
        self.hw.serial.connect(link);
        self.hw.power_on(&mut self.scheduler);
        self.cpu.reset();
        debug!("core reset");
    }

    pub fn load_gamepak(&mut self, rom: Vec<u8>) {
        self.hw.memory.load_gamepak(rom);
    }

    pub fn connect_link(&mut self, port: Box<dyn LinkPort + Send>) {
        self.hw.serial.connect(port);
    }

    pub fn disconnect_link(&mut self) {
        self.hw.serial.connect(Box::new(NullLinkPort::default()));
    }

    pub fn set_key(&mut self, key: Key, pressed: bool) {
        self.hw.keypad.set_key(key, pressed, &mut self.hw.irq);
    }

    /// Replace the whole input state at once.
    pub fn set_key_state(&mut self, state: KeyState) {
        self.hw.keypad.set_state(state, &mut self.hw.irq);
    }

    /// Run exactly `cycles` cycles.
    pub fn run_cycles(&mut self, cycles: Cycles) {
        let end = self.scheduler.now() + cycles;
        while self.scheduler.now() < end {
            let limit = end - self.scheduler.now();
            self.run_batch(limit);
        }
    }

    /// Run until the video unit publishes its next frame and return it.
    pub fn run_frame(&mut self) -> &[u32] {
        self.hw.video.clear_frame_flag();
        while !self.hw.video.frame_ready() {
            self.run_batch(FRAME_CYCLES);
        }
        self.hw.video.framebuffer()
    }

    /// Copy of the latest frame if one was published since the last call.
    pub fn take_frame(&mut self) -> Option<Vec<u32>> {
        if !self.hw.video.frame_ready() {
            return None;
        }
        self.hw.video.clear_frame_flag();
        Some(self.hw.video.framebuffer().to_vec())
    }

    pub fn frame_ready(&self) -> bool {
        self.hw.video.frame_ready()
    }

    pub fn framebuffer(&self) -> &[u32] {
        self.hw.video.framebuffer()
    }

    pub fn frame_count(&self) -> u64 {
        self.hw.video.frame_count()
    }

    pub fn take_audio(&mut self) -> Vec<[i16; 2]> {
        self.hw.audio.take_samples()
    }

    pub fn take_serial(&mut self) -> Vec<u8> {
        self.hw.serial.take_output()
    }

    /// One pass of the clock driver: run the CPU up to the next event (or
    /// `limit`), then advance the scheduler by what was actually executed.
    fn run_batch(&mut self, limit: Cycles) -> Cycles {
        let budget = self.scheduler.horizon().unwrap_or(IDLE_SLICE).min(limit);

        let (executed, synced) = if self.hw.irq.halted() {
            (budget, 0)
        } else {
            let mut bus = Bus::new(&mut self.hw, &mut self.scheduler, budget);
            let executed = self.cpu.run(budget, &mut bus);
            assert!(
                executed <= budget,
                "CPU ran {executed} cycles with a budget of {budget}"
            );
            assert!(
                executed > 0 || budget == 0,
                "CPU made no progress with a budget of {budget}"
            );
            assert!(
                executed >= bus.elapsed(),
                "CPU ran {executed} cycles after advancing {}",
                bus.elapsed()
            );
            (executed, bus.synced())
        };

        // Writes during the batch may already have stepped part of it.
        self.scheduler.step(executed - synced, &mut self.hw);

        if self.hw.irq.try_wake() {
            trace!("CPU leaves halt at cycle {}", self.scheduler.now());
        }
        executed
    }
}

impl Default for Core {
    fn default() -> Self {
        Self::new(CoreConfig::default())
    }
}
