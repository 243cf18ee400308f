use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use agb_emu_core::keypad::KeyState;
use agb_emu_core::serial::NullLinkPort;
use agb_emu_core::video::FRAME_CYCLES;
use agb_emu_core::{CLOCK_HZ, Core, CoreConfig, Cycles};
use crossbeam_channel::{self as cb, TryRecvError};
use log::{debug, info, trace};
use thiserror::Error;

/// Wall-clock length of one frame at native speed (about 59.7275 Hz).
pub const FRAME_TIME: Duration = Duration::from_nanos(FRAME_CYCLES * 1_000_000_000 / CLOCK_HZ);

/// Frames allowed to wait in the notification queue before new ones are
/// dropped.
const MAX_QUEUED_FRAMES: usize = 8;

#[derive(Error, Debug)]
pub enum EmuThreadError {
    #[error("failed to spawn emulator thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("emulator thread is no longer running")]
    Disconnected,

    #[error("emulator thread panicked")]
    Panicked,
}

#[derive(Clone, Debug)]
pub enum Command {
    Pause(bool),
    Reset,
    SetKeys(KeyState),
    FastForward(bool),
    Stop,
}

#[derive(Clone, Debug)]
pub struct Frame {
    /// Frames completed since the thread started, counting from 1.
    pub number: u64,
    /// Machine cycle count when the frame was published.
    pub cycles: Cycles,
    pub pixels: Vec<u32>,
    /// Audio produced since the previous frame.
    pub audio: Vec<[i16; 2]>,
}

#[derive(Clone, Debug)]
pub enum Notification {
    Frame(Frame),
    /// Measured frames per second over the last second of wall time.
    FrameRate(f64),
    Stopped { frames: u64, cycles: Cycles },
}

#[derive(Clone, Debug)]
pub struct EmuOptions {
    pub core: CoreConfig,
    pub gamepak: Option<Vec<u8>>,
    pub paced: bool,
    pub fast_forward_multiplier: f32,
    pub link_loopback: bool,
    /// Stop on its own after this many frames.
    pub frame_limit: Option<u64>,
    /// Stop on its own once the machine reaches this cycle count.
    pub cycle_limit: Option<Cycles>,
}

impl Default for EmuOptions {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            gamepak: None,
            paced: true,
            fast_forward_multiplier: 4.0,
            link_loopback: false,
            frame_limit: None,
            cycle_limit: None,
        }
    }
}

/// Handle to a machine running on its own thread.
///
/// Commands go in through an unbounded channel and are applied between
/// frames. Frames and status come back as [`Notification`]s.
pub struct EmulatorThread {
    commands: cb::Sender<Command>,
    notifications: cb::Receiver<Notification>,
    handle: Option<JoinHandle<()>>,
}

impl EmulatorThread {
    pub fn spawn(options: EmuOptions) -> Result<Self, EmuThreadError> {
        let (cmd_tx, cmd_rx) = cb::unbounded();
        let (note_tx, note_rx) = cb::unbounded();

        let handle = thread::Builder::new()
            .name("emulator".into())
            .spawn(move || run(options, cmd_rx, note_tx))?;

        Ok(Self {
            commands: cmd_tx,
            notifications: note_rx,
            handle: Some(handle),
        })
    }

    pub fn notifications(&self) -> &cb::Receiver<Notification> {
        &self.notifications
    }

    pub fn send(&self, command: Command) -> Result<(), EmuThreadError> {
        self.commands
            .send(command)
            .map_err(|_| EmuThreadError::Disconnected)
    }

    pub fn pause(&self, paused: bool) -> Result<(), EmuThreadError> {
        self.send(Command::Pause(paused))
    }

    pub fn reset(&self) -> Result<(), EmuThreadError> {
        self.send(Command::Reset)
    }

    pub fn set_keys(&self, keys: KeyState) -> Result<(), EmuThreadError> {
        self.send(Command::SetKeys(keys))
    }

    pub fn fast_forward(&self, enabled: bool) -> Result<(), EmuThreadError> {
        self.send(Command::FastForward(enabled))
    }

    /// Ask the thread to stop and wait for it to exit.
    pub fn stop(mut self) -> Result<(), EmuThreadError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<(), EmuThreadError> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        // The thread may already have stopped on its own.
        let _ = self.commands.send(Command::Stop);
        handle.join().map_err(|_| EmuThreadError::Panicked)
    }
}

impl Drop for EmulatorThread {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

struct Pacer {
    next: Instant,
}

impl Pacer {
    fn new() -> Self {
        Self {
            next: Instant::now(),
        }
    }

    fn restart(&mut self) {
        self.next = Instant::now();
    }

    /// Sleep until the next frame is due at `speed` times native rate.
    fn wait(&mut self, speed: f32) {
        let frame_time = FRAME_TIME.div_f32(speed);
        self.next += frame_time;
        let now = Instant::now();
        if self.next > now {
            thread::sleep(self.next - now);
        } else if now - self.next > frame_time * 4 {
            // Too far behind to catch up; drop the backlog.
            trace!("pacer fell behind by {:?}", now - self.next);
            self.next = now;
        }
    }
}

struct FrameRateMeter {
    start: Instant,
    frames: u32,
}

impl FrameRateMeter {
    fn new() -> Self {
        Self {
            start: Instant::now(),
            frames: 0,
        }
    }

    /// Count a frame. Returns the rate once a second has passed.
    fn tick(&mut self) -> Option<f64> {
        self.frames += 1;
        let elapsed = self.start.elapsed();
        if elapsed < Duration::from_secs(1) {
            return None;
        }
        let fps = f64::from(self.frames) / elapsed.as_secs_f64();
        *self = Self::new();
        Some(fps)
    }
}

fn run(
    options: EmuOptions,
    commands: cb::Receiver<Command>,
    notifications: cb::Sender<Notification>,
) {
    let mut core = Core::new(options.core.clone());
    if let Some(rom) = options.gamepak {
        core.load_gamepak(rom);
    }
    if options.link_loopback {
        core.connect_link(Box::new(NullLinkPort::new(true)));
    }

    let mut paused = false;
    let mut fast = false;
    let mut frames = 0u64;
    let mut pacer = Pacer::new();
    let mut meter = FrameRateMeter::new();

    info!("emulator thread started");

    'run: loop {
        loop {
            let command = if paused {
                match commands.recv() {
                    Ok(command) => command,
                    Err(_) => break 'run,
                }
            } else {
                match commands.try_recv() {
                    Ok(command) => command,
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'run,
                }
            };

            debug!("emulator command: {command:?}");
            match command {
                Command::Pause(p) => {
                    paused = p;
                    if !paused {
                        pacer.restart();
                        meter = FrameRateMeter::new();
                    }
                }
                Command::Reset => core.reset(),
                Command::SetKeys(keys) => core.set_key_state(keys),
                Command::FastForward(on) => fast = on,
                Command::Stop => break 'run,
            }
        }

        match options.cycle_limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(core.cycles());
                if remaining == 0 {
                    break 'run;
                }
                core.run_cycles(remaining.min(FRAME_CYCLES));
            }
            None => {
                core.run_frame();
            }
        }

        if let Some(pixels) = core.take_frame() {
            frames += 1;
            let frame = Frame {
                number: frames,
                cycles: core.cycles(),
                pixels,
                audio: core.take_audio(),
            };
            if notifications.len() < MAX_QUEUED_FRAMES {
                if notifications.send(Notification::Frame(frame)).is_err() {
                    break 'run;
                }
            } else {
                trace!("notification queue full; dropping frame {frames}");
            }

            if let Some(fps) = meter.tick() {
                let _ = notifications.send(Notification::FrameRate(fps));
            }
            if options.frame_limit.is_some_and(|limit| frames >= limit) {
                break 'run;
            }
        }

        if options.paced {
            let speed = if fast {
                options.fast_forward_multiplier.max(1.0)
            } else {
                1.0
            };
            pacer.wait(speed);
        }
    }

    let cycles = core.cycles();
    info!("emulator thread stopping after {frames} frames ({cycles} cycles)");
    // Later commands must fail rather than queue up unseen.
    drop(commands);
    let _ = notifications.send(Notification::Stopped { frames, cycles });
}
