use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use agb_emu_cli::config::{self, FrontendConfig};
use agb_emu_cli::emu_thread::{EmuOptions, EmulatorThread, Notification};
use clap::Parser;
use env_logger::Env;
use log::{error, info, warn};

#[derive(Parser)]
#[command(name = "agb-emu", version, about = "Headless handheld emulator")]
struct Args {
    /// Path to gamepak image
    gamepak: Option<PathBuf>,

    /// Configuration file (defaults to the per-user config)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration back to the config file
    #[arg(long)]
    save_config: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Run as fast as possible instead of at native speed
    #[arg(long)]
    unpaced: bool,

    /// Start in fast-forward
    #[arg(long)]
    fast_forward: bool,

    /// Fast-forward speed as a multiple of native speed
    #[arg(long, value_name = "MULTIPLIER")]
    speed: Option<f32>,

    /// Echo serial transfers back instead of leaving the link idle
    #[arg(long)]
    link_loopback: bool,

    /// Number of frames to run before exiting
    #[arg(long)]
    frames: Option<u64>,

    /// Number of wall-clock seconds to run before exiting
    #[arg(long)]
    seconds: Option<u64>,

    /// Number of machine cycles to run before exiting
    #[arg(long)]
    cycles: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    let config_path = args.config.clone().unwrap_or_else(config::default_config_path);
    let mut cfg: FrontendConfig = config::load_from_file(&config_path);

    if let Some(path) = &args.gamepak {
        cfg.gamepak_path = Some(path.clone());
    }
    if args.unpaced {
        cfg.paced = false;
    }
    if args.link_loopback {
        cfg.link_loopback = true;
    }
    if let Some(multiplier) = args.speed {
        if multiplier >= 1.0 {
            cfg.fast_forward_multiplier = multiplier;
        } else {
            warn!("ignoring fast-forward multiplier {multiplier}; it must be at least 1");
        }
    }

    if args.save_config {
        match config::save_to_file(&config_path, &cfg) {
            Ok(()) => info!("saved configuration to {}", config_path.display()),
            Err(e) => warn!(
                "failed to save configuration to {}: {e}",
                config_path.display()
            ),
        }
    }

    let gamepak = match &cfg.gamepak_path {
        Some(path) => match std::fs::read(path) {
            Ok(data) => {
                info!("loaded gamepak {} ({} bytes)", path.display(), data.len());
                Some(data)
            }
            Err(e) => {
                error!("failed to load gamepak {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => {
            info!("no gamepak supplied; running with an empty slot");
            None
        }
    };

    let options = EmuOptions {
        core: cfg.core_config(),
        gamepak,
        paced: cfg.paced,
        fast_forward_multiplier: cfg.fast_forward_multiplier,
        link_loopback: cfg.link_loopback,
        frame_limit: args.frames,
        cycle_limit: args.cycles,
    };

    let emu = match EmulatorThread::spawn(options) {
        Ok(emu) => emu,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    if args.fast_forward
        && let Err(e) = emu.fast_forward(true)
    {
        warn!("{e}");
    }

    let start = Instant::now();
    let deadline = args.seconds.map(|s| start + Duration::from_secs(s));
    let mut frames = 0u64;
    let mut cycles = 0u64;
    let mut audio_samples = 0usize;

    loop {
        if deadline.is_some_and(|d| Instant::now() >= d) {
            info!("time limit reached");
            break;
        }
        match emu.notifications().recv_timeout(Duration::from_millis(100)) {
            Ok(Notification::Frame(frame)) => {
                frames = frame.number;
                cycles = frame.cycles;
                audio_samples += frame.audio.len();
            }
            Ok(Notification::FrameRate(fps)) => info!("{fps:.2} fps"),
            Ok(Notification::Stopped {
                frames: f,
                cycles: c,
            }) => {
                frames = f;
                cycles = c;
                break;
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                error!("emulator thread exited unexpectedly");
                return ExitCode::FAILURE;
            }
        }
    }

    let elapsed = start.elapsed();
    if let Err(e) = emu.stop() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let fps = if elapsed.as_secs_f64() > 0.0 {
        frames as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    println!(
        "{frames} frames, {cycles} cycles in {:.2}s ({fps:.2} fps), {audio_samples} audio samples",
        elapsed.as_secs_f64()
    );
    ExitCode::SUCCESS
}
