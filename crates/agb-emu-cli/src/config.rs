use std::io;
use std::path::{Path, PathBuf};

use agb_emu_core::CoreConfig;
use log::warn;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FrontendConfig {
    pub gamepak_path: Option<PathBuf>,
    pub audio_sample_rate: u32,
    /// Speed-up applied while fast-forward is held.
    pub fast_forward_multiplier: f32,
    /// Lock emulation to the real frame rate.
    pub paced: bool,
    /// Echo serial transfers back instead of leaving the link line idle.
    pub link_loopback: bool,
}

impl Default for FrontendConfig {
    fn default() -> Self {
        Self {
            gamepak_path: None,
            audio_sample_rate: CoreConfig::default().audio_sample_rate,
            fast_forward_multiplier: 4.0,
            paced: true,
            link_loopback: false,
        }
    }
}

impl FrontendConfig {
    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            audio_sample_rate: self.audio_sample_rate,
        }
    }
}

pub fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Some(appdata) = std::env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("agb-emu").join("config.toml");
        }
    }

    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("agb-emu").join("config.toml");
    }

    if let Some(home) = std::env::var_os("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join("agb-emu")
            .join("config.toml");
    }

    PathBuf::from("agb-emu.toml")
}

pub fn load_from_file(path: &Path) -> FrontendConfig {
    let text = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return FrontendConfig::default(),
    };

    let mut cfg = match toml::from_str::<FrontendConfig>(&text) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!(
                "Failed to parse config {}: {e}; using defaults",
                path.display()
            );
            return FrontendConfig::default();
        }
    };

    let defaults = FrontendConfig::default();
    if cfg.audio_sample_rate == 0 {
        warn!(
            "audio-sample-rate must be non-zero; using {}",
            defaults.audio_sample_rate
        );
        cfg.audio_sample_rate = defaults.audio_sample_rate;
    }
    if cfg.fast_forward_multiplier.is_nan() || cfg.fast_forward_multiplier < 1.0 {
        warn!(
            "fast-forward-multiplier must be at least 1; using {}",
            defaults.fast_forward_multiplier
        );
        cfg.fast_forward_multiplier = defaults.fast_forward_multiplier;
    }
    cfg
}

pub fn save_to_file(path: &Path, cfg: &FrontendConfig) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let text = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
    std::fs::write(path, text)
}
