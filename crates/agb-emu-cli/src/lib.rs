//! Headless frontend for `agb-emu-core`: configuration file handling and the
//! emulator thread that owns a running machine.

/// Frontend settings stored as TOML.
pub mod config;

/// Worker thread that runs a [`agb_emu_core::Core`] and paces it.
pub mod emu_thread;
