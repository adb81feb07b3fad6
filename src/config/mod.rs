//! Configuration module for TTS Reader.
//!
//! Provides `AppConfig` (top-level settings), sub-configs for each subsystem,
//! `AppPaths` for cross-platform directories, and TOML persistence via
//! `AppConfig::load` / `AppConfig::save`.

pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AppConfig, DocumentConfig, ExportConfig, HotkeyConfig, SpeechConfig, UiConfig, MAX_RATE,
    MAX_VOLUME, MIN_RATE,
};
