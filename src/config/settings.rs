//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files.  Every section carries
//! `#[serde(default)]`, so a file written by an older build that lacks a
//! field still loads.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

/// Slowest speaking rate accepted by the engine.
pub const MIN_RATE: i32 = -10;
/// Fastest speaking rate accepted by the engine.
pub const MAX_RATE: i32 = 10;
/// Loudest volume.
pub const MAX_VOLUME: u8 = 100;

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Voice parameters applied at the start of every reading session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    /// Voice name or language code.  `None` means the engine default.
    pub voice: Option<String>,
    /// Speaking rate in `MIN_RATE..=MAX_RATE`; 0 is normal speed.
    pub rate: i32,
    /// Volume in `0..=MAX_VOLUME`.
    pub volume: u8,
    /// Synthesizer program to run.
    pub command: String,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            voice: None,
            rate: 0,
            volume: MAX_VOLUME,
            command: "espeak-ng".into(),
        }
    }
}

impl SpeechConfig {
    /// Pull out-of-range values back into range and drop a blank voice.
    pub fn clamp(&mut self) {
        self.rate = self.rate.clamp(MIN_RATE, MAX_RATE);
        self.volume = self.volume.min(MAX_VOLUME);
        if self.voice.as_deref().is_some_and(|v| v.trim().is_empty()) {
            self.voice = None;
        }
    }
}

// ---------------------------------------------------------------------------
// DocumentConfig
// ---------------------------------------------------------------------------

/// The text being read and where the cursor was left.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub text: String,
    /// Char index of the cursor when the app last closed.
    pub selection_start: Option<usize>,
}

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
///
/// Values are key names understood by [`crate::hotkey::parse_key`], or
/// `"Raw:<code>"` for keys `rdev` has no name for (media keys).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Toggles start / pause / resume.
    pub play_pause_key: String,
    /// Stops reading.
    pub stop_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            play_pause_key: crate::hotkey::DEFAULT_PLAY_PAUSE_KEY.into(),
            stop_key: crate::hotkey::DEFAULT_STOP_KEY.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ExportConfig
// ---------------------------------------------------------------------------

/// Where "Save to file" writes, and the label used in the file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Target directory.  `None` resolves through [`AppPaths::export_dir`].
    pub output_dir: Option<PathBuf>,
    /// First part of `{label}_{voice}.wav`.
    pub label: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            label: "speech".into(),
        }
    }
}

impl ExportConfig {
    /// Configured directory, or the platform default.
    pub fn resolved_dir(&self, paths: &AppPaths) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| paths.export_dir.clone())
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Set once the welcome text has been shown.
    pub has_seen_welcome: bool,
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use tts_reader::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let mut config = AppConfig::load().unwrap();
///
/// config.speech.rate = 3;
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub speech: SpeechConfig,
    pub document: DocumentConfig,
    pub hotkey: HotkeyConfig,
    pub export: ExportConfig,
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path, clamping values into range.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.speech.clamp();
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");
        assert_eq!(original, loaded);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.speech.voice, None);
        assert_eq!(cfg.speech.rate, 0);
        assert_eq!(cfg.speech.volume, 100);
        assert_eq!(cfg.speech.command, "espeak-ng");
        assert!(cfg.document.text.is_empty());
        assert_eq!(cfg.document.selection_start, None);
        assert_eq!(cfg.export.label, "speech");
        assert!(cfg.export.output_dir.is_none());
        assert!(!cfg.ui.has_seen_welcome);
        assert!(!cfg.hotkey.play_pause_key.is_empty());
        assert!(!cfg.hotkey.stop_key.is_empty());
    }

    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.speech.voice = Some("en-gb".into());
        cfg.speech.rate = -4;
        cfg.speech.volume = 55;
        cfg.document.text = "Hello world".into();
        cfg.document.selection_start = Some(6);
        cfg.hotkey.play_pause_key = "F8".into();
        cfg.export.output_dir = Some(dir.path().join("out"));
        cfg.export.label = "chapter-1".into();
        cfg.ui.has_seen_welcome = true;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded, cfg);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[speech]\nrate = 2\n").expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.speech.rate, 2);
        assert_eq!(loaded.speech.volume, 100);
        assert_eq!(loaded.export, ExportConfig::default());
    }

    #[test]
    fn out_of_range_values_are_clamped_on_load() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("wild.toml");
        std::fs::write(&path, "[speech]\nrate = 40\nvolume = 250\nvoice = \"  \"\n")
            .expect("write");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.speech.rate, MAX_RATE);
        assert_eq!(loaded.speech.volume, MAX_VOLUME);
        assert_eq!(loaded.speech.voice, None);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "[speech\nrate = ").expect("write");

        assert!(AppConfig::load_from(&path).is_err());
    }

    #[test]
    fn explicit_export_dir_wins() {
        let paths = AppPaths::new();
        let mut export = ExportConfig::default();
        assert_eq!(export.resolved_dir(&paths), paths.export_dir);

        export.output_dir = Some(PathBuf::from("/tmp/readings"));
        assert_eq!(export.resolved_dir(&paths), PathBuf::from("/tmp/readings"));
    }
}
