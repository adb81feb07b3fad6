//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\tts-reader\
//!   macOS:   ~/Library/Application Support/tts-reader/
//!   Linux:   ~/.config/tts-reader/
//!
//! Export dir (saved WAV files):
//!   the user's audio dir, else documents, else the current directory.

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Default target for "Save to file".
    pub export_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "tts-reader";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path.
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");

        let export_dir = dirs::audio_dir()
            .or_else(dirs::document_dir)
            .unwrap_or_else(|| PathBuf::from("."));

        Self {
            config_dir,
            settings_file,
            export_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
