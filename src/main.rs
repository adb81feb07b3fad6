//! Application entry point for TTS Reader.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run) and seed
//!    the welcome document on first launch.
//! 3. Create the engine event channel and the [`EspeakEngine`].
//! 4. Wrap the engine in a [`SessionController`].
//! 5. Spawn the media-key listener thread.
//! 6. Run [`eframe::run_native`], which blocks the main thread until the
//!    window is closed.

use tokio::sync::mpsc;
use tts_reader::{
    app::ReaderApp,
    config::{AppConfig, AppPaths},
    engine::{espeak::resolve_program, event_channel, EspeakEngine},
    hotkey::{HotkeyBindings, HotkeyEvent, HotkeyListener},
    session::SessionController,
    welcome,
};

use eframe::egui;

// ---------------------------------------------------------------------------
// Native options builder
// ---------------------------------------------------------------------------

fn native_options() -> eframe::NativeOptions {
    let vp = egui::ViewportBuilder::default()
        .with_title("TTS Reader")
        .with_inner_size([720.0, 520.0])
        .with_min_inner_size([420.0, 260.0]);

    eframe::NativeOptions {
        viewport: vp,
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> eframe::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("TTS Reader {} starting up", env!("CARGO_PKG_VERSION"));

    // 2. Configuration
    let paths = AppPaths::new();
    let mut config = AppConfig::load_from(&paths.settings_file).unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });
    if welcome::seed_first_run(&mut config, &welcome::current_user()) {
        if let Err(e) = config.save_to(&paths.settings_file) {
            log::warn!("Failed to save config after first run: {e}");
        }
    }

    // 3. Engine
    let (event_tx, event_rx) = event_channel();
    let program = resolve_program(&config.speech.command);
    log::info!("Using synthesizer '{program}'");
    let engine = EspeakEngine::new(program, event_tx);

    // 4. Controller
    let controller = SessionController::new(Box::new(engine), config.speech.clone());

    // 5. Media keys
    let (hotkey_tx, hotkey_rx) = mpsc::channel::<HotkeyEvent>(16);
    let bindings = HotkeyBindings::parse(&config.hotkey.play_pause_key, &config.hotkey.stop_key)
        .unwrap_or_else(|| {
            log::warn!(
                "Unknown hotkey binding ({} / {}); using media keys",
                config.hotkey.play_pause_key,
                config.hotkey.stop_key
            );
            HotkeyBindings::default()
        });
    let _hotkey_listener = match HotkeyListener::start(bindings, hotkey_tx) {
        Ok(listener) => Some(listener),
        Err(e) => {
            log::warn!("Media keys unavailable: {e}");
            None
        }
    };

    // 6. Run the window (blocks until closed)
    let app = ReaderApp::new(controller, event_rx, hotkey_rx, config, paths);

    eframe::run_native(
        "TTS Reader",
        native_options(),
        Box::new(move |_cc| Ok(Box::new(app))),
    )
}
