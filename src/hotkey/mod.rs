//! Global media-key listener, backed by `rdev`.
//!
//! # Design
//!
//! `rdev::listen()` is a blocking OS-level call that never returns while the
//! process is alive.  It must run on a **dedicated OS thread**; it cannot be
//! used inside a tokio task.
//!
//! [`HotkeyListener::start`] spawns that dedicated thread and returns a
//! [`HotkeyListener`] handle.  Dropping the handle sets a stop flag so the
//! callback silently discards further events.
//!
//! Media keys have no named `rdev::Key` variant.  They arrive as
//! `Key::Unknown(code)` with a platform code, which a binding names as
//! `"Raw:<code>"`.
//!
//! # Usage
//!
//! ```no_run
//! use tokio::sync::mpsc;
//! use tts_reader::hotkey::{HotkeyBindings, HotkeyListener};
//!
//! let (tx, mut rx) = mpsc::channel(16);
//! let bindings = HotkeyBindings::parse("F8", "F9").expect("unknown key");
//! let _listener = HotkeyListener::start(bindings, tx).expect("spawn");
//!
//! // Once per frame:
//! // while let Ok(ev) = rx.try_recv() { ... }
//! ```

pub mod listener;

pub use listener::HotkeyListener;

/// Play/Pause media key.  Windows reports `VK_MEDIA_PLAY_PAUSE`.
#[cfg(target_os = "windows")]
pub const DEFAULT_PLAY_PAUSE_KEY: &str = "Raw:179";
/// Stop media key.  Windows reports `VK_MEDIA_STOP`.
#[cfg(target_os = "windows")]
pub const DEFAULT_STOP_KEY: &str = "Raw:178";

/// Play/Pause media key.  X11 keycode of `XF86AudioPlay`.
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_PLAY_PAUSE_KEY: &str = "Raw:172";
/// Stop media key.  X11 keycode of `XF86AudioStop`.
#[cfg(not(target_os = "windows"))]
pub const DEFAULT_STOP_KEY: &str = "Raw:174";

// ---------------------------------------------------------------------------
// HotkeyEvent
// ---------------------------------------------------------------------------

/// Events emitted by the hotkey listener thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyEvent {
    /// Start, pause or resume, depending on the session state.
    PlayPause,
    /// Stop reading.
    Stop,
}

// ---------------------------------------------------------------------------
// HotkeyBindings
// ---------------------------------------------------------------------------

/// The two keys the listener watches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotkeyBindings {
    pub play_pause: rdev::Key,
    pub stop: rdev::Key,
}

impl HotkeyBindings {
    /// Parse both bindings; `None` if either name is unknown.
    pub fn parse(play_pause: &str, stop: &str) -> Option<Self> {
        Some(Self {
            play_pause: parse_key(play_pause)?,
            stop: parse_key(stop)?,
        })
    }

    /// Map a pressed key onto the event it triggers.
    pub fn event_for(&self, key: rdev::Key) -> Option<HotkeyEvent> {
        if key == self.play_pause {
            Some(HotkeyEvent::PlayPause)
        } else if key == self.stop {
            Some(HotkeyEvent::Stop)
        } else {
            None
        }
    }
}

impl Default for HotkeyBindings {
    fn default() -> Self {
        Self {
            play_pause: raw_key(DEFAULT_PLAY_PAUSE_KEY),
            stop: raw_key(DEFAULT_STOP_KEY),
        }
    }
}

fn raw_key(name: &str) -> rdev::Key {
    parse_key(name).unwrap_or(rdev::Key::Pause)
}

// ---------------------------------------------------------------------------
// parse_key
// ---------------------------------------------------------------------------

/// Parse a hotkey name from a config string into an [`rdev::Key`].
///
/// Supports F1–F12, common named keys, single ASCII letters and
/// `"Raw:<code>"` for platform key codes `rdev` has no name for.
///
/// Returns `None` for unrecognised names.
///
/// # Examples
///
/// ```
/// use tts_reader::hotkey::parse_key;
///
/// assert_eq!(parse_key("F9"),      Some(rdev::Key::F9));
/// assert_eq!(parse_key("Pause"),   Some(rdev::Key::Pause));
/// assert_eq!(parse_key("Raw:172"), Some(rdev::Key::Unknown(172)));
/// assert_eq!(parse_key("xyz"),     None);
/// ```
pub fn parse_key(key_str: &str) -> Option<rdev::Key> {
    if let Some(code) = key_str.strip_prefix("Raw:") {
        return code.trim().parse().ok().map(rdev::Key::Unknown);
    }

    match key_str {
        // Function keys
        "F1" => Some(rdev::Key::F1),
        "F2" => Some(rdev::Key::F2),
        "F3" => Some(rdev::Key::F3),
        "F4" => Some(rdev::Key::F4),
        "F5" => Some(rdev::Key::F5),
        "F6" => Some(rdev::Key::F6),
        "F7" => Some(rdev::Key::F7),
        "F8" => Some(rdev::Key::F8),
        "F9" => Some(rdev::Key::F9),
        "F10" => Some(rdev::Key::F10),
        "F11" => Some(rdev::Key::F11),
        "F12" => Some(rdev::Key::F12),

        // Navigation / control
        "Escape" | "Esc" => Some(rdev::Key::Escape),
        "Space" => Some(rdev::Key::Space),
        "Home" => Some(rdev::Key::Home),
        "End" => Some(rdev::Key::End),
        "Insert" | "Ins" => Some(rdev::Key::Insert),
        "PageUp" => Some(rdev::Key::PageUp),
        "PageDown" => Some(rdev::Key::PageDown),

        // Lock / special
        "ScrollLock" => Some(rdev::Key::ScrollLock),
        "PrintScreen" => Some(rdev::Key::PrintScreen),
        "Pause" => Some(rdev::Key::Pause),

        // Letter keys, either case
        s if s.len() == 1 => letter_key(s.as_bytes()[0].to_ascii_uppercase()),

        _ => None,
    }
}

fn letter_key(letter: u8) -> Option<rdev::Key> {
    use rdev::Key::*;
    const LETTERS: [rdev::Key; 26] = [
        KeyA, KeyB, KeyC, KeyD, KeyE, KeyF, KeyG, KeyH, KeyI, KeyJ, KeyK, KeyL, KeyM, KeyN, KeyO,
        KeyP, KeyQ, KeyR, KeyS, KeyT, KeyU, KeyV, KeyW, KeyX, KeyY, KeyZ,
    ];
    letter
        .checked_sub(b'A')
        .and_then(|i| LETTERS.get(usize::from(i)))
        .copied()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
