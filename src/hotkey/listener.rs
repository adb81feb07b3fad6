//! Dedicated OS-thread hotkey listener using `rdev::listen`.
//!
//! `rdev::listen` is a blocking call that must live on its own OS thread.
//! [`HotkeyListener`] owns that thread and a stop flag; dropping it sets the
//! flag so the callback silently ignores further events.
//!
//! # Shutdown caveat
//!
//! `rdev::listen` has **no graceful shutdown API**.  Setting the stop flag
//! prevents events from being forwarded, but the OS thread itself will remain
//! blocked in the rdev event loop until the process exits.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::mpsc;

use super::{HotkeyBindings, HotkeyEvent};

// ---------------------------------------------------------------------------
// HotkeyListener
// ---------------------------------------------------------------------------

/// Handle to a running hotkey listener thread.
pub struct HotkeyListener {
    /// Shared stop flag, set on [`Drop`].
    stop: Arc<AtomicBool>,
    /// Kept so the thread is not detached; never joined because
    /// `rdev::listen` never returns.
    _thread: std::thread::JoinHandle<()>,
}

impl HotkeyListener {
    /// Spawn a dedicated OS thread that forwards a [`HotkeyEvent`] on `tx`
    /// each time one of `bindings` is pressed.
    ///
    /// Key auto-repeat is collapsed: holding a key fires once.  Events are
    /// sent with `try_send`, so a full channel drops the press instead of
    /// stalling the OS input hook.
    pub fn start(
        bindings: HotkeyBindings,
        tx: mpsc::Sender<HotkeyEvent>,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let stop_clone = Arc::clone(&stop);

        let thread = std::thread::Builder::new()
            .name("hotkey-listener".into())
            .spawn(move || {
                let mut held: Option<rdev::Key> = None;
                let result = rdev::listen(move |event| {
                    if stop_clone.load(Ordering::Relaxed) {
                        return;
                    }

                    match event.event_type {
                        rdev::EventType::KeyPress(k) if held != Some(k) => {
                            if let Some(hotkey) = bindings.event_for(k) {
                                held = Some(k);
                                if tx.try_send(hotkey).is_err() {
                                    log::warn!("hotkey-listener: dropped {hotkey:?}");
                                }
                            }
                        }
                        rdev::EventType::KeyRelease(k) if held == Some(k) => {
                            held = None;
                        }
                        _ => {}
                    }
                });

                if let Err(e) = result {
                    log::error!("hotkey-listener: rdev::listen exited with error: {:?}", e);
                }
            })?;

        log::info!(
            "hotkey-listener: watching {:?} (play/pause) and {:?} (stop)",
            bindings.play_pause,
            bindings.stop
        );

        Ok(Self {
            stop,
            _thread: thread,
        })
    }
}

impl Drop for HotkeyListener {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}
