//! Speech synthesis engine adapter.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │               SynthesisEngine (trait)                     │
//! │                                                          │
//! │   ┌──────────────┐   speak()   ┌────────────────────┐    │
//! │   │ EspeakEngine │────────────▶│ playback worker     │    │
//! │   │ - voice/rate │             │ - espeak-ng → wav   │    │
//! │   │ - output     │             │ - rodio Sink        │    │
//! │   └──────────────┘             │ - WordTimeline      │    │
//! │                                └─────────┬──────────┘    │
//! │                                          │ EngineEvent    │
//! └──────────────────────────────────────────┼───────────────┘
//!                                            ▼
//!                                   UI thread (SessionController)
//! ```
//!
//! The adapter only knows utterance-relative character offsets.  Mapping
//! them onto the document is the session controller's job.

pub mod espeak;
pub mod playback;
pub mod timeline;

#[cfg(test)]
mod mock;

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;

pub use espeak::{EspeakEngine, VoiceInfo};
pub use timeline::{TimedWord, WordTimeline};

#[cfg(test)]
pub use mock::{EngineCall, MockEngine};

// ---------------------------------------------------------------------------
// Identifiers and states
// ---------------------------------------------------------------------------

/// Handle for one synthesis request, issued by [`SynthesisEngine::speak`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtteranceId(pub u64);

impl fmt::Display for UtteranceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// State reported by the engine.
///
/// ```text
/// Ready ──speak──▶ Speaking ──pause──▶ Paused
///   ▲                │  ▲                 │
///   │                │  └─────resume──────┘
///   └─finish/cancel──┘
/// Ready ──speak_blocking(file)──▶ Exporting ──done──▶ Ready
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SynthesizerState {
    /// Nothing queued; a new utterance may be started.
    #[default]
    Ready,
    /// An utterance is being synthesised or played.
    Speaking,
    /// Playback is suspended; the utterance is still held.
    Paused,
    /// A blocking synthesis-to-file pass is running.
    Exporting,
}

impl SynthesizerState {
    /// Short label for the status bar.
    pub fn label(&self) -> &'static str {
        match self {
            SynthesizerState::Ready => "Ready",
            SynthesizerState::Speaking => "Speaking",
            SynthesizerState::Paused => "Paused",
            SynthesizerState::Exporting => "Saving",
        }
    }
}

/// Where synthesised audio goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    /// The system's default playback device.
    #[default]
    DefaultDevice,
    /// A WAV file at the given path.
    File(PathBuf),
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// How an utterance ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// Played to the end.
    Finished,
    /// Stopped through [`SynthesisEngine::cancel`].
    Cancelled,
    /// Synthesis or playback failed on the worker thread.
    Failed(String),
}

/// Notification sent from the engine's worker threads to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A word is about to be spoken.  `offset` counts chars from the start
    /// of the utterance text.
    Progress {
        utterance: UtteranceId,
        text: String,
        offset: usize,
    },
    /// The engine moved to a new state.
    StateChanged(SynthesizerState),
    /// An utterance ended.
    Completed {
        utterance: UtteranceId,
        outcome: CompletionOutcome,
    },
}

/// Sending half used by engine workers.  Unbounded so that workers and
/// UI-thread calls never block on a full queue.
pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiving half drained by the UI thread.
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Create the engine → controller event channel.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

// ---------------------------------------------------------------------------
// EngineError
// ---------------------------------------------------------------------------

/// All errors that can arise from the synthesis engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested voice is not installed.
    #[error("voice not found: {0}")]
    VoiceNotFound(String),

    /// The synthesizer program could not be launched.
    #[error("failed to launch synthesizer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The synthesizer ran but exited unsuccessfully.
    #[error("synthesizer exited with status {status}: {stderr}")]
    Process { status: i32, stderr: String },

    /// Reading or writing audio files failed.
    #[error("audio file error: {0}")]
    Io(#[from] std::io::Error),

    /// The generated audio could not be decoded.
    #[error("cannot decode synthesised audio: {0}")]
    Decode(String),

    /// No playback device is available.
    #[error("no audio output device: {0}")]
    Device(String),
}

// ---------------------------------------------------------------------------
// SynthesisEngine trait
// ---------------------------------------------------------------------------

/// Interface the session controller drives.
///
/// `speak`, `pause`, `resume` and `cancel` are requests: they return at once
/// and their effects arrive later as [`EngineEvent`]s.  `speak_blocking` is
/// the only call that waits for synthesis to finish.
pub trait SynthesisEngine: Send {
    /// Current engine state.
    fn state(&self) -> SynthesizerState;

    /// Queue `text` for asynchronous speech on the current output.
    fn speak(&mut self, text: &str) -> Result<UtteranceId, EngineError>;

    /// Synthesise `text` on the current output and wait until it is done.
    fn speak_blocking(&mut self, text: &str) -> Result<(), EngineError>;

    /// Suspend playback of the active utterance.
    fn pause(&mut self);

    /// Continue a paused utterance.
    fn resume(&mut self);

    /// Stop `utterance` if it is still running.
    fn cancel(&mut self, utterance: UtteranceId);

    /// Installed voices.
    fn voices(&mut self) -> Result<Vec<VoiceInfo>, EngineError>;

    /// Select a voice by name or language code.
    ///
    /// # Errors
    ///
    /// [`EngineError::VoiceNotFound`] when no installed voice matches.
    fn select_voice(&mut self, name: &str) -> Result<(), EngineError>;

    /// Go back to the synthesizer's default voice.
    fn clear_voice(&mut self);

    /// Name of the active voice (`"default"` when none was selected).
    fn voice_name(&self) -> String;

    /// Speaking rate in `-10..=10`; `0` is normal speed.
    fn set_rate(&mut self, rate: i32);

    /// Volume in `0..=100`.
    fn set_volume(&mut self, volume: u8);

    /// Route subsequent synthesis to `target`.
    fn set_output(&mut self, target: OutputTarget) -> Result<(), EngineError>;
}

impl<E: SynthesisEngine + ?Sized> SynthesisEngine for Box<E> {
    fn state(&self) -> SynthesizerState {
        (**self).state()
    }

    fn speak(&mut self, text: &str) -> Result<UtteranceId, EngineError> {
        (**self).speak(text)
    }

    fn speak_blocking(&mut self, text: &str) -> Result<(), EngineError> {
        (**self).speak_blocking(text)
    }

    fn pause(&mut self) {
        (**self).pause()
    }

    fn resume(&mut self) {
        (**self).resume()
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        (**self).cancel(utterance)
    }

    fn voices(&mut self) -> Result<Vec<VoiceInfo>, EngineError> {
        (**self).voices()
    }

    fn select_voice(&mut self, name: &str) -> Result<(), EngineError> {
        (**self).select_voice(name)
    }

    fn clear_voice(&mut self) {
        (**self).clear_voice()
    }

    fn voice_name(&self) -> String {
        (**self).voice_name()
    }

    fn set_rate(&mut self, rate: i32) {
        (**self).set_rate(rate)
    }

    fn set_volume(&mut self, volume: u8) {
        (**self).set_volume(volume)
    }

    fn set_output(&mut self, target: OutputTarget) -> Result<(), EngineError> {
        (**self).set_output(target)
    }
}

// Compile-time assertion: Box<dyn SynthesisEngine> must be constructible.
const _: fn() = || {
    fn _assert_object_safe(_: Box<dyn SynthesisEngine>) {}
};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_is_ready() {
        assert_eq!(SynthesizerState::default(), SynthesizerState::Ready);
    }

    #[test]
    fn state_labels() {
        assert_eq!(SynthesizerState::Ready.label(), "Ready");
        assert_eq!(SynthesizerState::Speaking.label(), "Speaking");
        assert_eq!(SynthesizerState::Paused.label(), "Paused");
        assert_eq!(SynthesizerState::Exporting.label(), "Saving");
    }

    #[test]
    fn event_channel_preserves_order() {
        let (tx, mut rx) = event_channel();
        tx.send(EngineEvent::StateChanged(SynthesizerState::Speaking))
            .unwrap();
        tx.send(EngineEvent::Completed {
            utterance: UtteranceId(1),
            outcome: CompletionOutcome::Finished,
        })
        .unwrap();

        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::StateChanged(SynthesizerState::Speaking)
        );
        assert!(matches!(
            rx.try_recv().unwrap(),
            EngineEvent::Completed { utterance: UtteranceId(1), .. }
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn engine_error_display_voice_not_found() {
        let e = EngineError::VoiceNotFound("Zira".into());
        assert!(e.to_string().contains("Zira"));
    }

    #[test]
    fn boxed_mock_engine_is_usable_as_trait_object() {
        let mut engine: Box<dyn SynthesisEngine> = Box::new(MockEngine::new());
        let id = engine.speak("hello").unwrap();
        assert_eq!(engine.state(), SynthesizerState::Speaking);
        engine.cancel(id);
        assert_eq!(engine.state(), SynthesizerState::Ready);
    }

    #[test]
    fn utterance_id_display() {
        assert_eq!(UtteranceId(7).to_string(), "#7");
    }
}
