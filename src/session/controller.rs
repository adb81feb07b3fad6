//! [`SessionController`]: the start / pause / resume / stop state machine.
//!
//! Commands (`toggle`, `stop`, `save_to_file`) come from the UI and the media
//! keys.  Engine notifications come back through [`handle_event`], which the
//! UI calls for every [`EngineEvent`] it drains from the channel.
//!
//! [`handle_event`]: SessionController::handle_event

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::SpeechConfig;
use crate::engine::{
    CompletionOutcome, EngineError, EngineEvent, OutputTarget, SynthesisEngine, SynthesizerState,
    UtteranceId, VoiceInfo,
};

use super::state::{Published, PublishedState, Session, SessionObserver, SessionState};
use super::surface::PresentationSurface;

// ---------------------------------------------------------------------------
// SessionError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("speech engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("the speech engine is busy; stop reading first")]
    Busy,
}

// ---------------------------------------------------------------------------
// SessionController
// ---------------------------------------------------------------------------

/// Owns the engine and the single reading session.
///
/// Lives on the UI thread.  Every method that changes the document
/// selection takes the [`PresentationSurface`] explicitly.
pub struct SessionController {
    engine: Box<dyn SynthesisEngine>,
    speech: SpeechConfig,
    session: Option<Session>,
    published: PublishedState,
    observers: Vec<Box<dyn SessionObserver>>,
}

impl SessionController {
    pub fn new(engine: Box<dyn SynthesisEngine>, speech: SpeechConfig) -> Self {
        Self {
            engine,
            speech,
            session: None,
            published: PublishedState::default(),
            observers: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// Register an observer for every published-field change.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) {
        self.observers.push(observer);
    }

    pub fn published(&self) -> &PublishedState {
        &self.published
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_state(&self) -> SessionState {
        SessionState::derive(self.session.is_some(), self.engine.state())
    }

    pub fn engine_state(&self) -> SynthesizerState {
        self.engine.state()
    }

    /// Name of the voice the engine is using.
    pub fn voice_name(&self) -> String {
        self.engine.voice_name()
    }

    pub fn voices(&mut self) -> Result<Vec<VoiceInfo>, SessionError> {
        Ok(self.engine.voices()?)
    }

    pub fn speech_config(&self) -> &SpeechConfig {
        &self.speech
    }

    /// Replace the voice settings.  They take effect on the next start or
    /// export; a running session keeps its voice.
    pub fn update_speech_config(&mut self, speech: SpeechConfig) {
        self.speech = speech;
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Start, pause or resume depending on what the engine reports.
    pub fn toggle(&mut self, surface: &mut dyn PresentationSurface) -> Result<(), SessionError> {
        match self.engine.state() {
            SynthesizerState::Paused => self.resume(),
            SynthesizerState::Speaking => self.pause(),
            _ => self.start(surface)?,
        }
        Ok(())
    }

    /// Read the document from the cursor to the end.
    ///
    /// An unset or out-of-range cursor is moved to 0 first.  If nothing but
    /// whitespace follows the cursor this is a no-op.
    pub fn start(&mut self, surface: &mut dyn PresentationSurface) -> Result<(), SessionError> {
        let len = surface.document_text().chars().count();
        let base = match surface.selection_start() {
            Some(start) if start < len => start,
            _ => {
                surface.set_selection_start(0);
                0
            }
        };

        let text: String = surface.document_text().chars().skip(base).collect();
        if text.trim().is_empty() {
            log::debug!("session: nothing to read from offset {base}");
            return Ok(());
        }

        if let Some(previous) = self.session.take() {
            self.engine.cancel(previous.utterance);
        }

        self.apply_speech_config();
        let utterance = match self.begin_utterance(&text) {
            Ok(utterance) => utterance,
            Err(e) => {
                log::warn!("session: start failed: {e}");
                self.publish(Published::MaxCharacters(0));
                self.reset(surface);
                return Err(e.into());
            }
        };

        let session = Session {
            utterance,
            text,
            base,
        };
        log::debug!(
            "session: started {utterance} at offset {base} ({} chars)",
            session.max_characters()
        );
        self.publish(Published::CurrentWord(String::new()));
        self.publish(Published::CharacterIndex(0));
        self.publish(Published::MaxCharacters(session.max_characters()));
        self.session = Some(session);
        self.sync_state();
        Ok(())
    }

    pub fn pause(&mut self) {
        if self.session.is_none() {
            return;
        }
        log::debug!("session: pause");
        self.engine.pause();
        self.sync_state();
    }

    pub fn resume(&mut self) {
        if self.session.is_none() {
            return;
        }
        log::debug!("session: resume");
        self.engine.resume();
        self.sync_state();
    }

    /// Cancel any utterance and put the cursor back at the document start.
    pub fn stop(&mut self, surface: &mut dyn PresentationSurface) {
        if let Some(session) = self.session.take() {
            log::debug!("session: stop {}", session.utterance);
            self.engine.cancel(session.utterance);
        }
        self.reset(surface);
    }

    /// Synthesize the whole document into `{label}_{voice}.wav` under `dir`.
    ///
    /// Blocks until the file is written.  Output is routed back to the audio
    /// device whether or not synthesis succeeded.
    pub fn save_to_file(
        &mut self,
        label: &str,
        dir: &Path,
        surface: &dyn PresentationSurface,
    ) -> Result<PathBuf, SessionError> {
        if self.session.is_some() || self.engine.state() != SynthesizerState::Ready {
            return Err(SessionError::Busy);
        }

        self.apply_speech_config();
        let path = dir.join(export_file_name(label, &self.engine.voice_name()));
        log::info!("session: exporting to {}", path.display());

        self.engine.set_output(OutputTarget::File(path.clone()))?;
        let spoken = self.engine.speak_blocking(surface.document_text());
        let restored = self.engine.set_output(OutputTarget::DefaultDevice);
        self.sync_state();

        spoken?;
        restored?;
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // Engine notifications
    // -----------------------------------------------------------------------

    /// Apply one engine notification.
    ///
    /// Returns the outcome when the active session's utterance completed.
    pub fn handle_event(
        &mut self,
        event: EngineEvent,
        surface: &mut dyn PresentationSurface,
    ) -> Option<CompletionOutcome> {
        match event {
            EngineEvent::Progress {
                utterance,
                text,
                offset,
            } => {
                self.on_progress(utterance, text, offset, surface);
                None
            }
            EngineEvent::StateChanged(state) => {
                self.publish(Published::State(state));
                None
            }
            EngineEvent::Completed { utterance, outcome } => {
                self.on_completed(utterance, outcome, surface)
            }
        }
    }

    fn on_progress(
        &mut self,
        utterance: UtteranceId,
        word: String,
        offset: usize,
        surface: &mut dyn PresentationSurface,
    ) {
        let Some(session) = self.active(utterance) else {
            log::trace!("session: ignoring progress from {utterance}");
            return;
        };
        let start = session.absolute(offset);
        let len = word.chars().count();

        self.publish(Published::CurrentWord(word));
        self.publish(Published::CharacterIndex(start + len));
        surface.select(start, len);
    }

    fn on_completed(
        &mut self,
        utterance: UtteranceId,
        outcome: CompletionOutcome,
        surface: &mut dyn PresentationSurface,
    ) -> Option<CompletionOutcome> {
        self.active(utterance)?;
        self.session = None;
        match &outcome {
            CompletionOutcome::Failed(message) => {
                log::warn!("session: {utterance} failed: {message}")
            }
            other => log::debug!("session: {utterance} completed ({other:?})"),
        }
        self.reset(surface);
        Some(outcome)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn active(&self, utterance: UtteranceId) -> Option<&Session> {
        self.session
            .as_ref()
            .filter(|session| session.utterance == utterance)
    }

    fn begin_utterance(&mut self, text: &str) -> Result<UtteranceId, EngineError> {
        self.engine.set_output(OutputTarget::DefaultDevice)?;
        self.engine.speak(text)
    }

    fn apply_speech_config(&mut self) {
        match self.speech.voice.as_deref() {
            Some(voice) => {
                if let Err(e) = self.engine.select_voice(voice) {
                    log::warn!("session: {e}; using {}", self.engine.voice_name());
                }
            }
            None => self.engine.clear_voice(),
        }
        self.engine.set_rate(self.speech.rate);
        self.engine.set_volume(self.speech.volume);
    }

    fn reset(&mut self, surface: &mut dyn PresentationSurface) {
        self.publish(Published::CurrentWord(String::new()));
        self.publish(Published::CharacterIndex(0));
        surface.reset_selection();
        surface.focus_start_control();
        self.sync_state();
    }

    fn sync_state(&mut self) {
        let state = self.engine.state();
        self.publish(Published::State(state));
    }

    fn publish(&mut self, change: Published) {
        if !self.published.apply(&change) {
            return;
        }
        for observer in &mut self.observers {
            observer.published(&change);
        }
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.engine.cancel(session.utterance);
        }
    }
}

// ---------------------------------------------------------------------------
// File naming
// ---------------------------------------------------------------------------

/// `{label}_{voice}.wav`, with path separators and `:` replaced by `_`.
///
/// A blank label falls back to `speech`.
pub fn export_file_name(label: &str, voice: &str) -> String {
    let label = match label.trim() {
        "" => "speech",
        trimmed => trimmed,
    };
    format!("{}_{}.wav", sanitize(label), sanitize(voice.trim()))
}

fn sanitize(part: &str) -> String {
    part.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
