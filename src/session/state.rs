//! Session data and the state the controller publishes to the UI.
//!
//! [`PublishedState`] holds the four observable fields.  Every change to one
//! of them is reported to subscribed [`SessionObserver`]s as a [`Published`]
//! value; writing a field's current value again is not a change.

use crate::engine::{SynthesizerState, UtteranceId};

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Lifecycle of the interactive reading session.
///
/// ```text
/// Idle ──start──▶ Speaking ──pause──▶ Paused
///  ▲                │  ▲                │
///  │                │  └────resume──────┘
///  └──stop/complete─┴───────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    Speaking,
    Paused,
}

impl SessionState {
    /// Derive the session state from whether a session exists and what the
    /// engine last reported.
    pub fn derive(has_session: bool, engine: SynthesizerState) -> Self {
        match (has_session, engine) {
            (false, _) => SessionState::Idle,
            (true, SynthesizerState::Paused) => SessionState::Paused,
            (true, _) => SessionState::Speaking,
        }
    }

    /// Caption for the single start/pause/resume control.
    pub fn toggle_label(&self) -> &'static str {
        match self {
            SessionState::Idle => "Start",
            SessionState::Speaking => "Pause",
            SessionState::Paused => "Resume",
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// The active reading task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    /// Handle of the utterance the engine is speaking.
    pub utterance: UtteranceId,
    /// Text submitted to the engine: the document from `base` to the end.
    pub text: String,
    /// Char index in the document where the utterance starts.
    pub base: usize,
}

impl Session {
    /// Length of the utterance text in chars.
    pub fn max_characters(&self) -> usize {
        self.text.chars().count()
    }

    /// Map an utterance-relative char offset onto the document.
    pub fn absolute(&self, offset: usize) -> usize {
        self.base + offset
    }
}

// ---------------------------------------------------------------------------
// Published state
// ---------------------------------------------------------------------------

/// One change to an observable field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Published {
    State(SynthesizerState),
    CurrentWord(String),
    CharacterIndex(usize),
    MaxCharacters(usize),
}

/// Snapshot of everything the UI binds to.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublishedState {
    /// Engine state as last reported.
    pub state: SynthesizerState,
    /// Word being spoken; empty when idle.
    pub current_word: String,
    /// Document-absolute char index just past the current word.
    pub character_index: usize,
    /// Char length of the text passed to the engine.
    pub max_characters: usize,
}

impl PublishedState {
    /// Apply `change`, returning `true` if the field actually changed.
    pub fn apply(&mut self, change: &Published) -> bool {
        match change {
            Published::State(state) => replace(&mut self.state, *state),
            Published::CurrentWord(word) => replace(&mut self.current_word, word.clone()),
            Published::CharacterIndex(index) => replace(&mut self.character_index, *index),
            Published::MaxCharacters(max) => replace(&mut self.max_characters, *max),
        }
    }

    /// Reading progress in `0.0..=1.0`, relative to where the session began.
    pub fn progress(&self, base: usize) -> f32 {
        if self.max_characters == 0 {
            return 0.0;
        }
        let read = self.character_index.saturating_sub(base);
        (read as f32 / self.max_characters as f32).clamp(0.0, 1.0)
    }
}

fn replace<T: PartialEq>(field: &mut T, value: T) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    true
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Subscriber to published-field changes.
pub trait SessionObserver {
    fn published(&mut self, change: &Published);
}

/// Writes every change to the `trace` log.
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl SessionObserver for LoggingObserver {
    fn published(&mut self, change: &Published) {
        log::trace!("session: published {change:?}");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
