//! Playback session controller.
//!
//! # Architecture
//!
//! ```text
//! toggle / stop / media keys
//!        │
//!        ▼
//! SessionController ──speak/pause/resume/cancel──▶ SynthesisEngine
//!        ▲                                             │
//!        └──────────── EngineEvent (mpsc) ─────────────┘
//!        │
//!        ├─ PresentationSurface::select(start, len)   (highlight)
//!        └─ SessionObserver::published(change)        (state, word, index, max)
//! ```
//!
//! The controller is owned by the UI thread and never locks.  It converts
//! the engine's utterance-relative offsets into document-absolute ones by
//! adding the session's start offset.

pub mod controller;
pub mod state;
pub mod surface;

// ---------------------------------------------------------------------------
// Public re-exports
// ---------------------------------------------------------------------------

pub use controller::{export_file_name, SessionController, SessionError};
pub use state::{
    LoggingObserver, Published, PublishedState, Session, SessionObserver, SessionState,
};
pub use surface::PresentationSurface;

#[cfg(test)]
pub use surface::RecordingSurface;
