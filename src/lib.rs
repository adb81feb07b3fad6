//! TTS Reader: reads a document aloud with espeak-ng, highlighting each
//! word as it is spoken.

pub mod app;
pub mod config;
pub mod engine;
pub mod hotkey;
pub mod session;
pub mod welcome;
