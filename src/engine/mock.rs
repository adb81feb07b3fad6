//! Test double for [`SynthesisEngine`].
//!
//! [`MockEngine`] records every call into a shared log so a test can hand the
//! engine to a controller and still inspect what happened.  State changes are
//! synchronous and no events are emitted; tests feed [`EngineEvent`]s to the
//! controller themselves.
//!
//! [`EngineEvent`]: super::EngineEvent

use std::sync::{Arc, Mutex};

use super::{
    EngineError, OutputTarget, SynthesisEngine, SynthesizerState, UtteranceId, VoiceInfo,
};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Speak(String),
    SpeakBlocking { text: String, output: OutputTarget },
    Pause,
    Resume,
    Cancel(UtteranceId),
    SelectVoice(String),
    ClearVoice,
    SetRate(i32),
    SetVolume(u8),
    SetOutput(OutputTarget),
}

#[derive(Debug, Default)]
struct MockInner {
    calls: Vec<EngineCall>,
    state: SynthesizerState,
    output: OutputTarget,
    voice: Option<String>,
    fail_blocking: bool,
    fail_speak: bool,
    next_id: u64,
}

/// Scriptable in-memory engine.  Clones share the same log and state.
#[derive(Debug, Clone, Default)]
pub struct MockEngine {
    inner: Arc<Mutex<MockInner>>,
    voices: Vec<VoiceInfo>,
}

impl MockEngine {
    /// An engine with two voices: `Alpha` (`en`) and `Beta` (`es`).
    pub fn new() -> Self {
        Self {
            inner: Arc::default(),
            voices: vec![
                VoiceInfo {
                    name: "Alpha".into(),
                    language: "en".into(),
                },
                VoiceInfo {
                    name: "Beta".into(),
                    language: "es".into(),
                },
            ],
        }
    }

    /// Make every `speak_blocking` call fail.
    pub fn failing_export(self) -> Self {
        self.inner.lock().unwrap().fail_blocking = true;
        self
    }

    /// Make later `speak` calls fail (or succeed again).
    pub fn set_speak_failure(&self, fail: bool) {
        self.inner.lock().unwrap().fail_speak = fail;
    }

    /// All calls so far.
    pub fn calls(&self) -> Vec<EngineCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Texts passed to [`SynthesisEngine::speak`].
    pub fn spoken(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                EngineCall::Speak(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    /// Current output route.
    pub fn output(&self) -> OutputTarget {
        self.inner.lock().unwrap().output.clone()
    }

    /// Force the reported state.
    pub fn set_state(&self, state: SynthesizerState) {
        self.inner.lock().unwrap().state = state;
    }

    fn record(&self, call: EngineCall) {
        self.inner.lock().unwrap().calls.push(call);
    }
}

impl SynthesisEngine for MockEngine {
    fn state(&self) -> SynthesizerState {
        self.inner.lock().unwrap().state
    }

    fn speak(&mut self, text: &str) -> Result<UtteranceId, EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Speak(text.to_string()));
        if inner.fail_speak {
            return Err(EngineError::Device("mock device unavailable".into()));
        }
        inner.next_id += 1;
        inner.state = SynthesizerState::Speaking;
        Ok(UtteranceId(inner.next_id))
    }

    fn speak_blocking(&mut self, text: &str) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        let output = inner.output.clone();
        inner.calls.push(EngineCall::SpeakBlocking {
            text: text.to_string(),
            output,
        });
        if inner.fail_blocking {
            return Err(EngineError::Process {
                status: 1,
                stderr: "mock export failure".into(),
            });
        }
        Ok(())
    }

    fn pause(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Pause);
        if inner.state == SynthesizerState::Speaking {
            inner.state = SynthesizerState::Paused;
        }
    }

    fn resume(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Resume);
        if inner.state == SynthesizerState::Paused {
            inner.state = SynthesizerState::Speaking;
        }
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::Cancel(utterance));
        inner.state = SynthesizerState::Ready;
    }

    fn voices(&mut self) -> Result<Vec<VoiceInfo>, EngineError> {
        Ok(self.voices.clone())
    }

    fn select_voice(&mut self, name: &str) -> Result<(), EngineError> {
        self.record(EngineCall::SelectVoice(name.to_string()));
        let voice = self
            .voices
            .iter()
            .find(|v| v.name == name || v.language == name)
            .ok_or_else(|| EngineError::VoiceNotFound(name.to_string()))?;
        self.inner.lock().unwrap().voice = Some(voice.name.clone());
        Ok(())
    }

    fn clear_voice(&mut self) {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::ClearVoice);
        inner.voice = None;
    }

    fn voice_name(&self) -> String {
        self.inner
            .lock()
            .unwrap()
            .voice
            .clone()
            .unwrap_or_else(|| "default".into())
    }

    fn set_rate(&mut self, rate: i32) {
        self.record(EngineCall::SetRate(rate));
    }

    fn set_volume(&mut self, volume: u8) {
        self.record(EngineCall::SetVolume(volume));
    }

    fn set_output(&mut self, target: OutputTarget) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(EngineCall::SetOutput(target.clone()));
        inner.output = target;
        Ok(())
    }
}
