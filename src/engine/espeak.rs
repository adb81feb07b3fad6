//! [`SynthesisEngine`] backed by the `espeak-ng` command-line synthesizer.
//!
//! Every utterance is rendered to a temporary WAV file with
//! `espeak-ng -w <file>` (text on stdin) and then handed to a playback
//! worker.  Export to a file uses the same invocation with the target path.

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::sync::Arc;

use super::playback::{self, EngineStatus, PlaybackControl, RenderedAudio};
use super::{
    EngineError, EventSender, OutputTarget, SynthesisEngine, SynthesizerState, UtteranceId,
};

/// espeak-ng's default speed in words per minute.
const BASE_WPM: f32 = 175.0;
const MIN_WPM: f32 = 80.0;
const MAX_WPM: f32 = 450.0;

// ---------------------------------------------------------------------------
// VoiceInfo
// ---------------------------------------------------------------------------

/// An installed voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    /// Display name, e.g. `"English_(Great_Britain)"`.
    pub name: String,
    /// Language code passed to `-v`, e.g. `"en-gb"`.
    pub language: String,
}

impl VoiceInfo {
    fn matches(&self, query: &str) -> bool {
        self.name.eq_ignore_ascii_case(query) || self.language.eq_ignore_ascii_case(query)
    }
}

/// Parse the table printed by `espeak-ng --voices`.
///
/// ```text
/// Pty Language       Age/Gender VoiceName          File                 Other Languages
///  5  af              --/M      Afrikaans          gmw/af
///  2  en-gb           --/M      English_(Great_Britain) gmw/en
/// ```
pub fn parse_voice_list(output: &str) -> Vec<VoiceInfo> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut columns = line.split_whitespace();
            let _priority = columns.next()?;
            let language = columns.next()?;
            let _age_gender = columns.next()?;
            let name = columns.next()?;
            Some(VoiceInfo {
                name: name.to_string(),
                language: language.to_string(),
            })
        })
        .collect()
}

/// Map a `-10..=10` rate onto espeak words per minute.
///
/// `+10` is three times normal speed and `-10` a third of it.
pub fn rate_to_wpm(rate: i32) -> u32 {
    let rate = rate.clamp(-10, 10) as f32;
    (BASE_WPM * 3f32.powf(rate / 10.0))
        .clamp(MIN_WPM, MAX_WPM)
        .round() as u32
}

// ---------------------------------------------------------------------------
// Voice parameters
// ---------------------------------------------------------------------------

/// Settings captured for one espeak-ng invocation.
#[derive(Debug, Clone)]
struct Invocation {
    program: String,
    voice: Option<String>,
    wpm: u32,
    amplitude: u8,
}

impl Invocation {
    fn command(&self, output: &Path) -> Command {
        let mut command = Command::new(&self.program);
        command.arg("-w").arg(output);
        if let Some(voice) = &self.voice {
            command.arg("-v").arg(voice);
        }
        command
            .arg("-s")
            .arg(self.wpm.to_string())
            .arg("-a")
            .arg(self.amplitude.to_string());
        command
    }

    /// Run espeak-ng, writing `text` as WAV to `output`.
    fn render_to(&self, text: &str, output: &Path) -> Result<(), EngineError> {
        let mut child = self
            .command(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(text.as_bytes())?;
        }

        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(EngineError::Process {
                status: output.status.code().unwrap_or_default(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// Render `text` into a temporary file and load it for playback.
    fn render(&self, text: &str) -> Result<RenderedAudio, EngineError> {
        let file = tempfile::Builder::new()
            .prefix("tts-reader-")
            .suffix(".wav")
            .tempfile()?;
        self.render_to(text, file.path())?;
        RenderedAudio::load(file.path())
    }
}

// ---------------------------------------------------------------------------
// EspeakEngine
// ---------------------------------------------------------------------------

/// Production engine.  Construct with [`EspeakEngine::new`].
pub struct EspeakEngine {
    program: String,
    voice: Option<VoiceInfo>,
    voices: Option<Vec<VoiceInfo>>,
    rate: i32,
    volume: u8,
    output: OutputTarget,
    status: EngineStatus,
    current: Option<(UtteranceId, Arc<PlaybackControl>)>,
    next_id: u64,
}

impl std::fmt::Debug for EspeakEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EspeakEngine")
            .field("program", &self.program)
            .field("voice", &self.voice)
            .field("rate", &self.rate)
            .field("volume", &self.volume)
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

impl EspeakEngine {
    /// Create an engine that runs `program` and reports on `events`.
    ///
    /// Nothing is spawned until the first call that needs the synthesizer.
    pub fn new(program: impl Into<String>, events: EventSender) -> Self {
        Self {
            program: program.into(),
            voice: None,
            voices: None,
            rate: 0,
            volume: 100,
            output: OutputTarget::DefaultDevice,
            status: EngineStatus::new(events),
            current: None,
            next_id: 1,
        }
    }

    fn invocation(&self) -> Invocation {
        Invocation {
            program: self.program.clone(),
            voice: self.voice.as_ref().map(|v| v.language.clone()),
            wpm: rate_to_wpm(self.rate),
            amplitude: self.volume,
        }
    }

    fn query_voices(&self) -> Result<Vec<VoiceInfo>, EngineError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .output()
            .map_err(|source| EngineError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        if !output.status.success() {
            return Err(EngineError::Process {
                status: output.status.code().unwrap_or_default(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    fn control_for_active(&self) -> Option<&Arc<PlaybackControl>> {
        let active = self.status.active()?;
        self.current
            .as_ref()
            .filter(|(id, _)| *id == active)
            .map(|(_, control)| control)
    }
}

impl SynthesisEngine for EspeakEngine {
    fn state(&self) -> SynthesizerState {
        self.status.state()
    }

    fn speak(&mut self, text: &str) -> Result<UtteranceId, EngineError> {
        if let Some((previous, control)) = self.current.take() {
            log::debug!("engine: superseding utterance {previous}");
            control.cancel();
        }

        let id = UtteranceId(self.next_id);
        self.next_id += 1;

        let control = Arc::new(PlaybackControl::default());
        let invocation = self.invocation();
        let target = self.output.clone();
        let owned = text.to_string();

        self.status.begin(id);
        let spawned = match target {
            OutputTarget::DefaultDevice => playback::spawn_worker(
                id,
                owned.clone(),
                self.status.clone(),
                Arc::clone(&control),
                move || invocation.render(&owned).map(Some),
            ),
            OutputTarget::File(path) => playback::spawn_worker(
                id,
                owned.clone(),
                self.status.clone(),
                Arc::clone(&control),
                move || {
                    // File output has no live audio to play.
                    invocation.render_to(&owned, &path)?;
                    Ok(None)
                },
            ),
        };

        if let Err(e) = spawned {
            self.status.finish(id);
            return Err(EngineError::Io(e));
        }

        log::info!("engine: speaking utterance {id} ({} chars)", text.chars().count());
        self.current = Some((id, control));
        Ok(id)
    }

    fn speak_blocking(&mut self, text: &str) -> Result<(), EngineError> {
        let invocation = self.invocation();
        match self.output.clone() {
            OutputTarget::File(path) => {
                log::info!("engine: writing speech to {}", path.display());
                self.status.set(SynthesizerState::Exporting);
                let result = invocation.render_to(text, &path);
                self.status.set(SynthesizerState::Ready);
                result
            }
            OutputTarget::DefaultDevice => {
                let id = UtteranceId(self.next_id);
                self.next_id += 1;
                let control = PlaybackControl::default();

                self.status.set(SynthesizerState::Speaking);
                let result = invocation.render(text).and_then(|audio| {
                    playback::play(id, text, audio, &self.status, &control).map(|_| ())
                });
                self.status.set(SynthesizerState::Ready);
                result
            }
        }
    }

    fn pause(&mut self) {
        if let Some(control) = self.control_for_active() {
            control.set_paused(true);
            self.status
                .switch(SynthesizerState::Speaking, SynthesizerState::Paused);
        }
    }

    fn resume(&mut self) {
        if let Some(control) = self.control_for_active() {
            control.set_paused(false);
            self.status
                .switch(SynthesizerState::Paused, SynthesizerState::Speaking);
        }
    }

    fn cancel(&mut self, utterance: UtteranceId) {
        match &self.current {
            Some((id, control)) if *id == utterance => {
                log::debug!("engine: cancelling utterance {utterance}");
                control.cancel();
                self.current = None;
                self.status.finish(utterance);
            }
            _ => log::debug!("engine: cancel for finished utterance {utterance} ignored"),
        }
    }

    fn voices(&mut self) -> Result<Vec<VoiceInfo>, EngineError> {
        if let Some(voices) = &self.voices {
            return Ok(voices.clone());
        }
        let voices = self.query_voices()?;
        log::info!("engine: {} voices installed", voices.len());
        self.voices = Some(voices.clone());
        Ok(voices)
    }

    fn select_voice(&mut self, name: &str) -> Result<(), EngineError> {
        let voice = self
            .voices()?
            .into_iter()
            .find(|v| v.matches(name))
            .ok_or_else(|| EngineError::VoiceNotFound(name.to_string()))?;
        self.voice = Some(voice);
        Ok(())
    }

    fn clear_voice(&mut self) {
        self.voice = None;
    }

    fn voice_name(&self) -> String {
        self.voice
            .as_ref()
            .map(|v| v.name.clone())
            .unwrap_or_else(|| "default".to_string())
    }

    fn set_rate(&mut self, rate: i32) {
        self.rate = rate.clamp(-10, 10);
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume.min(100);
    }

    fn set_output(&mut self, target: OutputTarget) -> Result<(), EngineError> {
        if let OutputTarget::File(path) = &target {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.output = target;
        Ok(())
    }
}

/// Path of the synthesizer program to use, honouring `TTS_READER_ESPEAK`.
pub fn resolve_program(configured: &str) -> String {
    std::env::var("TTS_READER_ESPEAK")
        .ok()
        .filter(|p| !p.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
