//! Playback worker: plays one synthesised utterance through `rodio` and
//! reports word progress.
//!
//! Each call to [`spawn_worker`] owns a dedicated OS thread.  The thread
//! synthesises the WAV, opens its own output stream (the stream handle is
//! `!Send`, so it never leaves the thread) and polls a
//! [`PlaybackControl`] every [`POLL_INTERVAL`] to honour pause and cancel
//! requests made from the UI thread.

use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use rodio::{Decoder, OutputStream, Sink};

use super::timeline::WordTimeline;
use super::{
    CompletionOutcome, EngineError, EngineEvent, EventSender, SynthesizerState, UtteranceId,
};

/// How often the worker checks its control flags and the word schedule.
pub const POLL_INTERVAL: Duration = Duration::from_millis(15);

// ---------------------------------------------------------------------------
// EngineStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct StatusInner {
    state: SynthesizerState,
    active: Option<UtteranceId>,
}

/// Engine state shared between the engine handle and its workers.
///
/// Every transition goes through this type so that the state and the
/// `StateChanged` event are always emitted together, in order.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    inner: Arc<Mutex<StatusInner>>,
    events: EventSender,
}

impl EngineStatus {
    pub fn new(events: EventSender) -> Self {
        Self {
            inner: Arc::new(Mutex::new(StatusInner::default())),
            events,
        }
    }

    pub fn state(&self) -> SynthesizerState {
        self.lock().state
    }

    pub fn active(&self) -> Option<UtteranceId> {
        self.lock().active
    }

    pub fn send(&self, event: EngineEvent) {
        // The receiver only disappears during shutdown.
        let _ = self.events.send(event);
    }

    /// Mark `utterance` as the active one and enter `Speaking`.
    pub fn begin(&self, utterance: UtteranceId) {
        let mut inner = self.lock();
        inner.active = Some(utterance);
        self.transition(&mut inner, SynthesizerState::Speaking);
    }

    /// Move from `from` to `to`; does nothing in any other state.
    pub fn switch(&self, from: SynthesizerState, to: SynthesizerState) -> bool {
        let mut inner = self.lock();
        if inner.state != from {
            return false;
        }
        self.transition(&mut inner, to);
        true
    }

    /// Return to `Ready` if `utterance` is still the active one.
    ///
    /// A cancelled worker that winds down after a newer utterance started
    /// must not reset the newer one's state.
    pub fn finish(&self, utterance: UtteranceId) {
        let mut inner = self.lock();
        if inner.active != Some(utterance) {
            return;
        }
        inner.active = None;
        self.transition(&mut inner, SynthesizerState::Ready);
    }

    /// Unconditionally set `state` (used around blocking exports).
    pub fn set(&self, state: SynthesizerState) {
        let mut inner = self.lock();
        self.transition(&mut inner, state);
    }

    fn transition(&self, inner: &mut StatusInner, state: SynthesizerState) {
        if inner.state == state {
            return;
        }
        log::debug!("engine: {:?} → {:?}", inner.state, state);
        inner.state = state;
        self.send(EngineEvent::StateChanged(state));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatusInner> {
        // A poisoned lock only means a worker panicked mid-update; the
        // plain-data state is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

// ---------------------------------------------------------------------------
// PlaybackControl
// ---------------------------------------------------------------------------

/// Flags the UI thread flips and the worker polls.
#[derive(Debug, Default)]
pub struct PlaybackControl {
    paused: AtomicBool,
    cancelled: AtomicBool,
}

impl PlaybackControl {
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Relaxed)
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Playback clock
// ---------------------------------------------------------------------------

/// Elapsed playback time that stands still while paused.
#[derive(Debug)]
struct PlaybackClock {
    started: Instant,
    paused_at: Option<Instant>,
    paused_total: Duration,
}

impl PlaybackClock {
    fn start() -> Self {
        Self {
            started: Instant::now(),
            paused_at: None,
            paused_total: Duration::ZERO,
        }
    }

    fn pause(&mut self) {
        if self.paused_at.is_none() {
            self.paused_at = Some(Instant::now());
        }
    }

    fn resume(&mut self) {
        if let Some(at) = self.paused_at.take() {
            self.paused_total += at.elapsed();
        }
    }

    fn elapsed(&self) -> Duration {
        let now = self.paused_at.unwrap_or_else(Instant::now);
        now.duration_since(self.started)
            .saturating_sub(self.paused_total)
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

/// A synthesised utterance ready for playback.
pub struct RenderedAudio {
    pub wav: Vec<u8>,
    pub duration: Duration,
}

impl RenderedAudio {
    /// Read a WAV file produced by the synthesizer.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let wav = std::fs::read(path)?;
        let duration = wav_duration(&wav)?;
        Ok(Self { wav, duration })
    }
}

/// Length of a WAV buffer, from its header.
pub fn wav_duration(wav: &[u8]) -> Result<Duration, EngineError> {
    let reader =
        hound::WavReader::new(Cursor::new(wav)).map_err(|e| EngineError::Decode(e.to_string()))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(EngineError::Decode("sample rate is zero".into()));
    }
    Ok(Duration::from_secs_f64(
        reader.duration() as f64 / spec.sample_rate as f64,
    ))
}

/// Spawn the worker thread for `utterance`.
///
/// `render` runs on the worker and produces the audio.  The worker then
/// plays it, emitting `Progress` for each word and finally `Completed`.
/// A render that yields `None` (output routed to a file) completes without
/// playback.
pub fn spawn_worker<F>(
    utterance: UtteranceId,
    text: String,
    status: EngineStatus,
    control: Arc<PlaybackControl>,
    render: F,
) -> std::io::Result<()>
where
    F: FnOnce() -> Result<Option<RenderedAudio>, EngineError> + Send + 'static,
{
    std::thread::Builder::new()
        .name(format!("speech-{}", utterance.0))
        .spawn(move || {
            let outcome = match render().and_then(|audio| match audio {
                Some(audio) => play(utterance, &text, audio, &status, &control),
                None => Ok(CompletionOutcome::Finished),
            }) {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("engine: utterance {utterance} failed: {e}");
                    CompletionOutcome::Failed(e.to_string())
                }
            };

            log::debug!("engine: utterance {utterance} ended ({outcome:?})");
            status.finish(utterance);
            status.send(EngineEvent::Completed { utterance, outcome });
        })
        .map(|_| ())
}

/// Play `audio` on the calling thread until it ends or `control` cancels it.
pub fn play(
    utterance: UtteranceId,
    text: &str,
    audio: RenderedAudio,
    status: &EngineStatus,
    control: &PlaybackControl,
) -> Result<CompletionOutcome, EngineError> {
    if control.is_cancelled() {
        return Ok(CompletionOutcome::Cancelled);
    }

    let (_stream, handle) =
        OutputStream::try_default().map_err(|e| EngineError::Device(e.to_string()))?;
    let sink = Sink::try_new(&handle).map_err(|e| EngineError::Device(e.to_string()))?;
    let source =
        Decoder::new(Cursor::new(audio.wav)).map_err(|e| EngineError::Decode(e.to_string()))?;

    let mut timeline = WordTimeline::build(text, audio.duration);
    let mut clock = PlaybackClock::start();

    sink.append(source);

    loop {
        if control.is_cancelled() {
            sink.stop();
            return Ok(CompletionOutcome::Cancelled);
        }

        let want_paused = control.is_paused();
        if want_paused != sink.is_paused() {
            if want_paused {
                sink.pause();
                clock.pause();
            } else {
                sink.play();
                clock.resume();
            }
        }

        if !want_paused {
            for word in timeline.due(clock.elapsed()) {
                status.send(EngineEvent::Progress {
                    utterance,
                    text: word.text.clone(),
                    offset: word.offset,
                });
            }
        }

        if sink.empty() {
            return Ok(CompletionOutcome::Finished);
        }

        std::thread::sleep(POLL_INTERVAL);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::event_channel;

    fn silent_wav(samples: u32, sample_rate: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..samples {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn wav_duration_reads_header() {
        let wav = silent_wav(22_050, 22_050);
        assert_eq!(wav_duration(&wav).unwrap(), Duration::from_secs(1));
    }

    #[test]
    fn wav_duration_rejects_garbage() {
        let err = wav_duration(b"not a wav").unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
    }

    #[test]
    fn rendered_audio_loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("utterance.wav");
        std::fs::write(&path, silent_wav(11_025, 22_050)).unwrap();

        let audio = RenderedAudio::load(&path).unwrap();
        assert_eq!(audio.duration, Duration::from_millis(500));
    }

    #[test]
    fn status_begin_emits_speaking() {
        let (tx, mut rx) = event_channel();
        let status = EngineStatus::new(tx);

        status.begin(UtteranceId(1));

        assert_eq!(status.state(), SynthesizerState::Speaking);
        assert_eq!(status.active(), Some(UtteranceId(1)));
        assert_eq!(
            rx.try_recv().unwrap(),
            EngineEvent::StateChanged(SynthesizerState::Speaking)
        );
    }

    #[test]
    fn status_switch_only_from_matching_state() {
        let (tx, _rx) = event_channel();
        let status = EngineStatus::new(tx);

        assert!(!status.switch(SynthesizerState::Speaking, SynthesizerState::Paused));
        assert_eq!(status.state(), SynthesizerState::Ready);

        status.begin(UtteranceId(1));
        assert!(status.switch(SynthesizerState::Speaking, SynthesizerState::Paused));
        assert_eq!(status.state(), SynthesizerState::Paused);
    }

    #[test]
    fn stale_finish_does_not_reset_newer_utterance() {
        let (tx, _rx) = event_channel();
        let status = EngineStatus::new(tx);

        status.begin(UtteranceId(1));
        status.begin(UtteranceId(2));
        status.finish(UtteranceId(1));

        assert_eq!(status.state(), SynthesizerState::Speaking);
        assert_eq!(status.active(), Some(UtteranceId(2)));

        status.finish(UtteranceId(2));
        assert_eq!(status.state(), SynthesizerState::Ready);
        assert_eq!(status.active(), None);
    }

    #[test]
    fn repeated_transition_emits_once() {
        let (tx, mut rx) = event_channel();
        let status = EngineStatus::new(tx);

        status.set(SynthesizerState::Exporting);
        status.set(SynthesizerState::Exporting);

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn clock_stands_still_while_paused() {
        let mut clock = PlaybackClock::start();
        clock.pause();
        let frozen = clock.elapsed();
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(clock.elapsed(), frozen);
        clock.resume();
        assert!(clock.elapsed() >= frozen);
    }

    #[test]
    fn control_flags() {
        let control = PlaybackControl::default();
        assert!(!control.is_paused());
        assert!(!control.is_cancelled());
        control.set_paused(true);
        control.cancel();
        assert!(control.is_paused());
        assert!(control.is_cancelled());
    }

    #[test]
    fn failed_render_reports_failure_and_returns_to_ready() {
        let (tx, mut rx) = event_channel();
        let status = EngineStatus::new(tx);
        let control = Arc::new(PlaybackControl::default());
        status.begin(UtteranceId(3));
        let _ = rx.try_recv();

        spawn_worker(
            UtteranceId(3),
            "hi".into(),
            status.clone(),
            control,
            || Err(EngineError::Decode("boom".into())),
        )
        .unwrap();

        let first = rx.blocking_recv().unwrap();
        assert_eq!(first, EngineEvent::StateChanged(SynthesizerState::Ready));
        match rx.blocking_recv().unwrap() {
            EngineEvent::Completed { utterance, outcome } => {
                assert_eq!(utterance, UtteranceId(3));
                assert!(matches!(outcome, CompletionOutcome::Failed(msg) if msg.contains("boom")));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn cancelled_before_playback_skips_audio_device() {
        let (tx, mut rx) = event_channel();
        let status = EngineStatus::new(tx);
        let control = Arc::new(PlaybackControl::default());
        control.cancel();
        status.begin(UtteranceId(4));
        let _ = rx.try_recv();

        let wav = silent_wav(100, 22_050);
        spawn_worker(UtteranceId(4), "hi".into(), status, control, move || {
            let duration = wav_duration(&wav)?;
            Ok(Some(RenderedAudio { wav, duration }))
        })
        .unwrap();

        let _ready = rx.blocking_recv().unwrap();
        assert_eq!(
            rx.blocking_recv().unwrap(),
            EngineEvent::Completed {
                utterance: UtteranceId(4),
                outcome: CompletionOutcome::Cancelled,
            }
        );
    }
}
