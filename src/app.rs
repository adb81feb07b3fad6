//! TTS Reader window: egui/eframe application.
//!
//! # Architecture
//!
//! [`ReaderApp`] is the top-level [`eframe::App`].  It owns the
//! [`SessionController`], the [`DocumentView`] the controller highlights in,
//! and two channel endpoints:
//!
//! * `engine_rx` receives [`EngineEvent`]s from the engine's worker threads.
//! * `hotkey_rx` receives media-key presses from the hotkey thread.
//!
//! Both are drained at the start of every frame.
//!
//! # Layout
//!
//! | Panel   | Contents                                         |
//! |---------|--------------------------------------------------|
//! | top     | Start/Pause/Resume, Stop, voice, rate and volume |
//! | centre  | the document editor (read-only while reading)    |
//! | bottom  | export row, status line and progress bar         |
//!
//! [`EngineEvent`]: crate::engine::EngineEvent

use std::time::Duration;

use eframe::egui;
use tokio::sync::mpsc;

use crate::config::{AppConfig, AppPaths, MAX_RATE, MAX_VOLUME, MIN_RATE};
use crate::engine::{CompletionOutcome, EventReceiver, VoiceInfo};
use crate::hotkey::HotkeyEvent;
use crate::session::{LoggingObserver, PresentationSurface, SessionController, SessionState};

/// Repaint interval while reading, so word highlights keep up with speech.
const ACTIVE_REPAINT: Duration = Duration::from_millis(30);
/// Repaint interval while idle, so media keys are noticed.
const IDLE_REPAINT: Duration = Duration::from_millis(200);

// ---------------------------------------------------------------------------
// DocumentView
// ---------------------------------------------------------------------------

/// The document text plus selection and focus requests waiting for the next
/// frame.
///
/// egui keeps the real cursor in widget memory, which only exists while a
/// frame is being built.  The controller runs between frames, so its
/// requests are buffered here and applied by [`ReaderApp`] before the
/// editor is drawn.
#[derive(Debug, Default)]
pub struct DocumentView {
    text: String,
    cursor: Option<usize>,
    pending_selection: Option<(usize, usize)>,
    focus_start: bool,
}

impl DocumentView {
    pub fn new(text: String, cursor: Option<usize>) -> Self {
        let mut view = Self {
            text,
            ..Self::default()
        };
        if let Some(start) = cursor {
            view.set_selection_start(start);
        }
        view
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Cursor position last seen in the widget, or last requested.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Record the cursor reported by the widget this frame.
    ///
    /// Ignored while a requested selection has not reached the widget yet.
    pub fn sync_cursor(&mut self, cursor: Option<usize>) {
        if self.pending_selection.is_none() && cursor.is_some() {
            self.cursor = cursor;
        }
    }

    /// Selection to push into the widget, as a `(start, end)` char range.
    pub fn take_pending_selection(&mut self) -> Option<(usize, usize)> {
        self.pending_selection.take()
    }

    pub fn take_focus_request(&mut self) -> bool {
        std::mem::take(&mut self.focus_start)
    }
}

impl PresentationSurface for DocumentView {
    fn document_text(&self) -> &str {
        &self.text
    }

    fn selection_start(&self) -> Option<usize> {
        self.cursor
    }

    fn set_selection_start(&mut self, start: usize) {
        self.cursor = Some(start);
        self.pending_selection = Some((start, start));
    }

    fn select(&mut self, start: usize, len: usize) {
        self.cursor = Some(start);
        self.pending_selection = Some((start, start + len));
    }

    fn focus_start_control(&mut self) {
        self.focus_start = true;
    }
}

// ---------------------------------------------------------------------------
// ReaderApp
// ---------------------------------------------------------------------------

/// eframe application: the reader window.
pub struct ReaderApp {
    controller: SessionController,
    document: DocumentView,

    // ── Channels ─────────────────────────────────────────────────────────
    engine_rx: EventReceiver,
    hotkey_rx: mpsc::Receiver<HotkeyEvent>,

    // ── Configuration ────────────────────────────────────────────────────
    config: AppConfig,
    paths: AppPaths,
    voices: Vec<VoiceInfo>,

    // ── UI state ─────────────────────────────────────────────────────────
    /// Last message for the status line (errors, export results).
    status: Option<String>,
    /// Set once settings have been written on shutdown.
    persisted: bool,
}

impl ReaderApp {
    /// Create the app.  The document and cursor come from `config`.
    pub fn new(
        mut controller: SessionController,
        engine_rx: EventReceiver,
        hotkey_rx: mpsc::Receiver<HotkeyEvent>,
        config: AppConfig,
        paths: AppPaths,
    ) -> Self {
        controller.subscribe(Box::new(LoggingObserver));

        let voices = controller.voices().unwrap_or_else(|e| {
            log::warn!("could not list voices: {e}");
            Vec::new()
        });

        let document = DocumentView::new(
            config.document.text.clone(),
            config.document.selection_start,
        );

        Self {
            controller,
            document,
            engine_rx,
            hotkey_rx,
            config,
            paths,
            voices,
            status: None,
            persisted: false,
        }
    }

    // ── Channel polling ──────────────────────────────────────────────────

    /// Drain all pending hotkey events (non-blocking).
    fn poll_hotkeys(&mut self) {
        while let Ok(event) = self.hotkey_rx.try_recv() {
            log::debug!("hotkey: {event:?}");
            match event {
                HotkeyEvent::PlayPause => self.toggle(),
                HotkeyEvent::Stop => self.controller.stop(&mut self.document),
            }
        }
    }

    /// Drain all pending engine notifications (non-blocking).
    fn poll_engine(&mut self) {
        while let Ok(event) = self.engine_rx.try_recv() {
            if let Some(CompletionOutcome::Failed(message)) =
                self.controller.handle_event(event, &mut self.document)
            {
                self.status = Some(message);
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────────────

    fn toggle(&mut self) {
        match self.controller.toggle(&mut self.document) {
            Ok(()) => self.status = None,
            Err(e) => {
                log::error!("start failed: {e}");
                self.status = Some(e.to_string());
            }
        }
    }

    fn save_to_file(&mut self) {
        let dir = self.config.export.resolved_dir(&self.paths);
        self.status = Some(
            match self
                .controller
                .save_to_file(&self.config.export.label, &dir, &self.document)
            {
                Ok(path) => format!("Saved {}", path.display()),
                Err(e) => {
                    log::error!("export failed: {e}");
                    e.to_string()
                }
            },
        );
    }

    fn speech_changed(&mut self) {
        self.controller
            .update_speech_config(self.config.speech.clone());
    }

    /// Stop reading and write settings back to disk.  Runs once.
    fn shutdown(&mut self) {
        if self.persisted {
            return;
        }
        self.persisted = true;

        self.config.document.text = self.document.text().to_string();
        self.config.document.selection_start = self.document.cursor();
        self.config.speech = self.controller.speech_config().clone();
        self.controller.stop(&mut self.document);

        match self.config.save() {
            Ok(()) => log::info!("settings saved to {}", self.paths.settings_file.display()),
            Err(e) => log::warn!("failed to save settings: {e}"),
        }
    }

    // ── Panels ───────────────────────────────────────────────────────────

    /// Transport buttons and voice settings.
    fn draw_controls(&mut self, ui: &mut egui::Ui) {
        let state = self.controller.session_state();

        ui.horizontal(|ui| {
            let toggle = ui.button(state.toggle_label());
            if toggle.clicked() {
                self.toggle();
            }
            if self.document.take_focus_request() {
                toggle.request_focus();
            }

            if ui
                .add_enabled(state != SessionState::Idle, egui::Button::new("Stop"))
                .clicked()
            {
                self.controller.stop(&mut self.document);
            }

            ui.separator();

            let mut voice = self.config.speech.voice.clone();
            let selected = voice.clone().unwrap_or_else(|| "Default".into());
            egui::ComboBox::from_label("Voice")
                .selected_text(selected)
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut voice, None, "Default");
                    for v in &self.voices {
                        let label = format!("{} ({})", v.name, v.language);
                        ui.selectable_value(&mut voice, Some(v.name.clone()), label);
                    }
                });
            if voice != self.config.speech.voice {
                self.config.speech.voice = voice;
                self.speech_changed();
            }

            let rate = ui.add(
                egui::Slider::new(&mut self.config.speech.rate, MIN_RATE..=MAX_RATE).text("Rate"),
            );
            let volume = ui.add(
                egui::Slider::new(&mut self.config.speech.volume, 0..=MAX_VOLUME).text("Volume"),
            );
            if rate.changed() || volume.changed() {
                self.speech_changed();
            }
        });
    }

    /// Export row, then the status line with reading progress.
    fn draw_status(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Label");
            ui.add(
                egui::TextEdit::singleline(&mut self.config.export.label).desired_width(120.0),
            );
            let idle = self.controller.session_state() == SessionState::Idle;
            if ui
                .add_enabled(idle, egui::Button::new("Save to file"))
                .clicked()
            {
                self.save_to_file();
            }
        });

        let published = self.controller.published();
        let base = self.controller.session().map_or(0, |s| s.base);

        ui.horizontal(|ui| {
            ui.label(published.state.label());
            if !published.current_word.is_empty() {
                ui.separator();
                ui.label(egui::RichText::new(&published.current_word).strong());
            }
            if let Some(message) = &self.status {
                ui.separator();
                ui.label(egui::RichText::new(message).color(egui::Color32::from_rgb(255, 136, 68)));
            }
        });

        ui.add(
            egui::ProgressBar::new(published.progress(base))
                .desired_height(6.0)
                .desired_width(ui.available_width()),
        );
    }

    /// The document editor.  Pending selections from the controller are
    /// written into the widget state before it is drawn.
    fn draw_document(&mut self, ui: &mut egui::Ui) {
        let id = egui::Id::new("document");
        let highlight = self.document.take_pending_selection();

        if let Some((start, end)) = highlight {
            let mut state = egui::text_edit::TextEditState::load(ui.ctx(), id).unwrap_or_default();
            state
                .cursor
                .set_char_range(Some(egui::text::CCursorRange::two(
                    egui::text::CCursor::new(start),
                    egui::text::CCursor::new(end),
                )));
            state.store(ui.ctx(), id);
        }

        let reading = self.controller.session_state() != SessionState::Idle;

        egui::ScrollArea::vertical().show(ui, |ui| {
            let output = if reading {
                let mut locked: &str = self.document.text();
                egui::TextEdit::multiline(&mut locked)
                    .id(id)
                    .desired_width(f32::INFINITY)
                    .show(ui)
            } else {
                egui::TextEdit::multiline(&mut self.document.text)
                    .id(id)
                    .desired_width(f32::INFINITY)
                    .show(ui)
            };

            if reading && highlight.is_some_and(|(start, end)| end > start) {
                output.response.request_focus();
                output.response.scroll_to_me(None);
            }

            let cursor = output
                .state
                .cursor
                .char_range()
                .map(|range| range.primary.index.min(range.secondary.index));
            self.document.sync_cursor(cursor);
        });
    }
}

// ---------------------------------------------------------------------------
// eframe::App impl
// ---------------------------------------------------------------------------

impl eframe::App for ReaderApp {
    /// Called every frame by eframe.  Polls channels, then renders.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // --- Poll non-blocking channels ------------------------------------
        self.poll_hotkeys();
        self.poll_engine();

        if ctx.input(|i| i.viewport().close_requested()) {
            self.shutdown();
        }

        // --- Schedule repaints ---------------------------------------------
        let repaint = match self.controller.session_state() {
            SessionState::Idle => IDLE_REPAINT,
            SessionState::Speaking | SessionState::Paused => ACTIVE_REPAINT,
        };
        ctx.request_repaint_after(repaint);

        egui::TopBottomPanel::top("controls").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_controls(ui);
            ui.add_space(4.0);
        });

        egui::TopBottomPanel::bottom("status").show(ctx, |ui| {
            ui.add_space(4.0);
            self.draw_status(ui);
            ui.add_space(4.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.draw_document(ui);
        });
    }

    /// Persist the document and voice settings on exit.
    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.shutdown();
        log::info!("TTS Reader closing");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
