use crate::config::{AfterWordPolicy, AppConfig};
use crate::engine::{EngineEvent, SpeechEngine, VoiceHandle};
use crate::highlight::{self, HighlightStyle};
use crate::models::Story;
use crate::narration::{NarrationController, NarrationState};
use crate::word_index::WordIndex;
use anyhow::Result;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;
use ts_rs::TS;

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct NarrationView {
    pub state: NarrationState,
    pub current_word_index: Option<usize>,
    pub selected_voice: Option<VoiceHandle>,
    pub voices: Vec<VoiceHandle>,
    pub seek_target: Option<usize>,
    pub available: bool,
    pub after_word: AfterWordPolicy,
}

#[derive(Debug, Clone, Serialize, TS)]
#[ts(export)]
pub struct ReaderSnapshot {
    pub title: String,
    pub word_count: usize,
    /// Sanitized story HTML with every word wrapped and the active one marked.
    pub markup: String,
    pub narration: NarrationView,
}

#[derive(Debug, Clone)]
pub enum NarrationCommand {
    GetSnapshot,
    Play,
    Pause,
    TogglePlayPause,
    Stop,
    SpeakWord { index: usize },
    /// Raw index attribute value of a clicked word unit.
    WordClicked { target: String },
    Seek { index: usize },
    SelectVoice { name: String },
    RefreshVoices,
    LoadDocument { title: String, html: String },
}

impl NarrationCommand {
    pub fn action(&self) -> &'static str {
        match self {
            Self::GetSnapshot => "narration_get_snapshot",
            Self::Play => "narration_play",
            Self::Pause => "narration_pause",
            Self::TogglePlayPause => "narration_toggle_play_pause",
            Self::Stop => "narration_stop",
            Self::SpeakWord { .. } => "narration_speak_word",
            Self::WordClicked { .. } => "narration_word_clicked",
            Self::Seek { .. } => "narration_seek",
            Self::SelectVoice { .. } => "narration_select_voice",
            Self::RefreshVoices => "narration_refresh_voices",
            Self::LoadDocument { .. } => "narration_load_document",
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub action: &'static str,
    pub snapshot: ReaderSnapshot,
}

/// One open story: its word index, narration controller and render style.
pub struct ReaderSession<E: SpeechEngine> {
    title: String,
    controller: NarrationController<E>,
    style: HighlightStyle,
}

impl<E: SpeechEngine> ReaderSession<E> {
    pub fn new(engine: E, title: impl Into<String>, raw_html: &str, config: &AppConfig) -> Self {
        let index = Arc::new(WordIndex::from_html(raw_html));
        Self {
            title: title.into(),
            controller: NarrationController::from_config(engine, index, config),
            style: HighlightStyle::from_config(config),
        }
    }

    pub fn from_story(engine: E, story: &Story, config: &AppConfig) -> Result<Self> {
        story.validate()?;
        Ok(Self::new(engine, story.title.clone(), &story.story_html, config))
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn controller(&self) -> &NarrationController<E> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut NarrationController<E> {
        &mut self.controller
    }

    pub fn narration_view(&self) -> NarrationView {
        let session = self.controller.session();
        NarrationView {
            state: session.state(),
            current_word_index: session.current_word_index(),
            selected_voice: session.selected_voice().cloned(),
            voices: session.voices().to_vec(),
            seek_target: session.pending_seek(),
            available: session.can_speak(),
            after_word: self.controller.settings().after_word,
        }
    }

    pub fn render(&self) -> String {
        highlight::render(
            self.controller.index(),
            self.controller.current_word_index(),
            &self.style,
        )
    }

    pub fn snapshot(&self) -> ReaderSnapshot {
        ReaderSnapshot {
            title: self.title.clone(),
            word_count: self.controller.index().len(),
            markup: self.render(),
            narration: self.narration_view(),
        }
    }

    pub fn apply_command(&mut self, command: NarrationCommand) -> SessionEvent {
        let action = command.action();
        match command {
            NarrationCommand::GetSnapshot => {}
            NarrationCommand::Play => self.controller.play(),
            NarrationCommand::Pause => self.controller.pause(),
            NarrationCommand::TogglePlayPause => self.controller.toggle_play_pause(),
            NarrationCommand::Stop => self.controller.stop(),
            NarrationCommand::SpeakWord { index } => self.controller.speak_word(index),
            NarrationCommand::WordClicked { target } => self.word_clicked(&target),
            NarrationCommand::Seek { index } => self.controller.seek(index),
            NarrationCommand::SelectVoice { name } => {
                self.controller.select_voice_by_name(&name);
            }
            NarrationCommand::RefreshVoices => self.controller.refresh_voices(),
            NarrationCommand::LoadDocument { title, html } => self.load_document(title, &html),
        }
        SessionEvent {
            action,
            snapshot: self.snapshot(),
        }
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) -> SessionEvent {
        self.controller.handle_engine_event(event);
        SessionEvent {
            action: "narration_engine_event",
            snapshot: self.snapshot(),
        }
    }

    fn word_clicked(&mut self, target: &str) {
        match self.controller.index().resolve_click(target) {
            Some(index) => self.controller.speak_word(index),
            None => debug!(target, "Click did not resolve to a word"),
        }
    }

    fn load_document(&mut self, title: String, html: &str) {
        let index = Arc::new(WordIndex::from_html(html));
        if self.controller.load_document(index) {
            self.title = title;
        }
    }
}
