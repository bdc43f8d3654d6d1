use crate::engine::{Generation, VoiceHandle};
use crate::voices::VoiceSelector;
use crate::word_index::WordIndex;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum NarrationState {
    #[default]
    Idle,
    Playing,
    Paused,
    SpeakingSingleWord,
}

impl std::fmt::Display for NarrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NarrationState::Idle => "idle",
            NarrationState::Playing => "playing",
            NarrationState::Paused => "paused",
            NarrationState::SpeakingSingleWord => "speaking word",
        };
        write!(f, "{}", label)
    }
}

/// Main playback state that a single-word utterance interrupted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Interrupted {
    pub(crate) state: NarrationState,
    pub(crate) position: Option<usize>,
}

/// The one utterance the engine is allowed to be working on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ActiveUtterance {
    Document {
        generation: Generation,
        /// Token the next word boundary maps to.
        next_word: usize,
    },
    Word {
        generation: Generation,
        index: usize,
        interrupted: Interrupted,
    },
}

impl ActiveUtterance {
    pub(crate) fn generation(&self) -> Generation {
        match self {
            ActiveUtterance::Document { generation, .. }
            | ActiveUtterance::Word { generation, .. } => *generation,
        }
    }
}

/// Narration state for one loaded document. Mutated only by `transition`.
#[derive(Debug, Clone)]
pub struct NarrationSession {
    pub(crate) state: NarrationState,
    pub(crate) current_word_index: Option<usize>,
    pub(crate) voices: VoiceSelector,
    pub(crate) full_text: String,
    pub(crate) generation: Generation,
    pub(crate) active: Option<ActiveUtterance>,
    pub(crate) pending_seek: Option<usize>,
    pub(crate) engine_available: bool,
}

impl NarrationSession {
    pub(crate) fn new(index: &WordIndex, voices: VoiceSelector, engine_available: bool) -> Self {
        Self {
            state: NarrationState::Idle,
            current_word_index: None,
            voices,
            full_text: index.full_text().to_string(),
            generation: 0,
            active: None,
            pending_seek: None,
            engine_available,
        }
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    pub fn current_word_index(&self) -> Option<usize> {
        self.current_word_index
    }

    pub fn selected_voice(&self) -> Option<&VoiceHandle> {
        self.voices.selected()
    }

    pub fn voices(&self) -> &[VoiceHandle] {
        self.voices.voices()
    }

    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Word the next `play()` starts from, when one was requested.
    pub fn pending_seek(&self) -> Option<usize> {
        self.pending_seek
    }

    pub fn active_generation(&self) -> Option<Generation> {
        self.active.map(|active| active.generation())
    }

    /// Speech needs both a working engine and at least one usable voice.
    pub fn can_speak(&self) -> bool {
        self.engine_available && !self.voices.is_empty()
    }

    pub(crate) fn next_generation(&mut self) -> Generation {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }

    /// Forget playback for a new document. Voices and the generation counter
    /// carry over so callbacks from the previous document stay stale.
    pub(crate) fn reset_for(&mut self, index: &WordIndex) {
        self.state = NarrationState::Idle;
        self.current_word_index = None;
        self.active = None;
        self.pending_seek = None;
        self.full_text = index.full_text().to_string();
    }
}
