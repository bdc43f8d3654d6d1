//! Speech engine seam.
//!
//! The engine is a single process-wide resource that the narration
//! controller owns exclusively. Commands go in through [`SpeechEngine`];
//! callbacks come back as [`EngineEvent`] messages tagged with the
//! generation of the utterance that produced them.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Monotonic tag assigned to each utterance.
pub type Generation = u64;

/// Opaque reference to a synthesis voice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VoiceHandle {
    pub name: String,
    pub lang: String,
}

impl VoiceHandle {
    pub fn new(name: impl Into<String>, lang: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            lang: lang.into(),
        }
    }
}

impl std::fmt::Display for VoiceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.lang)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UtteranceKind {
    Document,
    Word,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub generation: Generation,
    pub kind: UtteranceKind,
    pub text: String,
    pub voice: Option<VoiceHandle>,
    pub rate: f32,
    pub volume: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    Word,
    Sentence,
}

/// Callback from the engine, delivered in the order the engine emitted it.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Started {
        generation: Generation,
    },
    Boundary {
        generation: Generation,
        kind: BoundaryKind,
        /// Offset the engine reports; informational only.
        char_index: usize,
    },
    Ended {
        generation: Generation,
    },
    Failed {
        generation: Generation,
        reason: String,
    },
}

impl EngineEvent {
    pub fn generation(&self) -> Generation {
        match self {
            EngineEvent::Started { generation }
            | EngineEvent::Boundary { generation, .. }
            | EngineEvent::Ended { generation }
            | EngineEvent::Failed { generation, .. } => *generation,
        }
    }
}

/// Work the narration state machine asks the engine to perform.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    Cancel,
    Speak(Utterance),
    Pause,
    Resume,
}

pub trait SpeechEngine {
    /// Whether synthesis is possible at all on this host.
    fn is_available(&self) -> bool;

    /// Current voice list. May be empty until the engine finishes loading.
    fn voices(&self) -> Vec<VoiceHandle>;

    fn speak(&mut self, utterance: Utterance);

    fn pause(&mut self);

    fn resume(&mut self);

    /// Stop all speech immediately. Must be safe to call when idle.
    fn cancel(&mut self);

    fn execute(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Cancel => self.cancel(),
            EngineCommand::Speak(utterance) => self.speak(utterance),
            EngineCommand::Pause => self.pause(),
            EngineCommand::Resume => self.resume(),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Engine double that records every command and counts overlapping speech.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingEngine {
        pub(crate) available: bool,
        pub(crate) voices: Vec<VoiceHandle>,
        pub(crate) active: Option<Utterance>,
        pub(crate) paused: bool,
        pub(crate) spoken: Vec<Utterance>,
        pub(crate) commands: Vec<EngineCommand>,
        pub(crate) overlaps: usize,
    }

    impl RecordingEngine {
        pub(crate) fn with_voices(voices: Vec<VoiceHandle>) -> Self {
            Self {
                available: true,
                voices,
                ..Self::default()
            }
        }

        pub(crate) fn english() -> Self {
            Self::with_voices(vec![
                VoiceHandle::new("Alice", "en-US"),
                VoiceHandle::new("Bruno", "pt-BR"),
                VoiceHandle::new("Claire", "en-GB"),
            ])
        }

        pub(crate) fn last_spoken(&self) -> Option<&Utterance> {
            self.spoken.last()
        }

        /// Natural end of whatever is active, as the engine would report it.
        pub(crate) fn finish(&mut self) -> Option<EngineEvent> {
            self.active.take().map(|utterance| EngineEvent::Ended {
                generation: utterance.generation,
            })
        }
    }

    impl SpeechEngine for RecordingEngine {
        fn is_available(&self) -> bool {
            self.available
        }

        fn voices(&self) -> Vec<VoiceHandle> {
            self.voices.clone()
        }

        fn speak(&mut self, utterance: Utterance) {
            if self.active.is_some() {
                self.overlaps += 1;
            }
            self.commands.push(EngineCommand::Speak(utterance.clone()));
            self.spoken.push(utterance.clone());
            self.active = Some(utterance);
            self.paused = false;
        }

        fn pause(&mut self) {
            self.commands.push(EngineCommand::Pause);
            self.paused = true;
        }

        fn resume(&mut self) {
            self.commands.push(EngineCommand::Resume);
            self.paused = false;
        }

        fn cancel(&mut self) {
            self.commands.push(EngineCommand::Cancel);
            self.active = None;
            self.paused = false;
        }
    }
}
