//! Voice enumeration and selection.
//!
//! Engines often report voices asynchronously, so the selector starts empty
//! and is refilled wholesale every time the engine announces a change.

use crate::engine::VoiceHandle;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct VoiceSelector {
    language_prefix: String,
    preferred: Option<String>,
    voices: Vec<VoiceHandle>,
    selected: Option<VoiceHandle>,
}

impl VoiceSelector {
    /// `language_prefix` filters voices by language tag (case-insensitive);
    /// an empty prefix keeps every voice.
    pub fn new(language_prefix: impl Into<String>, preferred: Option<String>) -> Self {
        Self {
            language_prefix: language_prefix.into().trim().to_ascii_lowercase(),
            preferred: preferred.filter(|name| !name.trim().is_empty()),
            voices: Vec::new(),
            selected: None,
        }
    }

    pub fn voices(&self) -> &[VoiceHandle] {
        &self.voices
    }

    pub fn selected(&self) -> Option<&VoiceHandle> {
        self.selected.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    pub fn find_by_name(&self, name: &str) -> Option<&VoiceHandle> {
        let name = name.trim();
        self.voices
            .iter()
            .find(|voice| voice.name.eq_ignore_ascii_case(name))
    }

    /// Replace the voice set with a fresh enumeration.
    ///
    /// The current selection survives when the new set still contains it;
    /// otherwise the preferred voice (or the first one) is picked. Returns
    /// whether the selection changed.
    pub fn replace(&mut self, enumerated: Vec<VoiceHandle>) -> bool {
        let total = enumerated.len();
        let mut voices: Vec<VoiceHandle> = Vec::with_capacity(total);
        for voice in enumerated {
            if self.matches_language(&voice) && !voices.contains(&voice) {
                voices.push(voice);
            }
        }
        self.voices = voices;

        let previous = self.selected.take();
        self.selected = previous
            .as_ref()
            .filter(|voice| self.voices.contains(voice))
            .cloned()
            .or_else(|| self.default_voice());

        info!(
            enumerated = total,
            usable = self.voices.len(),
            selected = self.selected.as_ref().map(|v| v.name.as_str()).unwrap_or("none"),
            "Voice list updated"
        );
        previous != self.selected
    }

    /// Select a voice from the current set. Unknown voices are rejected.
    pub fn select(&mut self, voice: &VoiceHandle) -> bool {
        if !self.voices.contains(voice) {
            debug!(voice = %voice, "Ignoring selection of unknown voice");
            return false;
        }
        self.selected = Some(voice.clone());
        true
    }

    fn default_voice(&self) -> Option<VoiceHandle> {
        self.preferred
            .as_deref()
            .and_then(|name| self.find_by_name(name))
            .or_else(|| self.voices.first())
            .cloned()
    }

    fn matches_language(&self, voice: &VoiceHandle) -> bool {
        self.language_prefix.is_empty()
            || voice
                .lang
                .to_ascii_lowercase()
                .starts_with(&self.language_prefix)
    }
}
