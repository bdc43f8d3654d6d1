use crate::engine::VoiceHandle;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;
use ts_rs::TS;

pub(crate) const MIN_SPEECH_RATE: f32 = 0.1;
pub(crate) const MAX_SPEECH_RATE: f32 = 3.0;
pub(crate) const MIN_SPEECH_VOLUME: f32 = 0.0;
pub(crate) const MAX_SPEECH_VOLUME: f32 = 1.0;
pub(crate) const MIN_WORDS_PER_MINUTE: u32 = 40;
pub(crate) const MAX_WORDS_PER_MINUTE: u32 = 600;

/// The index attribute is emitted verbatim as an attribute name in rendered markup.
static RE_ATTRIBUTE_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap());

/// High-level app configuration; deserializable from TOML.
#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct AppConfig {
    #[serde(default = "crate::config::defaults::default_log_level")]
    pub log_level: LogLevel,
    #[serde(default = "crate::config::defaults::default_voice_language_prefix")]
    pub voice_language_prefix: String,
    #[serde(default)]
    pub preferred_voice: Option<String>,
    #[serde(default)]
    pub after_word: AfterWordPolicy,
    #[serde(default = "crate::config::defaults::default_native_pause")]
    pub native_pause: bool,
    #[serde(default = "crate::config::defaults::default_speech_rate")]
    pub speech_rate: f32,
    #[serde(default = "crate::config::defaults::default_speech_volume")]
    pub speech_volume: f32,
    #[serde(default = "crate::config::defaults::default_word_class")]
    pub word_class: String,
    #[serde(default = "crate::config::defaults::default_active_class")]
    pub active_class: String,
    #[serde(default = "crate::config::defaults::default_index_attribute")]
    pub index_attribute: String,
    #[serde(default = "crate::config::defaults::default_engine_words_per_minute")]
    pub engine_words_per_minute: u32,
    #[serde(default = "crate::config::defaults::default_engine_voices")]
    pub engine_voices: Vec<VoiceHandle>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            log_level: crate::config::defaults::default_log_level(),
            voice_language_prefix: crate::config::defaults::default_voice_language_prefix(),
            preferred_voice: None,
            after_word: AfterWordPolicy::default(),
            native_pause: crate::config::defaults::default_native_pause(),
            speech_rate: crate::config::defaults::default_speech_rate(),
            speech_volume: crate::config::defaults::default_speech_volume(),
            word_class: crate::config::defaults::default_word_class(),
            active_class: crate::config::defaults::default_active_class(),
            index_attribute: crate::config::defaults::default_index_attribute(),
            engine_words_per_minute: crate::config::defaults::default_engine_words_per_minute(),
            engine_voices: crate::config::defaults::default_engine_voices(),
        }
    }
}

impl AppConfig {
    /// Clamp numeric settings into the ranges the engine accepts and reset
    /// markup names that cannot be emitted safely.
    pub fn clamped(mut self) -> Self {
        self.speech_rate = if self.speech_rate.is_finite() {
            self.speech_rate.clamp(MIN_SPEECH_RATE, MAX_SPEECH_RATE)
        } else {
            crate::config::defaults::default_speech_rate()
        };
        self.speech_volume = if self.speech_volume.is_finite() {
            self.speech_volume.clamp(MIN_SPEECH_VOLUME, MAX_SPEECH_VOLUME)
        } else {
            crate::config::defaults::default_speech_volume()
        };
        self.engine_words_per_minute = self
            .engine_words_per_minute
            .clamp(MIN_WORDS_PER_MINUTE, MAX_WORDS_PER_MINUTE);
        if !RE_ATTRIBUTE_NAME.is_match(&self.index_attribute) {
            let fallback = crate::config::defaults::default_index_attribute();
            warn!(
                index_attribute = %self.index_attribute,
                %fallback,
                "Invalid index attribute name; using default"
            );
            self.index_attribute = fallback;
        }
        self
    }
}

/// What happens once a clicked word has been spoken.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq, Default, TS)]
#[serde(rename_all = "kebab-case")]
#[ts(export)]
pub enum AfterWordPolicy {
    /// Return to the playback state that was interrupted, continuing the
    /// document from the interrupted word if it was playing.
    #[default]
    Resume,
    /// Always fall back to idle.
    Idle,
}

impl std::fmt::Display for AfterWordPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AfterWordPolicy::Resume => "resume",
            AfterWordPolicy::Idle => "idle",
        };
        write!(f, "{}", label)
    }
}

/// Supported logging verbosity levels.
#[derive(Debug, Clone, Copy, Deserialize, serde::Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for LogLevel {
    fn default() -> Self {
        LogLevel::Debug
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_filter_str())
    }
}

impl LogLevel {
    pub fn as_filter_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
