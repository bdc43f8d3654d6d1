use super::defaults;
use super::models::{AfterWordPolicy, AppConfig, LogLevel};
use crate::engine::VoiceHandle;
use serde::Deserialize;

/// On-disk layout: one TOML table per concern, flattened into `AppConfig`.
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize)]
pub(super) struct ConfigTables {
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    narration: NarrationConfig,
    #[serde(default)]
    highlight: HighlightConfig,
    #[serde(default)]
    engine: EngineConfig,
}

impl From<ConfigTables> for AppConfig {
    fn from(tables: ConfigTables) -> Self {
        AppConfig {
            log_level: tables.logging.log_level,
            voice_language_prefix: tables.narration.voice_language_prefix,
            preferred_voice: tables.narration.preferred_voice,
            after_word: tables.narration.after_word,
            native_pause: tables.narration.native_pause,
            speech_rate: tables.narration.rate,
            speech_volume: tables.narration.volume,
            word_class: tables.highlight.word_class,
            active_class: tables.highlight.active_class,
            index_attribute: tables.highlight.index_attribute,
            engine_words_per_minute: tables.engine.words_per_minute,
            engine_voices: tables.engine.voices,
        }
    }
}

impl From<&AppConfig> for ConfigTables {
    fn from(config: &AppConfig) -> Self {
        ConfigTables {
            logging: LoggingConfig {
                log_level: config.log_level,
            },
            narration: NarrationConfig {
                voice_language_prefix: config.voice_language_prefix.clone(),
                preferred_voice: config.preferred_voice.clone(),
                after_word: config.after_word,
                native_pause: config.native_pause,
                rate: config.speech_rate,
                volume: config.speech_volume,
            },
            highlight: HighlightConfig {
                word_class: config.word_class.clone(),
                active_class: config.active_class.clone(),
                index_attribute: config.index_attribute.clone(),
            },
            engine: EngineConfig {
                words_per_minute: config.engine_words_per_minute,
                voices: config.engine_voices.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct LoggingConfig {
    #[serde(default = "defaults::default_log_level")]
    log_level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            log_level: defaults::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct NarrationConfig {
    #[serde(default = "defaults::default_voice_language_prefix")]
    voice_language_prefix: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    preferred_voice: Option<String>,
    #[serde(default)]
    after_word: AfterWordPolicy,
    #[serde(default = "defaults::default_native_pause")]
    native_pause: bool,
    #[serde(default = "defaults::default_speech_rate")]
    rate: f32,
    #[serde(default = "defaults::default_speech_volume")]
    volume: f32,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        NarrationConfig {
            voice_language_prefix: defaults::default_voice_language_prefix(),
            preferred_voice: None,
            after_word: AfterWordPolicy::default(),
            native_pause: defaults::default_native_pause(),
            rate: defaults::default_speech_rate(),
            volume: defaults::default_speech_volume(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct HighlightConfig {
    #[serde(default = "defaults::default_word_class")]
    word_class: String,
    #[serde(default = "defaults::default_active_class")]
    active_class: String,
    #[serde(default = "defaults::default_index_attribute")]
    index_attribute: String,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        HighlightConfig {
            word_class: defaults::default_word_class(),
            active_class: defaults::default_active_class(),
            index_attribute: defaults::default_index_attribute(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
struct EngineConfig {
    #[serde(default = "defaults::default_engine_words_per_minute")]
    words_per_minute: u32,
    #[serde(default = "defaults::default_engine_voices")]
    voices: Vec<VoiceHandle>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            words_per_minute: defaults::default_engine_words_per_minute(),
            voices: defaults::default_engine_voices(),
        }
    }
}
