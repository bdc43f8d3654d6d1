use crate::engine::VoiceHandle;

pub(crate) fn default_log_level() -> crate::config::LogLevel {
    crate::config::LogLevel::Debug
}

pub(crate) fn default_voice_language_prefix() -> String {
    "en".to_string()
}

pub(crate) fn default_native_pause() -> bool {
    true
}

pub(crate) fn default_speech_rate() -> f32 {
    1.0
}

pub(crate) fn default_speech_volume() -> f32 {
    1.0
}

pub(crate) fn default_word_class() -> String {
    "story-word".to_string()
}

pub(crate) fn default_active_class() -> String {
    "story-word-active".to_string()
}

pub(crate) fn default_index_attribute() -> String {
    "data-word-index".to_string()
}

pub(crate) fn default_engine_words_per_minute() -> u32 {
    160
}

pub(crate) fn default_engine_voices() -> Vec<VoiceHandle> {
    vec![
        VoiceHandle::new("Narrator", "en-US"),
        VoiceHandle::new("Storyteller", "en-GB"),
    ]
}
