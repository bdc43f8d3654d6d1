use super::NarrationSettings;
use super::state::{ActiveUtterance, Interrupted, NarrationSession, NarrationState};
use crate::config::AfterWordPolicy;
use crate::engine::{
    BoundaryKind, EngineCommand, EngineEvent, Utterance, UtteranceKind, VoiceHandle,
};
use crate::word_index::WordIndex;
use tracing::{debug, info, trace, warn};

/// Everything that can change narration state: user commands and engine
/// callbacks alike.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationEvent {
    Play,
    Pause,
    Stop,
    TogglePlayPause,
    SpeakWord { index: usize },
    Seek { index: usize },
    SelectVoice { voice: VoiceHandle },
    /// Fresh voice list and engine availability, e.g. after a voices-changed
    /// notification from the platform.
    VoicesChanged {
        voices: Vec<VoiceHandle>,
        available: bool,
    },
    Engine(EngineEvent),
}

/// Apply one event to the session and return the engine work it requires,
/// in order. Every `Speak` is preceded by a `Cancel`.
pub(crate) fn transition(
    session: &mut NarrationSession,
    index: &WordIndex,
    settings: &NarrationSettings,
    event: NarrationEvent,
) -> Vec<EngineCommand> {
    match event {
        NarrationEvent::Play => on_play(session, index, settings),
        NarrationEvent::Pause => on_pause(session, settings),
        NarrationEvent::Stop => on_stop(session),
        NarrationEvent::TogglePlayPause => {
            if session.state == NarrationState::Playing {
                on_pause(session, settings)
            } else {
                on_play(session, index, settings)
            }
        }
        NarrationEvent::SpeakWord { index: word } => on_speak_word(session, index, settings, word),
        NarrationEvent::Seek { index: word } => on_seek(session, index, settings, word),
        NarrationEvent::SelectVoice { voice } => on_select_voice(session, voice),
        NarrationEvent::VoicesChanged { voices, available } => {
            on_voices_changed(session, voices, available)
        }
        NarrationEvent::Engine(event) => on_engine_event(session, index, settings, event),
    }
}

fn on_play(
    session: &mut NarrationSession,
    index: &WordIndex,
    settings: &NarrationSettings,
) -> Vec<EngineCommand> {
    if !session.can_speak() {
        debug!("Narration unavailable; ignoring play");
        return Vec::new();
    }
    if index.is_empty() {
        debug!("No words to narrate; ignoring play");
        return Vec::new();
    }

    match session.state {
        NarrationState::Playing => {
            debug!("Already playing");
            Vec::new()
        }
        NarrationState::Paused => {
            let engine_paused = matches!(session.active, Some(ActiveUtterance::Document { .. }));
            if engine_paused && session.pending_seek.is_none() {
                info!("Resuming paused narration");
                session.state = NarrationState::Playing;
                return vec![EngineCommand::Resume];
            }
            let from = session
                .pending_seek
                .or(session.current_word_index)
                .unwrap_or(0);
            start_document(session, index, settings, from)
        }
        NarrationState::Idle => {
            let from = session.pending_seek.unwrap_or(0);
            start_document(session, index, settings, from)
        }
        NarrationState::SpeakingSingleWord => {
            let interrupted_at = match session.active {
                Some(ActiveUtterance::Word { interrupted, .. }) => interrupted.position,
                _ => None,
            };
            let from = session.pending_seek.or(interrupted_at).unwrap_or(0);
            start_document(session, index, settings, from)
        }
    }
}

/// Cancel whatever is speaking and narrate the document from word `from`.
fn start_document(
    session: &mut NarrationSession,
    index: &WordIndex,
    settings: &NarrationSettings,
    from: usize,
) -> Vec<EngineCommand> {
    let from = from.min(index.len().saturating_sub(1));
    let Some(text) = index.text_from(from) else {
        debug!(from, "Nothing left to narrate");
        return Vec::new();
    };

    let generation = session.next_generation();
    session.active = Some(ActiveUtterance::Document {
        generation,
        next_word: from,
    });
    session.state = NarrationState::Playing;
    session.current_word_index = None;
    session.pending_seek = None;
    info!(
        from,
        generation,
        words = index.len() - from,
        "Starting document narration"
    );

    vec![
        EngineCommand::Cancel,
        EngineCommand::Speak(Utterance {
            generation,
            kind: UtteranceKind::Document,
            text: text.to_string(),
            voice: session.selected_voice().cloned(),
            rate: settings.rate,
            volume: settings.volume,
        }),
    ]
}

fn on_pause(session: &mut NarrationSession, settings: &NarrationSettings) -> Vec<EngineCommand> {
    if session.state != NarrationState::Playing {
        debug!(state = %session.state, "Pause ignored outside playback");
        return Vec::new();
    }
    session.state = NarrationState::Paused;

    if settings.native_pause {
        info!(word = ?session.current_word_index, "Pausing narration");
        return vec![EngineCommand::Pause];
    }

    // Engine pause is unreliable: drop the utterance and remember the word.
    let next_word = match session.active {
        Some(ActiveUtterance::Document { next_word, .. }) => Some(next_word),
        _ => None,
    };
    let position = session.current_word_index.or(next_word).unwrap_or(0);
    session.active = None;
    session.pending_seek = Some(position);
    info!(position, "Pausing narration by cancelling utterance");
    vec![EngineCommand::Cancel]
}

fn on_stop(session: &mut NarrationSession) -> Vec<EngineCommand> {
    let previous = session.state;
    session.state = NarrationState::Idle;
    session.current_word_index = None;
    session.active = None;
    session.pending_seek = None;
    info!(previous = %previous, "Stopped narration");
    vec![EngineCommand::Cancel]
}

fn on_speak_word(
    session: &mut NarrationSession,
    index: &WordIndex,
    settings: &NarrationSettings,
    word: usize,
) -> Vec<EngineCommand> {
    if !session.can_speak() {
        debug!(word, "Narration unavailable; ignoring word");
        return Vec::new();
    }
    let Some(token) = index.get(word) else {
        debug!(word, words = index.len(), "Ignoring out-of-range word");
        return Vec::new();
    };

    let interrupted = match (session.state, session.active) {
        (NarrationState::SpeakingSingleWord, Some(ActiveUtterance::Word { interrupted, .. })) => {
            interrupted
        }
        (NarrationState::Playing, active) => {
            let next_word = match active {
                Some(ActiveUtterance::Document { next_word, .. }) => Some(next_word),
                _ => None,
            };
            Interrupted {
                state: NarrationState::Playing,
                position: session.current_word_index.or(next_word),
            }
        }
        (NarrationState::Paused, _) => Interrupted {
            state: NarrationState::Paused,
            position: session.pending_seek.or(session.current_word_index),
        },
        _ => Interrupted {
            state: NarrationState::Idle,
            position: session.pending_seek,
        },
    };

    let generation = session.next_generation();
    session.active = Some(ActiveUtterance::Word {
        generation,
        index: word,
        interrupted,
    });
    session.state = NarrationState::SpeakingSingleWord;
    session.current_word_index = Some(word);
    session.pending_seek = None;
    info!(word, text = %token.text, generation, "Speaking single word");

    vec![
        EngineCommand::Cancel,
        EngineCommand::Speak(Utterance {
            generation,
            kind: UtteranceKind::Word,
            text: token.text.clone(),
            voice: session.selected_voice().cloned(),
            rate: settings.rate,
            volume: settings.volume,
        }),
    ]
}

fn on_seek(
    session: &mut NarrationSession,
    index: &WordIndex,
    settings: &NarrationSettings,
    word: usize,
) -> Vec<EngineCommand> {
    if word >= index.len() {
        debug!(word, words = index.len(), "Ignoring out-of-range seek");
        return Vec::new();
    }

    match session.state {
        NarrationState::Playing if session.can_speak() => {
            info!(word, "Seeking during playback");
            start_document(session, index, settings, word)
        }
        NarrationState::SpeakingSingleWord => {
            if let Some(ActiveUtterance::Word {
                index: speaking,
                interrupted,
                ..
            }) = session.active.as_mut()
            {
                interrupted.position = Some(word);
                debug!(word, speaking = *speaking, "Seek recorded for after the current word");
            }
            Vec::new()
        }
        _ => {
            session.pending_seek = Some(word);
            debug!(word, state = %session.state, "Seek recorded for next play");
            Vec::new()
        }
    }
}

fn on_select_voice(session: &mut NarrationSession, voice: VoiceHandle) -> Vec<EngineCommand> {
    if session.selected_voice() == Some(&voice) {
        return Vec::new();
    }
    if !session.voices().contains(&voice) {
        warn!(voice = %voice, "Requested voice is not available");
        return Vec::new();
    }

    let mut commands = Vec::new();
    if session.state != NarrationState::Idle {
        commands.extend(on_stop(session));
    }
    session.voices.select(&voice);
    info!(voice = %voice, "Selected voice");
    commands
}

fn on_voices_changed(
    session: &mut NarrationSession,
    voices: Vec<VoiceHandle>,
    available: bool,
) -> Vec<EngineCommand> {
    session.engine_available = available;
    let selection_changed = session.voices.replace(voices);
    if session.state == NarrationState::Idle {
        return Vec::new();
    }
    if !session.can_speak() {
        warn!("Speech engine became unavailable; stopping narration");
        return on_stop(session);
    }
    if selection_changed {
        info!("Selected voice changed during playback; stopping");
        return on_stop(session);
    }
    Vec::new()
}

fn on_engine_event(
    session: &mut NarrationSession,
    index: &WordIndex,
    settings: &NarrationSettings,
    event: EngineEvent,
) -> Vec<EngineCommand> {
    let Some(active) = session.active else {
        debug!(
            generation = event.generation(),
            "Ignoring engine event with no active utterance"
        );
        return Vec::new();
    };
    if active.generation() != event.generation() {
        debug!(
            generation = event.generation(),
            current = active.generation(),
            "Ignoring stale engine event"
        );
        return Vec::new();
    }

    match event {
        EngineEvent::Started { generation } => {
            trace!(generation, "Utterance started");
            Vec::new()
        }
        EngineEvent::Boundary {
            generation,
            kind,
            char_index,
        } => {
            let ActiveUtterance::Document { next_word, .. } = active else {
                return Vec::new();
            };
            if kind != BoundaryKind::Word || index.is_empty() {
                trace!(generation, ?kind, char_index, "Ignoring non-word boundary");
                return Vec::new();
            }
            let word = next_word.min(index.len() - 1);
            session.current_word_index = Some(word);
            session.active = Some(ActiveUtterance::Document {
                generation,
                next_word: (next_word + 1).min(index.len()),
            });
            trace!(generation, word, char_index, "Word boundary");
            Vec::new()
        }
        EngineEvent::Ended { .. } => finish(session, index, settings, active),
        EngineEvent::Failed { generation, reason } => {
            warn!(generation, %reason, "Speech engine reported an error");
            finish(session, index, settings, active)
        }
    }
}

fn finish(
    session: &mut NarrationSession,
    index: &WordIndex,
    settings: &NarrationSettings,
    active: ActiveUtterance,
) -> Vec<EngineCommand> {
    session.active = None;
    session.current_word_index = None;

    let ActiveUtterance::Word { interrupted, .. } = active else {
        session.state = NarrationState::Idle;
        session.pending_seek = None;
        info!("Document narration finished");
        return Vec::new();
    };

    if settings.after_word == AfterWordPolicy::Idle {
        session.state = NarrationState::Idle;
        session.pending_seek = None;
        debug!("Word finished; returning to idle");
        return Vec::new();
    }

    match interrupted.state {
        NarrationState::Playing if session.can_speak() && !index.is_empty() => {
            debug!(position = ?interrupted.position, "Word finished; resuming document");
            start_document(session, index, settings, interrupted.position.unwrap_or(0))
        }
        NarrationState::Paused => {
            session.state = NarrationState::Paused;
            session.pending_seek = Some(interrupted.position.unwrap_or(0));
            debug!(position = ?interrupted.position, "Word finished; back to paused");
            Vec::new()
        }
        _ => {
            session.state = NarrationState::Idle;
            session.pending_seek = interrupted.position;
            debug!("Word finished; back to idle");
            Vec::new()
        }
    }
}
