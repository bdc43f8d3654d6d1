//! Narration controller.
//!
//! `transition` is a pure reducer over [`NarrationSession`]; the controller
//! owns the speech engine and executes the commands the reducer returns.
//! Every utterance carries a fresh generation and engine callbacks from any
//! other generation are dropped, so at most one utterance ever drives state.

mod state;
mod transitions;

pub use state::{NarrationSession, NarrationState};
pub use transitions::NarrationEvent;

use crate::config::{AfterWordPolicy, AppConfig};
use crate::engine::{EngineEvent, SpeechEngine, VoiceHandle};
use crate::voices::VoiceSelector;
use crate::word_index::WordIndex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use transitions::transition;

/// Playback knobs the reducer consults; resolved once from config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NarrationSettings {
    pub after_word: AfterWordPolicy,
    pub native_pause: bool,
    pub rate: f32,
    pub volume: f32,
}

impl Default for NarrationSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

impl NarrationSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            after_word: config.after_word,
            native_pause: config.native_pause,
            rate: config.speech_rate,
            volume: config.speech_volume,
        }
    }
}

pub struct NarrationController<E: SpeechEngine> {
    engine: E,
    index: Arc<WordIndex>,
    session: NarrationSession,
    settings: NarrationSettings,
}

impl<E: SpeechEngine> NarrationController<E> {
    pub fn new(
        engine: E,
        index: Arc<WordIndex>,
        settings: NarrationSettings,
        voices: VoiceSelector,
    ) -> Self {
        let available = engine.is_available();
        if !available {
            warn!("Speech engine unavailable; narration disabled");
        }
        let session = NarrationSession::new(&index, voices, available);
        let mut controller = Self {
            engine,
            index,
            session,
            settings,
        };
        controller.refresh_voices();
        controller
    }

    pub fn from_config(engine: E, index: Arc<WordIndex>, config: &AppConfig) -> Self {
        let voices = VoiceSelector::new(
            config.voice_language_prefix.clone(),
            config.preferred_voice.clone(),
        );
        Self::new(engine, index, NarrationSettings::from_config(config), voices)
    }

    /// Run one event through the reducer and hand its commands to the engine.
    pub fn dispatch(&mut self, event: NarrationEvent) {
        let commands = transition(&mut self.session, &self.index, &self.settings, event);
        for command in commands {
            self.engine.execute(command);
        }
    }

    pub fn play(&mut self) {
        self.dispatch(NarrationEvent::Play);
    }

    pub fn pause(&mut self) {
        self.dispatch(NarrationEvent::Pause);
    }

    pub fn stop(&mut self) {
        self.dispatch(NarrationEvent::Stop);
    }

    pub fn toggle_play_pause(&mut self) {
        self.dispatch(NarrationEvent::TogglePlayPause);
    }

    pub fn speak_word(&mut self, index: usize) {
        self.dispatch(NarrationEvent::SpeakWord { index });
    }

    pub fn seek(&mut self, index: usize) {
        self.dispatch(NarrationEvent::Seek { index });
    }

    pub fn select_voice(&mut self, voice: VoiceHandle) {
        self.dispatch(NarrationEvent::SelectVoice { voice });
    }

    /// Select by name, case-insensitively. Returns false for unknown names.
    pub fn select_voice_by_name(&mut self, name: &str) -> bool {
        let Some(voice) = self.session.voices.find_by_name(name).cloned() else {
            debug!(name, "No voice with that name");
            return false;
        };
        self.select_voice(voice);
        true
    }

    /// Re-enumerate voices and availability from the engine.
    pub fn refresh_voices(&mut self) {
        let available = self.engine.is_available();
        let voices = self.engine.voices();
        self.dispatch(NarrationEvent::VoicesChanged { voices, available });
    }

    pub fn handle_engine_event(&mut self, event: EngineEvent) {
        self.dispatch(NarrationEvent::Engine(event));
    }

    /// Swap in a new document. Returns false when the content is unchanged,
    /// in which case playback continues untouched.
    pub fn load_document(&mut self, index: Arc<WordIndex>) -> bool {
        if index.fingerprint() == self.index.fingerprint() {
            debug!("Document unchanged; keeping narration state");
            return false;
        }
        self.stop();
        self.session.reset_for(&index);
        self.index = index;
        info!(words = self.index.len(), "Loaded story document");
        true
    }

    pub fn state(&self) -> NarrationState {
        self.session.state()
    }

    pub fn current_word_index(&self) -> Option<usize> {
        self.session.current_word_index()
    }

    pub fn selected_voice(&self) -> Option<&VoiceHandle> {
        self.session.selected_voice()
    }

    pub fn voices(&self) -> &[VoiceHandle] {
        self.session.voices()
    }

    pub fn session(&self) -> &NarrationSession {
        &self.session
    }

    pub fn index(&self) -> &Arc<WordIndex> {
        &self.index
    }

    pub fn settings(&self) -> &NarrationSettings {
        &self.settings
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }
}

impl<E: SpeechEngine> Drop for NarrationController<E> {
    fn drop(&mut self) {
        if self.session.active.is_some() {
            debug!("Cancelling speech on controller teardown");
            self.engine.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::RecordingEngine;
    use crate::engine::{BoundaryKind, EngineCommand, UtteranceKind};
    use proptest::prelude::*;

    const STORY: &str = "<p>Once upon a <em>time</em> there was a fox.</p>";

    fn controller_with(
        engine: RecordingEngine,
        settings: NarrationSettings,
    ) -> NarrationController<RecordingEngine> {
        NarrationController::new(
            engine,
            Arc::new(WordIndex::from_html(STORY)),
            settings,
            VoiceSelector::new("en", None),
        )
    }

    fn controller() -> NarrationController<RecordingEngine> {
        controller_with(RecordingEngine::english(), NarrationSettings::default())
    }

    fn boundary(controller: &mut NarrationController<RecordingEngine>) {
        let generation = controller
            .engine()
            .active
            .as_ref()
            .map(|u| u.generation)
            .expect("an utterance should be active");
        controller.handle_engine_event(EngineEvent::Boundary {
            generation,
            kind: BoundaryKind::Word,
            char_index: 0,
        });
    }

    fn finish(controller: &mut NarrationController<RecordingEngine>) {
        let event = controller
            .engine_mut()
            .finish()
            .expect("an utterance should be active");
        controller.handle_engine_event(event);
    }

    #[test]
    fn english_voices_only_and_first_selected() {
        let controller = controller();
        let names: Vec<&str> = controller.voices().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Claire"]);
        assert_eq!(
            controller.selected_voice().map(|v| v.name.as_str()),
            Some("Alice")
        );
    }

    #[test]
    fn play_narrates_full_text_and_tracks_boundaries() {
        let mut controller = controller();
        controller.play();

        assert_eq!(controller.state(), NarrationState::Playing);
        assert_eq!(controller.current_word_index(), None);
        let spoken = controller.engine().last_spoken().expect("speech expected");
        assert_eq!(spoken.kind, UtteranceKind::Document);
        assert_eq!(spoken.text, "Once upon a time there was a fox.");
        assert_eq!(spoken.voice.as_ref().map(|v| v.name.as_str()), Some("Alice"));

        let mut seen = Vec::new();
        for _ in 0..3 {
            boundary(&mut controller);
            seen.push(controller.current_word_index().expect("word index"));
        }
        assert_eq!(seen, vec![0, 1, 2]);

        finish(&mut controller);
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);
    }

    #[test]
    fn every_speak_is_preceded_by_cancel() {
        let mut controller = controller();
        controller.play();
        controller.speak_word(4);
        controller.speak_word(5);

        let commands = &controller.engine().commands;
        for (position, command) in commands.iter().enumerate() {
            if matches!(command, EngineCommand::Speak(_)) {
                assert_eq!(commands[position - 1], EngineCommand::Cancel);
            }
        }
        assert_eq!(controller.engine().overlaps, 0);
    }

    #[test]
    fn clicked_word_interrupts_playback() {
        let mut controller = controller();
        controller.play();
        boundary(&mut controller);
        boundary(&mut controller);

        controller.speak_word(3);
        assert_eq!(controller.state(), NarrationState::SpeakingSingleWord);
        assert_eq!(controller.current_word_index(), Some(3));
        let spoken = controller.engine().last_spoken().expect("speech expected");
        assert_eq!(spoken.kind, UtteranceKind::Word);
        assert_eq!(spoken.text, "time");
        assert_eq!(controller.engine().overlaps, 0);
    }

    #[test]
    fn stale_events_from_interrupted_utterance_are_ignored() {
        let mut controller = controller();
        controller.play();
        let document_generation = controller.engine().last_spoken().map(|u| u.generation);
        let document_generation = document_generation.expect("document generation");

        controller.speak_word(2);
        controller.handle_engine_event(EngineEvent::Boundary {
            generation: document_generation,
            kind: BoundaryKind::Word,
            char_index: 12,
        });
        controller.handle_engine_event(EngineEvent::Ended {
            generation: document_generation,
        });

        assert_eq!(controller.state(), NarrationState::SpeakingSingleWord);
        assert_eq!(controller.current_word_index(), Some(2));
    }

    #[test]
    fn word_completion_resumes_interrupted_playback() {
        let mut controller = controller();
        controller.play();
        boundary(&mut controller);
        boundary(&mut controller);
        assert_eq!(controller.current_word_index(), Some(1));

        controller.speak_word(6);
        finish(&mut controller);

        assert_eq!(controller.state(), NarrationState::Playing);
        assert_eq!(controller.current_word_index(), None);
        let spoken = controller.engine().last_spoken().expect("speech expected");
        assert_eq!(spoken.kind, UtteranceKind::Document);
        assert_eq!(spoken.text, "upon a time there was a fox.");
    }

    #[test]
    fn word_completion_from_idle_returns_to_idle() {
        let mut controller = controller();
        controller.speak_word(0);
        assert_eq!(
            controller.engine().last_spoken().map(|u| u.text.as_str()),
            Some("Once")
        );
        finish(&mut controller);
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);
    }

    #[test]
    fn idle_policy_never_resumes() {
        let settings = NarrationSettings {
            after_word: AfterWordPolicy::Idle,
            ..NarrationSettings::default()
        };
        let mut controller = controller_with(RecordingEngine::english(), settings);
        controller.play();
        controller.speak_word(1);
        let spoken_before = controller.engine().spoken.len();
        finish(&mut controller);

        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);
        assert_eq!(controller.engine().spoken.len(), spoken_before);
    }

    #[test]
    fn word_completion_while_paused_stays_paused() {
        let mut controller = controller();
        controller.play();
        boundary(&mut controller);
        boundary(&mut controller);
        controller.pause();
        controller.speak_word(7);
        finish(&mut controller);

        assert_eq!(controller.state(), NarrationState::Paused);
        assert_eq!(controller.current_word_index(), None);
        assert_eq!(controller.session().pending_seek(), Some(1));

        controller.play();
        assert_eq!(controller.state(), NarrationState::Playing);
        assert_eq!(
            controller.engine().last_spoken().map(|u| u.text.as_str()),
            Some("upon a time there was a fox.")
        );
    }

    #[test]
    fn stop_clears_state_from_every_state() {
        let mut controller = controller();
        controller.stop();
        assert_eq!(controller.state(), NarrationState::Idle);

        controller.play();
        controller.stop();
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);

        controller.play();
        controller.pause();
        controller.stop();
        assert_eq!(controller.state(), NarrationState::Idle);

        controller.speak_word(2);
        controller.stop();
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);
        assert!(controller.engine().active.is_none());
    }

    #[test]
    fn native_pause_then_resume() {
        let mut controller = controller();
        controller.play();
        boundary(&mut controller);
        controller.pause();
        assert_eq!(controller.state(), NarrationState::Paused);
        assert_eq!(controller.engine().commands.last(), Some(&EngineCommand::Pause));
        assert_eq!(controller.current_word_index(), Some(0));

        controller.play();
        assert_eq!(controller.state(), NarrationState::Playing);
        assert_eq!(controller.engine().commands.last(), Some(&EngineCommand::Resume));
        assert_eq!(controller.engine().spoken.len(), 1);
    }

    #[test]
    fn cancelling_pause_restarts_from_current_word() {
        let settings = NarrationSettings {
            native_pause: false,
            ..NarrationSettings::default()
        };
        let mut controller = controller_with(RecordingEngine::english(), settings);
        controller.play();
        boundary(&mut controller);
        boundary(&mut controller);
        boundary(&mut controller);
        controller.pause();
        assert_eq!(controller.engine().commands.last(), Some(&EngineCommand::Cancel));
        assert!(controller.engine().active.is_none());

        controller.play();
        assert_eq!(
            controller.engine().last_spoken().map(|u| u.text.as_str()),
            Some("a time there was a fox.")
        );
    }

    #[test]
    fn toggle_alternates_play_and_pause() {
        let mut controller = controller();
        controller.toggle_play_pause();
        assert_eq!(controller.state(), NarrationState::Playing);
        controller.toggle_play_pause();
        assert_eq!(controller.state(), NarrationState::Paused);
        controller.toggle_play_pause();
        assert_eq!(controller.state(), NarrationState::Playing);
    }

    #[test]
    fn seek_restarts_playback_or_waits_for_play() {
        let mut controller = controller();
        controller.seek(4);
        assert_eq!(controller.state(), NarrationState::Idle);
        controller.play();
        assert_eq!(
            controller.engine().last_spoken().map(|u| u.text.as_str()),
            Some("there was a fox.")
        );

        controller.seek(7);
        assert_eq!(controller.state(), NarrationState::Playing);
        assert_eq!(
            controller.engine().last_spoken().map(|u| u.text.as_str()),
            Some("fox.")
        );

        controller.seek(99);
        assert_eq!(
            controller.engine().last_spoken().map(|u| u.text.as_str()),
            Some("fox.")
        );
        assert_eq!(controller.engine().overlaps, 0);
    }

    #[test]
    fn out_of_range_word_is_ignored() {
        let mut controller = controller();
        controller.speak_word(42);
        assert_eq!(controller.state(), NarrationState::Idle);
        assert!(controller.engine().commands.is_empty());
    }

    #[test]
    fn selecting_voice_stops_playback() {
        let mut controller = controller();
        controller.play();
        boundary(&mut controller);

        controller.select_voice(VoiceHandle::new("Claire", "en-GB"));
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);
        assert_eq!(
            controller.selected_voice().map(|v| v.name.as_str()),
            Some("Claire")
        );
        assert_eq!(controller.engine().commands.last(), Some(&EngineCommand::Cancel));

        controller.play();
        let spoken = controller.engine().last_spoken().expect("speech expected");
        assert_eq!(spoken.voice.as_ref().map(|v| v.name.as_str()), Some("Claire"));
    }

    #[test]
    fn selecting_unknown_voice_changes_nothing() {
        let mut controller = controller();
        controller.play();
        controller.select_voice(VoiceHandle::new("Bruno", "pt-BR"));
        assert_eq!(controller.state(), NarrationState::Playing);
        assert!(!controller.select_voice_by_name("nobody"));
        assert!(controller.select_voice_by_name("claire"));
        assert_eq!(controller.state(), NarrationState::Idle);
    }

    #[test]
    fn no_voices_disables_narration() {
        let mut controller =
            controller_with(RecordingEngine::with_voices(Vec::new()), NarrationSettings::default());
        controller.play();
        controller.speak_word(0);
        assert_eq!(controller.state(), NarrationState::Idle);
        assert!(controller.engine().commands.is_empty());
        assert!(!controller.session().can_speak());
    }

    #[test]
    fn unavailable_engine_disables_narration() {
        let mut engine = RecordingEngine::english();
        engine.available = false;
        let mut controller = controller_with(engine, NarrationSettings::default());
        controller.play();
        controller.toggle_play_pause();
        assert_eq!(controller.state(), NarrationState::Idle);
        assert!(controller.engine().commands.is_empty());
    }

    #[test]
    fn late_voices_enable_narration() {
        let mut controller =
            controller_with(RecordingEngine::with_voices(Vec::new()), NarrationSettings::default());
        controller.engine_mut().voices = vec![VoiceHandle::new("Dora", "en-AU")];
        controller.refresh_voices();
        controller.play();
        assert_eq!(controller.state(), NarrationState::Playing);
    }

    #[test]
    fn losing_selected_voice_stops_playback() {
        let mut controller = controller();
        controller.play();
        controller.engine_mut().voices = vec![VoiceHandle::new("Claire", "en-GB")];
        controller.refresh_voices();
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(
            controller.selected_voice().map(|v| v.name.as_str()),
            Some("Claire")
        );
    }

    #[test]
    fn engine_going_away_stops_playback() {
        let mut controller = controller();
        controller.play();
        boundary(&mut controller);
        controller.engine_mut().available = false;
        controller.refresh_voices();

        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);
        assert_eq!(controller.engine().commands.last(), Some(&EngineCommand::Cancel));
        assert!(!controller.session().can_speak());

        let issued = controller.engine().commands.len();
        controller.play();
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.engine().commands.len(), issued);

        controller.engine_mut().available = true;
        controller.refresh_voices();
        controller.play();
        assert_eq!(controller.state(), NarrationState::Playing);
    }

    #[test]
    fn reloading_same_document_keeps_playback() {
        let mut controller = controller();
        controller.play();
        assert!(!controller.load_document(Arc::new(WordIndex::from_html(STORY))));
        assert_eq!(controller.state(), NarrationState::Playing);
    }

    #[test]
    fn loading_new_document_resets_and_ignores_old_callbacks() {
        let mut controller = controller();
        controller.play();
        let old_generation = controller.engine().last_spoken().map(|u| u.generation);
        let old_generation = old_generation.expect("generation");

        assert!(controller.load_document(Arc::new(WordIndex::from_html("<p>New tale</p>"))));
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.session().full_text(), "New tale");

        controller.play();
        controller.handle_engine_event(EngineEvent::Ended {
            generation: old_generation,
        });
        assert_eq!(controller.state(), NarrationState::Playing);
        assert_eq!(
            controller.engine().last_spoken().map(|u| u.text.as_str()),
            Some("New tale")
        );
    }

    #[test]
    fn empty_document_never_speaks() {
        let mut controller = NarrationController::new(
            RecordingEngine::english(),
            Arc::new(WordIndex::from_html("<script>alert(1)</script>")),
            NarrationSettings::default(),
            VoiceSelector::new("en", None),
        );
        controller.play();
        controller.speak_word(0);
        assert_eq!(controller.state(), NarrationState::Idle);
        assert!(controller.engine().spoken.is_empty());
    }

    #[test]
    fn failed_utterance_ends_playback() {
        let mut controller = controller();
        controller.play();
        let generation = controller.session().active_generation().expect("active");
        controller.handle_engine_event(EngineEvent::Failed {
            generation,
            reason: "audio device lost".to_string(),
        });
        assert_eq!(controller.state(), NarrationState::Idle);
        assert_eq!(controller.current_word_index(), None);
    }

    #[derive(Debug, Clone)]
    enum Op {
        Play,
        Pause,
        Stop,
        Toggle,
        SpeakWord(usize),
        Seek(usize),
        Voice(bool),
        Boundary,
        Finish,
        StaleEnd(u64),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Play),
            Just(Op::Pause),
            Just(Op::Stop),
            Just(Op::Toggle),
            (0usize..10).prop_map(Op::SpeakWord),
            (0usize..10).prop_map(Op::Seek),
            any::<bool>().prop_map(Op::Voice),
            Just(Op::Boundary),
            Just(Op::Finish),
            (0u64..4).prop_map(Op::StaleEnd),
        ]
    }

    proptest! {
        #[test]
        fn random_command_sequences_keep_invariants(
            ops in proptest::collection::vec(op(), 0..40),
            native_pause in any::<bool>(),
            resume in any::<bool>(),
        ) {
            let settings = NarrationSettings {
                native_pause,
                after_word: if resume { AfterWordPolicy::Resume } else { AfterWordPolicy::Idle },
                ..NarrationSettings::default()
            };
            let mut controller = controller_with(RecordingEngine::english(), settings);
            let words = controller.index().len();

            for op in ops {
                match op {
                    Op::Play => controller.play(),
                    Op::Pause => controller.pause(),
                    Op::Stop => controller.stop(),
                    Op::Toggle => controller.toggle_play_pause(),
                    Op::SpeakWord(i) => controller.speak_word(i),
                    Op::Seek(i) => controller.seek(i),
                    Op::Voice(first) => {
                        let name = if first { "Alice" } else { "Claire" };
                        controller.select_voice_by_name(name);
                    }
                    Op::Boundary => {
                        let generation = controller.engine().active.as_ref().map(|u| u.generation);
                        if let Some(generation) = generation {
                            controller.handle_engine_event(EngineEvent::Boundary {
                                generation,
                                kind: BoundaryKind::Word,
                                char_index: 0,
                            });
                        }
                    }
                    Op::Finish => {
                        if let Some(event) = controller.engine_mut().finish() {
                            controller.handle_engine_event(event);
                        }
                    }
                    Op::StaleEnd(back) => {
                        let generation = controller.session().active_generation().unwrap_or(0);
                        if back > 0 && generation > back {
                            let before = (controller.state(), controller.current_word_index());
                            controller.handle_engine_event(EngineEvent::Ended {
                                generation: generation - back,
                            });
                            prop_assert_eq!(before, (controller.state(), controller.current_word_index()));
                        }
                    }
                }

                prop_assert_eq!(controller.engine().overlaps, 0);
                if let Some(index) = controller.current_word_index() {
                    prop_assert!(index < words);
                }
                if controller.state() == NarrationState::Idle {
                    prop_assert_eq!(controller.current_word_index(), None);
                    prop_assert!(controller.engine().active.is_none());
                }
            }
        }
    }
}
