//! Terminal speech engine.
//!
//! Each utterance runs on its own worker thread that "speaks" by printing
//! words at the configured pace and reports start, word boundaries and end
//! back to the reader loop. Cancelled utterances still report their end, the
//! same way browser engines do, and the narration controller discards those
//! callbacks by generation.

use crate::messages::Message;
use narration_core::config::AppConfig;
use narration_core::engine::{BoundaryKind, EngineEvent, SpeechEngine, Utterance, VoiceHandle};
use narration_core::text_utils::word_spans;
use std::io::{self, Write};
use std::sync::mpsc::Sender;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Clone, Debug, Default)]
struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

struct Playback {
    cancel: CancellationToken,
    paused: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

pub struct ConsoleEngine {
    voices: Vec<VoiceHandle>,
    words_per_minute: u32,
    events: Sender<Message>,
    echo: bool,
    playback: Option<Playback>,
}

impl ConsoleEngine {
    pub fn new(config: &AppConfig, events: Sender<Message>) -> Self {
        info!(
            voices = config.engine_voices.len(),
            words_per_minute = config.engine_words_per_minute,
            "Console speech engine ready"
        );
        Self {
            voices: config.engine_voices.clone(),
            words_per_minute: config.engine_words_per_minute,
            events,
            echo: true,
            playback: None,
        }
    }

    /// Keep spoken words off stdout.
    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }

    fn word_delay(&self, rate: f32) -> Duration {
        let rate = if rate.is_finite() && rate > 0.0 { rate } else { 1.0 };
        let words_per_second = self.words_per_minute.max(1) as f32 * rate / 60.0;
        Duration::from_secs_f32(1.0 / words_per_second)
    }

    /// Drop the handle of a worker that already finished on its own.
    fn reap_finished(&mut self) {
        if self
            .playback
            .as_ref()
            .is_some_and(|playback| playback.handle.is_finished())
        {
            self.playback = None;
        }
    }
}

impl SpeechEngine for ConsoleEngine {
    fn is_available(&self) -> bool {
        true
    }

    fn voices(&self) -> Vec<VoiceHandle> {
        self.voices.clone()
    }

    fn speak(&mut self, utterance: Utterance) {
        self.reap_finished();
        if self.playback.is_some() {
            warn!(
                generation = utterance.generation,
                "Speak requested while another utterance is active; cancelling it"
            );
            self.cancel();
        }

        let cancel = CancellationToken::default();
        let paused = Arc::new(AtomicBool::new(false));
        let delay = self.word_delay(utterance.rate);
        let events = self.events.clone();
        let echo = self.echo;
        debug!(
            generation = utterance.generation,
            kind = ?utterance.kind,
            voice = ?utterance.voice.as_ref().map(|v| v.name.as_str()),
            volume = utterance.volume,
            delay_ms = delay.as_millis() as u64,
            "Starting console utterance"
        );

        let worker_cancel = cancel.clone();
        let worker_paused = Arc::clone(&paused);
        let handle = thread::spawn(move || {
            speak_worker(utterance, delay, echo, &events, &worker_cancel, &worker_paused);
        });

        self.playback = Some(Playback {
            cancel,
            paused,
            handle,
        });
    }

    fn pause(&mut self) {
        if let Some(playback) = &self.playback {
            playback.paused.store(true, Ordering::Release);
        }
    }

    fn resume(&mut self) {
        if let Some(playback) = &self.playback {
            playback.paused.store(false, Ordering::Release);
        }
    }

    fn cancel(&mut self) {
        if let Some(playback) = self.playback.take() {
            playback.cancel.cancel();
            playback.paused.store(false, Ordering::Release);
        }
    }
}

impl Drop for ConsoleEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn speak_worker(
    utterance: Utterance,
    delay: Duration,
    echo: bool,
    events: &Sender<Message>,
    cancel: &CancellationToken,
    paused: &AtomicBool,
) {
    let generation = utterance.generation;
    let send = |event: EngineEvent| {
        // The reader loop may already be gone during shutdown.
        let _ = events.send(Message::Engine(event));
    };

    send(EngineEvent::Started { generation });
    for span in word_spans(&utterance.text) {
        if !wait(delay, cancel, paused) {
            break;
        }
        send(EngineEvent::Boundary {
            generation,
            kind: BoundaryKind::Word,
            char_index: span.start,
        });
        if echo {
            let mut stdout = io::stdout().lock();
            let _ = write!(stdout, "{} ", &utterance.text[span]);
            let _ = stdout.flush();
        }
    }
    if echo && !cancel.is_cancelled() {
        println!();
    }
    send(EngineEvent::Ended { generation });
}

/// Sleep for `delay` of unpaused time. Returns false once cancelled.
fn wait(delay: Duration, cancel: &CancellationToken, paused: &AtomicBool) -> bool {
    let mut remaining = delay;
    while !remaining.is_zero() {
        if cancel.is_cancelled() {
            return false;
        }
        if paused.load(Ordering::Acquire) {
            thread::sleep(POLL_INTERVAL);
            continue;
        }
        let step = remaining.min(POLL_INTERVAL);
        let started = Instant::now();
        thread::sleep(step);
        remaining = remaining.saturating_sub(started.elapsed());
    }
    !cancel.is_cancelled()
}
