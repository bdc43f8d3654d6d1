//! Entry point for the terminal story reader.
//!
//! Responsibilities here are intentionally minimal:
//! - Parse command-line arguments.
//! - Load user configuration from `conf/config.toml`.
//! - Load the story and open a narration session over the console engine.
//! - Feed typed commands and engine callbacks through one message loop.

mod console_engine;
mod messages;
mod story_loader;

use crate::console_engine::ConsoleEngine;
use crate::messages::{HELP, Message, parse_command};
use crate::story_loader::load_story;
use anyhow::{Context, Result, anyhow};
use narration_core::config::{load_config, serialize_config};
use narration_core::narration::NarrationState;
use narration_core::session::{NarrationCommand, ReaderSession, ReaderSnapshot};
use std::env;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

type ReloadHandle = reload::Handle<EnvFilter, tracing_subscriber::Registry>;

fn main() {
    let reload_handle = init_tracing();
    if let Err(err) = run(&reload_handle) {
        error!("{err:?}");
        std::process::exit(1);
    }
}

fn run(reload_handle: &ReloadHandle) -> Result<()> {
    let story_path = parse_args()?;
    let config = load_config(Path::new("conf/config.toml"));
    set_log_level(reload_handle, config.log_level.as_filter_str());
    info!(
        path = %story_path.display(),
        level = %config.log_level,
        after_word = %config.after_word,
        "Starting story reader"
    );

    let story = load_story(&story_path)?;
    let (tx, rx) = mpsc::channel();
    install_ctrlc_handler(tx.clone());
    spawn_input_reader(tx.clone()).context("Failed to start the input reader")?;

    let engine = ConsoleEngine::new(&config, tx);
    let mut session = ReaderSession::from_story(engine, &story, &config)?;
    print_snapshot(&session.snapshot());
    println!("{HELP}");

    let mut last_status = status_key(&session.snapshot());
    for message in rx {
        let snapshot = match message {
            Message::Command(command) => session.apply_command(command).snapshot,
            Message::Engine(event) => session.handle_engine_event(event).snapshot,
            Message::Show => {
                print_snapshot(&session.snapshot());
                continue;
            }
            Message::Status => {
                print_status(&session.snapshot());
                continue;
            }
            Message::ListVoices => {
                print_voices(&session.snapshot());
                continue;
            }
            Message::Load(path) => match load_story(&path) {
                Ok(story) => {
                    let event = session.apply_command(NarrationCommand::LoadDocument {
                        title: story.title,
                        html: story.story_html,
                    });
                    print_snapshot(&event.snapshot);
                    event.snapshot
                }
                Err(err) => {
                    warn!("{err:#}");
                    continue;
                }
            },
            Message::Config => {
                match serialize_config(&config) {
                    Ok(text) => print!("{text}"),
                    Err(err) => warn!("{err:#}"),
                }
                continue;
            }
            Message::Help => {
                println!("{HELP}");
                continue;
            }
            Message::Quit => break,
        };

        let status = status_key(&snapshot);
        if status != last_status {
            print_status(&snapshot);
            last_status = status;
        }
    }

    session.apply_command(NarrationCommand::Stop);
    info!("Story reader shut down");
    Ok(())
}

fn parse_args() -> Result<PathBuf> {
    let mut args = env::args().skip(1);
    let path = args
        .next()
        .ok_or_else(|| anyhow!("Usage: story-reader <story.html|story.json>"))?;

    let path = PathBuf::from(path);
    if !path.exists() {
        return Err(anyhow!("File not found: {}", path.as_path().display()));
    }
    Ok(path)
}

fn install_ctrlc_handler(tx: Sender<Message>) {
    if let Err(err) = ctrlc::set_handler(move || {
        info!("Received Ctrl+C; stopping narration");
        let _ = tx.send(Message::Quit);
    }) {
        warn!("Failed to install Ctrl+C signal handler: {err}");
    }
}

fn spawn_input_reader(tx: Sender<Message>) -> Result<()> {
    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("Failed to read input: {err}");
                        break;
                    }
                };
                match parse_command(&line) {
                    Ok(Some(message)) => {
                        if tx.send(message).is_err() {
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(err) => println!("{err:#}"),
                }
            }
            let _ = tx.send(Message::Quit);
        })?;
    Ok(())
}

fn status_key(snapshot: &ReaderSnapshot) -> (NarrationState, Option<usize>) {
    (
        snapshot.narration.state,
        snapshot.narration.current_word_index,
    )
}

fn print_snapshot(snapshot: &ReaderSnapshot) {
    println!("== {} ({} words) ==", snapshot.title, snapshot.word_count);
    println!("{}", snapshot.markup);
    print_status(snapshot);
}

fn print_status(snapshot: &ReaderSnapshot) {
    let narration = &snapshot.narration;
    if !narration.available {
        println!("[narration unavailable: no usable voices]");
        return;
    }
    let word = narration
        .current_word_index
        .map(|index| format!("word {}/{}", index + 1, snapshot.word_count))
        .unwrap_or_else(|| "-".to_string());
    let voice = narration
        .selected_voice
        .as_ref()
        .map(|voice| voice.to_string())
        .unwrap_or_else(|| "no voice".to_string());
    println!("[{}] {} | {}", narration.state, word, voice);
}

fn print_voices(snapshot: &ReaderSnapshot) {
    let selected = snapshot.narration.selected_voice.as_ref();
    for voice in &snapshot.narration.voices {
        let marker = if Some(voice) == selected { "*" } else { " " };
        println!("{marker} {voice}");
    }
}

fn init_tracing() -> ReloadHandle {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let (filter_layer, handle) = reload::Layer::new(env_filter);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .with_filter(filter_layer),
        )
        .init();
    warn!("Logging initialized; override level with config.log_level or RUST_LOG");
    handle
}

fn set_log_level(handle: &ReloadHandle, level: &str) {
    let parsed = EnvFilter::builder()
        .parse(level)
        .unwrap_or_else(|_| EnvFilter::new("debug"));
    if let Err(err) = handle.modify(|filter| *filter = parsed.clone()) {
        warn!(%level, "Failed to update log level from config: {err}");
    } else {
        info!(%level, "Applied log level from config");
    }
}
