use anyhow::{Context, Result, bail};
use narration_core::engine::EngineEvent;
use narration_core::session::NarrationCommand;
use std::path::PathBuf;

/// Everything the reader loop reacts to: typed commands, engine callbacks and
/// shutdown requests, all funneled through one channel.
#[derive(Debug, Clone)]
pub enum Message {
    Command(NarrationCommand),
    Engine(EngineEvent),
    Show,
    Status,
    ListVoices,
    Load(PathBuf),
    Config,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  play | pause | toggle | stop
  word <n>        speak word n
  click <value>   speak the word whose index attribute is <value>
  seek <n>        continue narration from word n
  voice <name>    select a voice
  voices          list voices
  refresh         re-enumerate voices
  show            print the highlighted story
  status          print narration state
  load <path>     open another .html or .json story
  config          print the effective configuration
  help | quit";

/// Parse one line of terminal input. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Message>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let message = match verb.to_ascii_lowercase().as_str() {
        "play" | "p" => Message::Command(NarrationCommand::Play),
        "pause" => Message::Command(NarrationCommand::Pause),
        "toggle" | "t" => Message::Command(NarrationCommand::TogglePlayPause),
        "stop" | "s" => Message::Command(NarrationCommand::Stop),
        "word" | "w" => Message::Command(NarrationCommand::SpeakWord {
            index: parse_index(verb, rest)?,
        }),
        "click" => Message::Command(NarrationCommand::WordClicked {
            target: rest.to_string(),
        }),
        "seek" => Message::Command(NarrationCommand::Seek {
            index: parse_index(verb, rest)?,
        }),
        "voice" => {
            if rest.is_empty() {
                bail!("Usage: voice <name>");
            }
            Message::Command(NarrationCommand::SelectVoice {
                name: rest.to_string(),
            })
        }
        "voices" => Message::ListVoices,
        "refresh" => Message::Command(NarrationCommand::RefreshVoices),
        "show" => Message::Show,
        "status" => Message::Status,
        "load" => {
            if rest.is_empty() {
                bail!("Usage: load <path>");
            }
            Message::Load(PathBuf::from(rest))
        }
        "config" => Message::Config,
        "help" | "?" => Message::Help,
        "quit" | "q" | "exit" => Message::Quit,
        other => bail!("Unknown command '{other}' (type 'help')"),
    };
    Ok(Some(message))
}

fn parse_index(verb: &str, value: &str) -> Result<usize> {
    value
        .parse::<usize>()
        .with_context(|| format!("Usage: {verb} <word number>"))
}
