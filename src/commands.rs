//! Input lines of the terminal front-end.

use crate::prompt::{Language, SUGGESTED_QUESTIONS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    Load(String),
    Sections,
    Select(Vec<u32>),
    Suggest,
    Pick { number: usize, language: Language },
    Reset,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
Type a question to ask it. Commands:
  /load <path>        load a .pdf, .txt or .md document (resets the session)
  /sections           list sections; * marks active ones
  /select 2,4,5       choose the active sections (empty clears them)
  /suggest            list suggested questions
  /pick <n> [th|en]   ask suggested question n
  /reset              start a new session
  /status             show questions used
  /help               show this help
  /quit               exit";

impl Command {
    /// `None` for blank input.
    pub fn parse(line: &str) -> Option<Result<Command, String>> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Ok(Command::Ask(line.to_string())));
        };

        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };

        let command = match name {
            "load" if !arg.is_empty() => Ok(Command::Load(arg.to_string())),
            "load" => Err("usage: /load <path>".to_string()),
            "sections" => Ok(Command::Sections),
            "select" => parse_indices(arg).map(Command::Select),
            "suggest" => Ok(Command::Suggest),
            "pick" => parse_pick(arg),
            "reset" => Ok(Command::Reset),
            "status" => Ok(Command::Status),
            "help" | "?" => Ok(Command::Help),
            "quit" | "exit" | "q" => Ok(Command::Quit),
            other => Err(format!("unknown command /{} (try /help)", other)),
        };
        Some(command)
    }
}

fn parse_indices(arg: &str) -> Result<Vec<u32>, String> {
    arg.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u32>()
                .map_err(|_| format!("not a section number: {}", s))
        })
        .collect()
}

fn parse_pick(arg: &str) -> Result<Command, String> {
    let mut parts = arg.split_whitespace();
    let number = parts
        .next()
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|n| (1..=SUGGESTED_QUESTIONS.len()).contains(n))
        .ok_or_else(|| format!("usage: /pick <1-{}> [th|en]", SUGGESTED_QUESTIONS.len()))?;
    let language = match parts.next() {
        None | Some("en") => Language::English,
        Some("th") => Language::Thai,
        Some(other) => return Err(format!("unknown language: {}", other)),
    };
    Ok(Command::Pick { number, language })
}

/// The suggested question `number` (1-based) in `language`.
pub fn suggested_question(number: usize, language: Language) -> Option<&'static str> {
    let (thai, english) = SUGGESTED_QUESTIONS.get(number.checked_sub(1)?)?;
    Some(match language {
        Language::Thai => *thai,
        Language::English => *english,
    })
}
