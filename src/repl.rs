use std::io::Write;
use std::path::Path;

use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::chat::ChatSession;
use crate::commands::{suggested_question, Command, HELP};
use crate::config::Cli;
use crate::error::ChatError;
use crate::llm::openai::OpenAiGateway;
use crate::llm::{ChatGateway, ProviderErrorKind};
use crate::logging;
use crate::prompt::SUGGESTED_QUESTIONS;
use crate::session::MAX_QUESTIONS;

/// Entry point of the `bid-box` binary.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::load();
    logging::init(cli.log_file.as_deref())?;

    let gateway = OpenAiGateway::with_timeout(cli.request_timeout())?;
    let mut chat = ChatSession::new(gateway, cli.provider.clone());
    tracing::info!(config = ?chat.config(), "starting");

    if let Some(path) = &cli.document {
        load(&mut chat, path);
    }
    println!("{}", HELP);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!(
            "[{}/{}] > ",
            chat.session().question_count(),
            MAX_QUESTIONS
        );
        std::io::stdout().flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };

        let command = match Command::parse(&line) {
            None => continue,
            Some(Ok(command)) => command,
            Some(Err(message)) => {
                eprintln!("{}", message);
                continue;
            }
        };

        match command {
            Command::Ask(question) => answer(&mut chat, &question).await?,
            Command::Pick { number, language } => {
                if let Some(question) = suggested_question(number, language) {
                    println!("> {}", question);
                    answer(&mut chat, question).await?;
                }
            }
            Command::Load(path) => {
                if load(&mut chat, Path::new(&path)) {
                    chat.reset();
                }
            }
            Command::Sections => print_sections(&chat),
            Command::Select(indices) => {
                chat.select_sections(indices);
                let active: Vec<String> = chat
                    .documents()
                    .selection()
                    .iter()
                    .map(u32::to_string)
                    .collect();
                println!("Active sections: {}", display_list(&active));
            }
            Command::Suggest => {
                for (n, (thai, english)) in SUGGESTED_QUESTIONS.iter().enumerate() {
                    println!("{}. {}\n   {}", n + 1, english, thai);
                }
            }
            Command::Reset => {
                chat.reset();
                println!("Session reset.");
            }
            Command::Status => println!(
                "Questions: {}/{}  model: {}  session: {}",
                chat.session().question_count(),
                MAX_QUESTIONS,
                chat.config().model(),
                chat.session().id()
            ),
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
        }
    }

    Ok(())
}

fn load<G: ChatGateway>(chat: &mut ChatSession<G>, path: &Path) -> bool {
    match chat.load_file(path) {
        Ok(document) => {
            println!(
                "Loaded {} with {} sections.",
                path.display(),
                document.sections().len()
            );
            print_sections(chat);
            true
        }
        Err(e) => {
            eprintln!("Could not load {}: {}", path.display(), e);
            false
        }
    }
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn print_sections<G: ChatGateway>(chat: &ChatSession<G>) {
    let store = chat.documents();
    let Some(document) = store.document() else {
        println!("No document loaded. Use /load <path>.");
        return;
    };
    for section in document.sections() {
        let mark = if store.is_selected(section.index) { '*' } else { ' ' };
        println!("{} {:>2}. {}", mark, section.index, section.title);
    }
    let missing: Vec<String> = document
        .missing_sections()
        .iter()
        .map(u32::to_string)
        .collect();
    if !missing.is_empty() {
        println!("Missing sections: {}", missing.join(", "));
    }
}

async fn answer<G: ChatGateway>(chat: &mut ChatSession<G>, question: &str) -> anyhow::Result<()> {
    let mut stream = match chat.ask(question) {
        Ok(stream) => stream,
        Err(e) => {
            report(&e);
            return Ok(());
        }
    };

    let mut completed = true;
    loop {
        tokio::select! {
            item = stream.next() => match item {
                Some(Ok(fragment)) => {
                    print!("{}", fragment);
                    std::io::stdout().flush()?;
                }
                Some(Err(e)) => {
                    println!();
                    report(&e);
                    completed = false;
                    break;
                }
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\n[cancelled]");
                completed = false;
                break;
            }
        }
    }
    drop(stream);

    if completed {
        println!("\n");
        if chat.session().question_count() == 0 {
            println!(
                "[INFO: You have used all {} questions. A new session has started.]",
                MAX_QUESTIONS
            );
        }
    }
    Ok(())
}

fn report(error: &ChatError) {
    eprintln!("Error: {}", error);
    let hint = match error {
        ChatError::Provider(e) => match e.kind() {
            ProviderErrorKind::Unauthorized => "Check API_KEY.",
            ProviderErrorKind::ModelNotFound => {
                "Model or endpoint not found. Check DEFAULT_MODEL and BASE_URL."
            }
            ProviderErrorKind::Transient => "The provider is unavailable. You can ask again.",
            ProviderErrorKind::Rejected => return,
        },
        ChatError::SessionLimit(_) => "Use /reset to start a new session.",
        ChatError::Parse(_) => "Load another document with /load.",
        ChatError::EmptyQuestion => return,
    };
    eprintln!("{}", hint);
}
