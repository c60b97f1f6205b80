pub mod chat;
pub mod commands;
pub mod config;
pub mod doc_processor;
pub mod error;
pub mod knowledge;
pub mod llm;
pub mod logging;
pub mod prompt;
mod repl;
pub mod session;

pub use chat::{AnswerStream, ChatSession};
pub use config::ProviderConfig;
pub use error::{ChatError, ParseError, SessionLimitError};
pub use knowledge::{Document, DocumentStore, Section};
pub use llm::openai::OpenAiGateway;
pub use llm::{ChatGateway, ChatMessage, ProviderError, ProviderErrorKind, Role};
pub use prompt::Language;
pub use repl::run;
pub use session::SessionState;
