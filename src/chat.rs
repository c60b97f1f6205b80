//! One user session: document, selection, conversation and provider.

use std::path::Path;
use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::config::ProviderConfig;
use crate::doc_processor;
use crate::error::{ChatError, ParseError, SessionLimitError};
use crate::knowledge::{Document, DocumentStore};
use crate::llm::{ChatGateway, ChatMessage};
use crate::prompt::{compose, detect_language, estimate_tokens};
use crate::session::{SessionState, MAX_QUESTIONS};

/// Answer fragments for one question. Borrows the session until dropped;
/// the turn is recorded only if the stream is read to the end without error.
pub type AnswerStream<'a> = Pin<Box<dyn Stream<Item = Result<String, ChatError>> + Send + 'a>>;

pub struct ChatSession<G> {
    documents: DocumentStore,
    session: SessionState,
    gateway: G,
    config: ProviderConfig,
}

impl<G: ChatGateway> ChatSession<G> {
    pub fn new(gateway: G, config: ProviderConfig) -> Self {
        Self {
            documents: DocumentStore::new(),
            session: SessionState::new(),
            gateway,
            config,
        }
    }

    /// Ask one question against the active sections.
    ///
    /// Fails up front when the question is blank or the session is used up.
    /// Provider failures arrive as the last item of the stream and leave the
    /// session as it was. When the answer completes and uses the last
    /// question, the session resets itself.
    pub fn ask(&mut self, question: &str) -> Result<AnswerStream<'_>, ChatError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(ChatError::EmptyQuestion);
        }
        if !self.session.can_ask() {
            return Err(SessionLimitError { max: MAX_QUESTIONS }.into());
        }

        let knowledge = self.documents.active_knowledge_text();
        let language = detect_language(question);
        let messages = compose(self.session.history(), &knowledge, question);

        let input: usize = messages.iter().map(|m| estimate_tokens(&m.content)).sum();
        tracing::info!(
            session = %self.session.id(),
            model = self.config.model(),
            language = language.as_str(),
            question = self.session.question_count() + 1,
            max_questions = MAX_QUESTIONS,
            estimated_input_tokens = input,
            "sending question"
        );

        let mut upstream = self.gateway.stream_completion(messages, &self.config);
        let session = &mut self.session;
        let question = question.to_string();

        Ok(Box::pin(async_stream::stream! {
            let mut answer = String::new();
            while let Some(item) = upstream.next().await {
                match item {
                    Ok(fragment) => {
                        answer.push_str(&fragment);
                        yield Ok(fragment);
                    }
                    Err(e) => {
                        yield Err(ChatError::Provider(e));
                        return;
                    }
                }
            }

            tracing::debug!(chars = answer.chars().count(), "answer complete");
            let recorded = session.record_question(
                ChatMessage::user(question),
                ChatMessage::assistant(answer),
            );
            if let Err(e) = recorded {
                yield Err(e.into());
                return;
            }
            if !session.can_ask() {
                session.reset();
            }
        }))
    }

    /// Replace the document. The conversation and question count are kept.
    pub fn load_document(&mut self, raw_text: &str) -> Result<&Document, ParseError> {
        self.documents.load(raw_text)
    }

    /// Read a `.pdf`, `.txt` or `.md` file and load it.
    pub fn load_file(&mut self, path: &Path) -> Result<&Document, ParseError> {
        let parsed = doc_processor::parse_file(path)?;
        tracing::info!(path = %path.display(), file_type = %parsed.file_type, "parsed file");
        self.documents.load(&parsed.content)
    }

    pub fn select_sections(&mut self, indices: impl IntoIterator<Item = u32>) {
        self.documents.select_sections(indices);
    }

    pub fn reset(&mut self) {
        self.session.reset();
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionState {
        &mut self.session
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }
}
