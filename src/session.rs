use uuid::Uuid;

use crate::error::SessionLimitError;
use crate::llm::ChatMessage;

/// Questions allowed before the session must be reset.
pub const MAX_QUESTIONS: usize = 10;

/// Conversation and question budget of one user session. In memory only.
#[derive(Debug, Clone)]
pub struct SessionState {
    id: Uuid,
    history: Vec<ChatMessage>,
    question_count: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            history: Vec::new(),
            question_count: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn can_ask(&self) -> bool {
        self.question_count < MAX_QUESTIONS
    }

    /// Append one completed turn. Callers must check [`can_ask`](Self::can_ask)
    /// first; a full session is left untouched.
    pub fn record_question(
        &mut self,
        question: ChatMessage,
        answer: ChatMessage,
    ) -> Result<(), SessionLimitError> {
        if !self.can_ask() {
            return Err(SessionLimitError { max: MAX_QUESTIONS });
        }
        self.history.push(question);
        self.history.push(answer);
        self.question_count += 1;
        Ok(())
    }

    pub fn reset(&mut self) {
        let previous = self.id;
        *self = Self::default();
        tracing::info!(%previous, session = %self.id, "session reset");
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn question_count(&self) -> usize {
        self.question_count
    }

    pub fn remaining(&self) -> usize {
        MAX_QUESTIONS - self.question_count
    }
}
