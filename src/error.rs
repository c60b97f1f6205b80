use crate::llm::ProviderError;

/// The document cannot be used as a knowledge source; the user must load
/// another one.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Document is empty or has no extractable text")]
    Empty,
    #[error("Invalid sections: {0}")]
    InvalidSections(String),
    #[error("Unsupported file type: .{0}")]
    UnsupportedType(String),
    #[error("PDF parse error: {0}")]
    Pdf(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A question was asked after the session ran out. Reset first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Session limit reached: all {max} questions used")]
pub struct SessionLimitError {
    pub max: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    SessionLimit(#[from] SessionLimitError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("Question is empty")]
    EmptyQuestion,
}
