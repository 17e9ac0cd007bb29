use thiserror::Error;

use crate::models::QuestionId;
use crate::session::{Operation, Phase};

#[derive(Error, Debug)]
pub enum QuizError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("{operation} failed: {source}")]
    Service {
        operation: Operation,
        #[source]
        source: ServiceError,
    },
    #[error("{0} is already in progress")]
    Busy(Operation),
    #[error("{operation} is not available during the {phase} phase")]
    WrongPhase { operation: Operation, phase: Phase },
    #[error("No quiz is being taken (current phase: {0})")]
    NoActiveQuiz(Phase),
    #[error("Question {0} is not part of the active quiz")]
    UnknownQuestion(QuestionId),
    #[error("{unanswered} question(s) are unanswered; submission needs confirmation")]
    ConfirmationRequired { unanswered: usize },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Client-side rejection of an upload; never reaches the backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported file type '{extension}'. Allowed: .pdf, .docx, .txt")]
    UnsupportedFileType { extension: String },
    #[error("File is too large ({size} bytes, maximum {max} bytes)")]
    FileTooLarge { size: u64, max: u64 },
    #[error("File is empty")]
    EmptyFile,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("{message}")]
    Api { status: u16, message: String },
    #[error("Could not decode response: {0}")]
    Decode(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
}

impl ServiceError {
    /// Human-readable text for the error overlay.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
