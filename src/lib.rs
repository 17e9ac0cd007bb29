pub mod answers;
pub mod clients;
pub mod config;
pub mod controller;
pub mod error;
pub mod export;
pub mod models;
pub mod navigation;
pub mod prompt;
pub mod results;
pub mod session;
pub mod sinks;

// Convenient re-exports
pub use controller::{QuizController, SubmitOutcome};
pub use error::{QuizError, ServiceError, ValidationError};
pub use session::{Completion, Operation, Phase, QuizSession};
