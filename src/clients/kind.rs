use std::fmt;
use std::str::FromStr;

use super::{HttpQuizService, MockQuizService, QuizService};
use crate::config::ClientConfig;

/// Which backend a front-end talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceKind {
    #[default]
    Http,
    Mock,
}

impl ServiceKind {
    pub fn connect(self, config: ClientConfig) -> Box<dyn QuizService> {
        match self {
            ServiceKind::Http => Box::new(HttpQuizService::new(config)),
            // The handle is dropped here: an uncontrolled mock serves its built-in answers
            ServiceKind::Mock => Box::new(MockQuizService::new().0),
        }
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http" => Ok(Self::Http),
            "mock" => Ok(Self::Mock),
            _ => Err(format!("Unknown service kind: '{}'. Supported: http, mock", s)),
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceKind::Http => write!(f, "http"),
            ServiceKind::Mock => write!(f, "mock"),
        }
    }
}
