//! Wire-level data shared between the session state machine and the quiz backend.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use crate::error::{QuizError, ServiceError};

pub type FileId = String;
pub type SessionId = String;
pub type QuestionId = String;

/// Tolerance used when comparing the backend's (rounded) percentage with the counts.
pub const PERCENTAGE_TOLERANCE: f64 = 0.01;

/// One of the four fixed answer labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionLabel {
    A,
    B,
    C,
    D,
}

impl OptionLabel {
    pub const ALL: [OptionLabel; 4] = [OptionLabel::A, OptionLabel::B, OptionLabel::C, OptionLabel::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionLabel::A => "A",
            OptionLabel::B => "B",
            OptionLabel::C => "C",
            OptionLabel::D => "D",
        }
    }
}

impl fmt::Display for OptionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OptionLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "C" => Ok(Self::C),
            "D" => Ok(Self::D),
            _ => Err(format!("Unknown option '{}'. Expected one of A, B, C, D", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    #[serde(alias = "easy")]
    Easy,
    #[serde(alias = "medium")]
    Medium,
    #[serde(alias = "hard")]
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "Easy"),
            Difficulty::Medium => write!(f, "Medium"),
            Difficulty::Hard => write!(f, "Hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            _ => Err(format!("Unknown difficulty: '{}'. Supported: easy, medium, hard", s)),
        }
    }
}

/// A document the backend accepted and extracted text from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedDocument {
    pub file_id: FileId,
    pub file_name: String,
}

/// A single file picked for upload.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), bytes }
    }

    /// Lowercased extension including the dot, e.g. `.pdf`; empty when there is none.
    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
            .unwrap_or_default()
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, QuizError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { file_name, bytes })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub id: QuestionId,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<Difficulty>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blooms_taxonomy: Option<String>,
}

impl GeneratedQuestion {
    pub fn option(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.option_a,
            OptionLabel::B => &self.option_b,
            OptionLabel::C => &self.option_c,
            OptionLabel::D => &self.option_d,
        }
    }

    pub fn options(&self) -> [(OptionLabel, &str); 4] {
        OptionLabel::ALL.map(|label| (label, self.option(label)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub file_id: FileId,
    pub num_questions: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedQuiz {
    pub session_id: SessionId,
    pub questions: Vec<GeneratedQuestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub session_id: SessionId,
    pub answers: HashMap<QuestionId, OptionLabel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub question_id: QuestionId,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub option_c: String,
    pub option_d: String,
    #[serde(default, deserialize_with = "deserialize_optional_label")]
    pub user_answer: Option<OptionLabel>,
    pub correct_answer: OptionLabel,
    pub is_correct: bool,
    #[serde(default)]
    pub explanation: String,
}

impl ResultItem {
    pub fn option(&self, label: OptionLabel) -> &str {
        match label {
            OptionLabel::A => &self.option_a,
            OptionLabel::B => &self.option_b,
            OptionLabel::C => &self.option_c,
            OptionLabel::D => &self.option_d,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizResult {
    pub session_id: SessionId,
    pub total_questions: usize,
    pub correct_answers: usize,
    pub incorrect_answers: usize,
    pub percentage: f64,
    #[serde(default)]
    pub results: Vec<ResultItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl QuizResult {
    /// Checks the counts against each other and against `results`, then makes the
    /// percentage agree with `correct / total`.
    pub fn normalized(mut self) -> Result<Self, ServiceError> {
        let counted = self.correct_answers.checked_add(self.incorrect_answers);
        if counted != Some(self.total_questions) {
            return Err(ServiceError::Malformed(format!(
                "correct ({}) + incorrect ({}) != total ({})",
                self.correct_answers, self.incorrect_answers, self.total_questions
            )));
        }
        if self.results.len() != self.total_questions {
            return Err(ServiceError::Malformed(format!(
                "{} result item(s) for {} question(s)",
                self.results.len(),
                self.total_questions
            )));
        }
        if !self.percentage.is_finite() || !self.percentage_is_consistent() {
            let expected = self.expected_percentage();
            warn!(reported = self.percentage, expected, "Replacing inconsistent score percentage");
            self.percentage = expected;
        }
        Ok(self)
    }

    /// `correct / total * 100`, or 0 for an empty quiz.
    pub fn expected_percentage(&self) -> f64 {
        if self.total_questions == 0 {
            0.0
        } else {
            self.correct_answers as f64 / self.total_questions as f64 * 100.0
        }
    }

    pub fn percentage_is_consistent(&self) -> bool {
        (self.percentage - self.expected_percentage()).abs() <= PERCENTAGE_TOLERANCE
    }
}

/// Accepts `null`, a missing field, `""` or a label letter.
fn deserialize_optional_label<'de, D>(deserializer: D) -> Result<Option<OptionLabel>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(label) => label.parse().map(Some).map_err(serde::de::Error::custom),
    }
}
