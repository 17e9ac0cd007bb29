use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportType {
    QuestionsOnly,
    ResultsWithAnswers,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::QuestionsOnly => "questions_only",
            ExportType::ResultsWithAnswers => "results_with_answers",
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "questions_only" | "questions" => Ok(Self::QuestionsOnly),
            "results_with_answers" | "results" => Ok(Self::ResultsWithAnswers),
            _ => Err(format!("Unknown export type: '{}'. Supported: questions, results", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    Pdf,
    Docx,
}

impl FileFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Pdf => "pdf",
            FileFormat::Docx => "docx",
        }
    }
}

impl fmt::Display for FileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for FileFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().trim_start_matches('.') {
            "pdf" => Ok(Self::Pdf),
            "docx" => Ok(Self::Docx),
            _ => Err(format!("Unknown file format: '{}'. Supported: pdf, docx", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub session_id: SessionId,
    pub export_type: ExportType,
    pub file_format: FileFormat,
}

impl ExportRequest {
    /// `{export_type}_{session_id}.{ext}`, used when the backend does not name the file.
    pub fn default_file_name(&self) -> String {
        format!("{}_{}.{}", self.export_type, self.session_id, self.file_format.extension())
    }
}

/// A rendered document, handed straight to a [`crate::sinks::DocumentSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: bytes::Bytes,
}

/// Pulls `filename` out of a `Content-Disposition` header value.
pub fn file_name_from_disposition(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_serializes_wire_names() {
        let request = ExportRequest {
            session_id: "abc".into(),
            export_type: ExportType::ResultsWithAnswers,
            file_format: FileFormat::Docx,
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"session_id": "abc", "export_type": "results_with_answers", "file_format": "docx"})
        );
        assert_eq!(request.default_file_name(), "results_with_answers_abc.docx");
    }

    #[test]
    fn disposition_filename_is_extracted() {
        assert_eq!(
            file_name_from_disposition(r#"attachment; filename="questions_only_s1.pdf""#),
            Some("questions_only_s1.pdf".to_string())
        );
        assert_eq!(file_name_from_disposition("attachment"), None);
        assert_eq!(file_name_from_disposition("attachment; filename=../x.pdf"), None);
    }

    #[test]
    fn short_names_parse() {
        assert_eq!("results".parse::<ExportType>(), Ok(ExportType::ResultsWithAnswers));
        assert_eq!("questions-only".parse::<ExportType>(), Ok(ExportType::QuestionsOnly));
        assert_eq!("PDF".parse::<FileFormat>(), Ok(FileFormat::Pdf));
        assert!("rtf".parse::<FileFormat>().is_err());
    }
}
