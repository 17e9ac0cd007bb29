use async_trait::async_trait;
use reqwest::header::CONTENT_DISPOSITION;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};

use super::QuizService;
use crate::config::ClientConfig;
use crate::error::ServiceError;
use crate::export::{file_name_from_disposition, ExportRequest, ExportedDocument};
use crate::models::{GenerateRequest, GeneratedQuiz, QuizResult, SubmitRequest, UploadFile, UploadedDocument};

const UPLOAD_PATH: &str = "/api/upload";
const GENERATE_PATH: &str = "/api/generate-questions";
const SUBMIT_PATH: &str = "/api/submit-quiz";
const EXPORT_PATH: &str = "/api/export";
const HEALTH_PATH: &str = "/api/health";

const UPLOAD_FALLBACK: &str = "Failed to upload file";
const GENERATE_FALLBACK: &str = "Failed to generate questions";
const SUBMIT_FALLBACK: &str = "Failed to submit quiz";
const EXPORT_FALLBACK: &str = "Failed to export document";

/// Quiz backend reached over HTTP.
#[derive(Clone, Debug)]
pub struct HttpQuizService {
    config: ClientConfig,
    client: Client,
}

impl Default for HttpQuizService {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl HttpQuizService {
    pub fn new(config: ClientConfig) -> Self {
        info!(base_url = %config.base_url, "Creating quiz backend client");
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Falling back to a default HTTP client");
                Client::new()
            });
        Self { config, client }
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, fallback: &str) -> Result<T, ServiceError>
    where
        B: serde::Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        debug!(%url, "Sending request to quiz backend");
        let response = self.client.post(&url).json(body).send().await.map_err(transport)?;
        let response = ensure_success(response, fallback).await?;
        response.json::<T>().await.map_err(|e| {
            error!(error = %e, %url, "Failed to decode backend response");
            ServiceError::Decode(e.to_string())
        })
    }
}

fn transport(e: reqwest::Error) -> ServiceError {
    error!(error = %e, "HTTP request failed");
    ServiceError::Http(e.to_string())
}

/// Turns a non-2xx response into [`ServiceError::Api`] with the best message available.
async fn ensure_success(response: Response, fallback: &str) -> Result<Response, ServiceError> {
    let status = response.status();
    debug!(%status, "Received response from quiz backend");
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body).unwrap_or_else(|| fallback.to_string());
    error!(%status, %message, "Quiz backend returned an error");
    Err(ServiceError::Api { status: status.as_u16(), message })
}

/// Reads `detail`, `message` or `error` from a JSON error body.
///
/// `detail` may also be a list of validation entries carrying `msg`.
pub fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["detail", "message", "error"] {
        match value.get(key) {
            Some(Value::String(text)) if !text.trim().is_empty() => return Some(text.trim().to_string()),
            Some(Value::Array(entries)) => {
                let messages: Vec<&str> = entries
                    .iter()
                    .filter_map(|entry| entry.get("msg").and_then(Value::as_str))
                    .collect();
                if !messages.is_empty() {
                    return Some(messages.join("; "));
                }
            }
            _ => {}
        }
    }
    None
}

#[async_trait]
impl QuizService for HttpQuizService {
    #[instrument(skip(self, file), fields(file_name = %file.file_name, size = file.bytes.len()))]
    async fn upload(&self, file: UploadFile) -> Result<UploadedDocument, ServiceError> {
        let url = self.config.endpoint(UPLOAD_PATH);
        let part = Part::bytes(file.bytes).file_name(file.file_name);
        let form = Form::new().part("file", part);

        let response = self.client.post(&url).multipart(form).send().await.map_err(transport)?;
        let response = ensure_success(response, UPLOAD_FALLBACK).await?;
        let document: UploadedDocument = response
            .json()
            .await
            .map_err(|e| ServiceError::Decode(e.to_string()))?;
        info!(file_id = %document.file_id, "Upload accepted");
        Ok(document)
    }

    #[instrument(skip(self, request), fields(file_id = %request.file_id, num_questions = request.num_questions))]
    async fn generate(&self, request: GenerateRequest) -> Result<GeneratedQuiz, ServiceError> {
        let quiz: GeneratedQuiz = self.post_json(GENERATE_PATH, &request, GENERATE_FALLBACK).await?;
        info!(session_id = %quiz.session_id, questions = quiz.questions.len(), "Questions generated");
        Ok(quiz)
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id, answered = request.answers.len()))]
    async fn submit(&self, request: SubmitRequest) -> Result<QuizResult, ServiceError> {
        let result: QuizResult = self.post_json(SUBMIT_PATH, &request, SUBMIT_FALLBACK).await?;
        info!(percentage = result.percentage, "Quiz scored");
        Ok(result)
    }

    #[instrument(skip(self, request), fields(session_id = %request.session_id, export_type = %request.export_type, format = %request.file_format))]
    async fn export(&self, request: ExportRequest) -> Result<ExportedDocument, ServiceError> {
        let url = self.config.endpoint(EXPORT_PATH);
        let response = self.client.post(&url).json(&request).send().await.map_err(transport)?;
        let response = ensure_success(response, EXPORT_FALLBACK).await?;

        let file_name = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(file_name_from_disposition)
            .unwrap_or_else(|| request.default_file_name());
        let bytes = response.bytes().await.map_err(|e| ServiceError::Decode(e.to_string()))?;
        info!(%file_name, bytes = bytes.len(), "Export downloaded");
        Ok(ExportedDocument { file_name, bytes })
    }

    #[instrument(skip(self))]
    async fn health(&self) -> bool {
        let url = self.config.endpoint(HEALTH_PATH);
        match self.client.get(&url).send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                debug!(status = %response.status(), "Health check answered");
                ok
            }
            Err(e) => {
                warn!(error = %e, "Health check failed");
                false
            }
        }
    }

    fn clone_box(&self) -> Box<dyn QuizService> {
        Box::new(self.clone())
    }
}
