//! The quiz backend seam.
//!
//! [`QuizService`] is the narrow request/response contract the session relies on.
//! `HttpQuizService` talks to the real backend; `MockQuizService` is an in-process
//! stand-in that can be scripted and paused from tests.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::ServiceError;
use crate::export::{ExportRequest, ExportedDocument};
use crate::models::{GenerateRequest, GeneratedQuiz, QuizResult, SubmitRequest, UploadFile, UploadedDocument};

pub mod http;
pub mod kind;
pub mod mock;

pub use http::HttpQuizService;
pub use kind::ServiceKind;
pub use mock::{MockCall, MockHandle, MockOp, MockQuizService, MockResponse};

#[async_trait]
pub trait QuizService: Send + Sync + Debug {
    async fn upload(&self, file: UploadFile) -> Result<UploadedDocument, ServiceError>;

    async fn generate(&self, request: GenerateRequest) -> Result<GeneratedQuiz, ServiceError>;

    async fn submit(&self, request: SubmitRequest) -> Result<QuizResult, ServiceError>;

    async fn export(&self, request: ExportRequest) -> Result<ExportedDocument, ServiceError>;

    /// Reachability only; never fails.
    async fn health(&self) -> bool;

    /// Clone this service into a boxed trait object
    fn clone_box(&self) -> Box<dyn QuizService>;
}

impl Clone for Box<dyn QuizService> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

#[async_trait]
impl QuizService for Box<dyn QuizService> {
    async fn upload(&self, file: UploadFile) -> Result<UploadedDocument, ServiceError> {
        self.as_ref().upload(file).await
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GeneratedQuiz, ServiceError> {
        self.as_ref().generate(request).await
    }

    async fn submit(&self, request: SubmitRequest) -> Result<QuizResult, ServiceError> {
        self.as_ref().submit(request).await
    }

    async fn export(&self, request: ExportRequest) -> Result<ExportedDocument, ServiceError> {
        self.as_ref().export(request).await
    }

    async fn health(&self) -> bool {
        self.as_ref().health().await
    }

    fn clone_box(&self) -> Box<dyn QuizService> {
        self.as_ref().clone_box()
    }
}
