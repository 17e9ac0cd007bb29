//! Async driver that binds a [`QuizSession`] to a [`QuizService`].
//!
//! The session lives behind a mutex that is taken only to dispatch and to complete
//! a request, never across an `.await`. Navigation and answer selection through
//! [`QuizController::session`] therefore stay live while calls are outstanding,
//! and a restart issued meanwhile turns the late response into a no-op.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, instrument, warn};

use crate::clients::QuizService;
use crate::config::UploadPolicy;
use crate::error::QuizError;
use crate::export::{ExportType, ExportedDocument, FileFormat};
use crate::models::{Difficulty, UploadFile};
use crate::session::{Completion, QuizSession, SubmitCheck};
use crate::sinks::DocumentSink;

/// Frees the health control when a check is dropped before the backend answers.
struct PendingHealthCheck<'a> {
    session: &'a Mutex<QuizSession>,
    settled: bool,
}

impl Drop for PendingHealthCheck<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!("Health check abandoned");
            self.session.lock().unwrap_or_else(PoisonError::into_inner).abandon_health_check();
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The user chose to keep answering; nothing was sent.
    Declined { unanswered: usize },
    Sent(Completion),
}

#[derive(Debug, Clone)]
pub struct QuizController<S: QuizService> {
    service: S,
    session: Arc<Mutex<QuizSession>>,
}

impl<S: QuizService> QuizController<S> {
    pub fn new(service: S, policy: UploadPolicy) -> Self {
        Self { service, session: Arc::new(Mutex::new(QuizSession::new(policy))) }
    }

    /// Direct access for synchronous actions (navigation, answers, review toggles).
    pub fn session(&self) -> MutexGuard<'_, QuizSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn restart(&self) {
        self.session().restart();
    }

    #[instrument(skip(self))]
    pub async fn check_health(&self) -> Result<bool, QuizError> {
        self.session().begin_health_check()?;
        let mut pending = PendingHealthCheck { session: &self.session, settled: false };
        let reachable = self.service.health().await;
        pending.settled = true;
        self.session().complete_health_check(reachable);
        Ok(reachable)
    }

    #[instrument(skip(self, file), fields(file_name = %file.file_name))]
    pub async fn upload(&self, file: UploadFile) -> Result<Completion, QuizError> {
        let ticket = self.session().begin_upload(&file)?;
        let outcome = self.service.upload(file).await;
        self.session().complete_upload(ticket, outcome)
    }

    /// Reads `path` and uploads it; read failures land in the error overlay.
    pub async fn upload_path(&self, path: impl Into<PathBuf>) -> Result<Completion, QuizError> {
        let path = path.into();
        let file = match UploadFile::from_path(&path).await {
            Ok(file) => file,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not read file for upload");
                self.session().set_error(format!("Could not read {}: {}", path.display(), e));
                return Err(e);
            }
        };
        self.upload(file).await
    }

    #[instrument(skip(self))]
    pub async fn generate(&self, num_questions: u32, difficulty: Option<Difficulty>) -> Result<Completion, QuizError> {
        let (ticket, request) = self.session().begin_generate(num_questions, difficulty)?;
        let outcome = self.service.generate(request).await;
        self.session().complete_generate(ticket, outcome)
    }

    /// Submits the quiz. With unanswered questions, `confirm` is asked first (with
    /// the unanswered count) and a `false` answer leaves everything as it was.
    #[instrument(skip(self, confirm))]
    pub async fn submit<F>(&self, confirm: F) -> Result<SubmitOutcome, QuizError>
    where
        F: FnOnce(usize) -> bool,
    {
        let check = self.session().submission_check()?;
        let confirmed = match check {
            SubmitCheck::Ready => false,
            SubmitCheck::NeedsConfirmation { unanswered } => {
                if !confirm(unanswered) {
                    info!(unanswered, "Submission declined");
                    return Ok(SubmitOutcome::Declined { unanswered });
                }
                true
            }
        };

        let (ticket, request) = self.session().begin_submit(confirmed)?;
        let outcome = self.service.submit(request).await;
        self.session().complete_submit(ticket, outcome).map(SubmitOutcome::Sent)
    }

    #[instrument(skip(self))]
    pub async fn export(
        &self,
        export_type: ExportType,
        file_format: FileFormat,
    ) -> Result<Completion<ExportedDocument>, QuizError> {
        let (ticket, request) = self.session().begin_export(export_type, file_format)?;
        let outcome = self.service.export(request).await;
        self.session().complete_export(ticket, outcome)
    }

    /// Exports and hands the document straight to `sink`. `None` when the response
    /// arrived after a restart.
    pub async fn export_to(
        &self,
        export_type: ExportType,
        file_format: FileFormat,
        sink: &dyn DocumentSink,
    ) -> Result<Option<PathBuf>, QuizError> {
        let document = match self.export(export_type, file_format).await? {
            Completion::Applied(document) => document,
            Completion::Stale => return Ok(None),
        };
        match sink.deliver(&document).await {
            Ok(path) => Ok(Some(path)),
            Err(e) => {
                warn!(error = %e, file_name = %document.file_name, "Could not save export");
                self.session().set_error(format!("Could not save {}: {}", document.file_name, e));
                Err(e.into())
            }
        }
    }
}
