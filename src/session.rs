//! The quiz session state machine: Upload → Generate → Take → Results, with restart
//! from anywhere.
//!
//! `QuizSession` does no I/O. Every collaborator call is split in two halves:
//! a `begin_*` method that checks the phase, enforces single-flight and hands out a
//! [`RequestTicket`], and a `complete_*` method that takes the ticket back together
//! with the collaborator's answer. A ticket whose epoch or identity no longer
//! matches the live state yields [`Completion::Stale`] and leaves the state alone.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};

use crate::answers::AnswerStore;
use crate::config::UploadPolicy;
use crate::error::{QuizError, ServiceError};
use crate::export::{ExportRequest, ExportType, ExportedDocument, FileFormat};
use crate::models::{
    Difficulty, FileId, GenerateRequest, GeneratedQuestion, GeneratedQuiz, OptionLabel, QuizResult,
    SessionId, SubmitRequest, UploadFile, UploadedDocument,
};
use crate::navigation::Navigator;
use crate::results::{Breakdown, Grade, ReviewState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Upload,
    Generate,
    Take,
    Results,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Upload => write!(f, "upload"),
            Phase::Generate => write!(f, "generate"),
            Phase::Take => write!(f, "take"),
            Phase::Results => write!(f, "results"),
        }
    }
}

/// A trigger control that may have one outstanding request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Upload,
    Generate,
    Submit,
    Export(ExportType, FileFormat),
    HealthCheck,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Upload => write!(f, "Upload"),
            Operation::Generate => write!(f, "Question generation"),
            Operation::Submit => write!(f, "Submission"),
            Operation::Export(export_type, format) => write!(f, "Export ({}, {})", export_type, format),
            Operation::HealthCheck => write!(f, "Health check"),
        }
    }
}

/// Captures the state a request was dispatched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTicket {
    operation: Operation,
    epoch: u64,
    file_id: Option<FileId>,
    session_id: Option<SessionId>,
}

impl RequestTicket {
    pub fn operation(&self) -> Operation {
        self.operation
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T = ()> {
    Applied(T),
    /// The response belonged to state that no longer exists and was dropped.
    Stale,
}

impl<T> Completion<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Completion::Applied(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, Completion::Stale)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitCheck {
    Ready,
    NeedsConfirmation { unanswered: usize },
}

#[derive(Debug, Clone)]
struct ActiveQuiz {
    session_id: SessionId,
    questions: Vec<GeneratedQuestion>,
    answers: AnswerStore,
    navigator: Navigator,
    started_at: DateTime<Utc>,
}

impl ActiveQuiz {
    fn unanswered(&self) -> usize {
        self.questions.len().saturating_sub(self.answers.answered_count())
    }
}

#[derive(Debug, Clone)]
struct CompletedQuiz {
    session_id: SessionId,
    questions: Vec<GeneratedQuestion>,
    answers: AnswerStore,
    result: QuizResult,
    review: ReviewState,
    time_taken: Duration,
}

#[derive(Debug, Clone)]
enum Stage {
    Upload,
    Generate { document: UploadedDocument },
    Take { document: UploadedDocument, quiz: ActiveQuiz },
    Results { document: UploadedDocument, quiz: CompletedQuiz },
}

#[derive(Debug, Clone)]
pub struct QuizSession {
    policy: UploadPolicy,
    epoch: u64,
    stage: Stage,
    error: Option<String>,
    in_flight: HashSet<Operation>,
    health_in_flight: bool,
    backend_reachable: Option<bool>,
}

impl Default for QuizSession {
    fn default() -> Self {
        Self::new(UploadPolicy::default())
    }
}

impl QuizSession {
    pub fn new(policy: UploadPolicy) -> Self {
        Self {
            policy,
            epoch: 0,
            stage: Stage::Upload,
            error: None,
            in_flight: HashSet::new(),
            health_in_flight: false,
            backend_reachable: None,
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn phase(&self) -> Phase {
        match self.stage {
            Stage::Upload => Phase::Upload,
            Stage::Generate { .. } => Phase::Generate,
            Stage::Take { .. } => Phase::Take,
            Stage::Results { .. } => Phase::Results,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn document(&self) -> Option<&UploadedDocument> {
        match &self.stage {
            Stage::Upload => None,
            Stage::Generate { document } | Stage::Take { document, .. } | Stage::Results { document, .. } => {
                Some(document)
            }
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.stage {
            Stage::Take { quiz, .. } => Some(&quiz.session_id),
            Stage::Results { quiz, .. } => Some(&quiz.session_id),
            _ => None,
        }
    }

    pub fn questions(&self) -> &[GeneratedQuestion] {
        match &self.stage {
            Stage::Take { quiz, .. } => &quiz.questions,
            Stage::Results { quiz, .. } => &quiz.questions,
            _ => &[],
        }
    }

    /// The displayed question, looked up from the cursor on every call.
    pub fn current_question(&self) -> Option<&GeneratedQuestion> {
        match &self.stage {
            Stage::Take { quiz, .. } => quiz.questions.get(quiz.navigator.cursor()),
            _ => None,
        }
    }

    pub fn cursor(&self) -> usize {
        match &self.stage {
            Stage::Take { quiz, .. } => quiz.navigator.cursor(),
            _ => 0,
        }
    }

    /// Answers of the quiz being taken, or the ones that were submitted.
    pub fn answers(&self) -> Option<&AnswerStore> {
        match &self.stage {
            Stage::Take { quiz, .. } => Some(&quiz.answers),
            Stage::Results { quiz, .. } => Some(&quiz.answers),
            _ => None,
        }
    }

    pub fn answered_count(&self) -> usize {
        self.answers().map_or(0, AnswerStore::answered_count)
    }

    pub fn unanswered_count(&self) -> usize {
        match &self.stage {
            Stage::Take { quiz, .. } => quiz.unanswered(),
            _ => 0,
        }
    }

    pub fn progress_fraction(&self) -> f64 {
        match &self.stage {
            Stage::Take { quiz, .. } => quiz.answers.progress_fraction(quiz.questions.len()),
            _ => 0.0,
        }
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        match &self.stage {
            Stage::Take { quiz, .. } => Some(quiz.started_at),
            _ => None,
        }
    }

    /// Time spent on the quiz: running while taking it, frozen once scored.
    pub fn elapsed_at(&self, now: DateTime<Utc>) -> Option<Duration> {
        match &self.stage {
            Stage::Take { quiz, .. } => Some((now - quiz.started_at).max(Duration::zero())),
            Stage::Results { quiz, .. } => Some(quiz.time_taken),
            _ => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_at(Utc::now())
    }

    pub fn result(&self) -> Option<&QuizResult> {
        match &self.stage {
            Stage::Results { quiz, .. } => Some(&quiz.result),
            _ => None,
        }
    }

    pub fn grade(&self) -> Option<Grade> {
        self.result().map(|result| Grade::from_percentage(result.percentage))
    }

    pub fn breakdown(&self) -> Option<Breakdown> {
        match &self.stage {
            Stage::Results { quiz, .. } => Some(Breakdown::compute(&quiz.questions, &quiz.result)),
            _ => None,
        }
    }

    pub fn review(&self) -> Option<&ReviewState> {
        match &self.stage {
            Stage::Results { quiz, .. } => Some(&quiz.review),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_in_flight(&self, operation: Operation) -> bool {
        match operation {
            Operation::HealthCheck => self.health_in_flight,
            other => self.in_flight.contains(&other),
        }
    }

    /// Last health check outcome; `None` until one completed.
    pub fn backend_reachable(&self) -> Option<bool> {
        self.backend_reachable
    }

    // =========================================================================
    // Overlay and restart
    // =========================================================================

    pub fn set_error(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Back to Upload with a fresh state bundle. Outstanding tickets become stale.
    pub fn restart(&mut self) {
        info!(from = %self.phase(), epoch = self.epoch, "Restarting quiz session");
        self.epoch += 1;
        self.stage = Stage::Upload;
        self.error = None;
        self.in_flight.clear();
        self.health_in_flight = false;
    }

    // =========================================================================
    // Take phase: navigation and answers
    // =========================================================================

    pub fn next(&mut self) -> bool {
        self.navigator_mut().map_or(false, Navigator::next)
    }

    pub fn previous(&mut self) -> bool {
        self.navigator_mut().map_or(false, Navigator::previous)
    }

    pub fn jump_to(&mut self, index: usize) -> bool {
        self.navigator_mut().map_or(false, |nav| nav.jump_to(index))
    }

    fn navigator_mut(&mut self) -> Option<&mut Navigator> {
        match &mut self.stage {
            Stage::Take { quiz, .. } => Some(&mut quiz.navigator),
            _ => None,
        }
    }

    /// Answer the displayed question.
    pub fn select_answer(&mut self, option: OptionLabel) -> Result<(), QuizError> {
        let question_id = self
            .current_question()
            .map(|q| q.id.clone())
            .ok_or(QuizError::NoActiveQuiz(self.phase()))?;
        self.set_answer(&question_id, option)
    }

    /// Answer any question of the active set.
    pub fn set_answer(&mut self, question_id: &str, option: OptionLabel) -> Result<(), QuizError> {
        let phase = self.phase();
        let Stage::Take { quiz, .. } = &mut self.stage else {
            return Err(QuizError::NoActiveQuiz(phase));
        };
        if !quiz.questions.iter().any(|q| q.id == question_id) {
            return Err(QuizError::UnknownQuestion(question_id.to_string()));
        }
        debug!(question_id, %option, "Answer selected");
        quiz.answers.set_answer(question_id, option);
        Ok(())
    }

    // =========================================================================
    // Results phase: review
    // =========================================================================

    pub fn toggle_detail(&mut self, question_id: &str) -> bool {
        match &mut self.stage {
            Stage::Results { quiz, .. } => {
                quiz.review.toggle(question_id);
                true
            }
            _ => false,
        }
    }

    // =========================================================================
    // Collaborator calls
    // =========================================================================

    fn ensure_idle(&self, operation: Operation) -> Result<(), QuizError> {
        if self.is_in_flight(operation) {
            debug!(%operation, "Suppressed repeat trigger");
            return Err(QuizError::Busy(operation));
        }
        Ok(())
    }

    fn dispatch(&mut self, operation: Operation, file_id: Option<FileId>, session_id: Option<SessionId>) -> RequestTicket {
        self.in_flight.insert(operation);
        RequestTicket { operation, epoch: self.epoch, file_id, session_id }
    }

    /// Releases the control if the ticket still belongs to this state bundle.
    fn settle(&mut self, ticket: &RequestTicket) -> bool {
        if ticket.epoch != self.epoch {
            debug!(operation = %ticket.operation, ticket_epoch = ticket.epoch, epoch = self.epoch, "Discarding stale response");
            return false;
        }
        self.in_flight.remove(&ticket.operation);
        true
    }

    fn fail(&mut self, operation: Operation, source: ServiceError) -> QuizError {
        warn!(%operation, error = %source, "Collaborator call failed");
        self.error = Some(source.user_message());
        QuizError::Service { operation, source }
    }

    fn wrong_phase(&self, operation: Operation) -> QuizError {
        QuizError::WrongPhase { operation, phase: self.phase() }
    }

    pub fn begin_upload(&mut self, file: &UploadFile) -> Result<RequestTicket, QuizError> {
        let operation = Operation::Upload;
        if self.phase() != Phase::Upload {
            return Err(self.wrong_phase(operation));
        }
        self.ensure_idle(operation)?;
        if let Err(e) = self.policy.validate(file) {
            warn!(file_name = %file.file_name, error = %e, "Upload rejected");
            self.error = Some(e.to_string());
            return Err(e.into());
        }
        Ok(self.dispatch(operation, None, None))
    }

    pub fn complete_upload(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<UploadedDocument, ServiceError>,
    ) -> Result<Completion, QuizError> {
        if !self.settle(&ticket) || self.phase() != Phase::Upload {
            return Ok(Completion::Stale);
        }
        let document = outcome.map_err(|e| self.fail(ticket.operation, e))?;
        info!(file_id = %document.file_id, file_name = %document.file_name, "Document uploaded");
        self.stage = Stage::Generate { document };
        self.error = None;
        Ok(Completion::Applied(()))
    }

    pub fn begin_generate(
        &mut self,
        num_questions: u32,
        difficulty: Option<Difficulty>,
    ) -> Result<(RequestTicket, GenerateRequest), QuizError> {
        let operation = Operation::Generate;
        let file_id = match &self.stage {
            Stage::Generate { document } => document.file_id.clone(),
            _ => return Err(self.wrong_phase(operation)),
        };
        self.ensure_idle(operation)?;
        let request = GenerateRequest { file_id: file_id.clone(), num_questions, difficulty };
        Ok((self.dispatch(operation, Some(file_id), None), request))
    }

    pub fn complete_generate(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<GeneratedQuiz, ServiceError>,
    ) -> Result<Completion, QuizError> {
        if !self.settle(&ticket) {
            return Ok(Completion::Stale);
        }
        let document = match &self.stage {
            Stage::Generate { document } if ticket.file_id.as_deref() == Some(document.file_id.as_str()) => {
                document.clone()
            }
            _ => return Ok(Completion::Stale),
        };
        let generated = outcome
            .and_then(|quiz| {
                if quiz.questions.is_empty() {
                    Err(ServiceError::Malformed("No questions were generated".to_string()))
                } else {
                    Ok(quiz)
                }
            })
            .map_err(|e| self.fail(ticket.operation, e))?;

        info!(session_id = %generated.session_id, questions = generated.questions.len(), "Quiz generated");
        let navigator = Navigator::new(generated.questions.len());
        self.stage = Stage::Take {
            document,
            quiz: ActiveQuiz {
                session_id: generated.session_id,
                questions: generated.questions,
                answers: AnswerStore::new(),
                navigator,
                started_at: Utc::now(),
            },
        };
        self.error = None;
        Ok(Completion::Applied(()))
    }

    pub fn submission_check(&self) -> Result<SubmitCheck, QuizError> {
        match &self.stage {
            Stage::Take { quiz, .. } => Ok(match quiz.unanswered() {
                0 => SubmitCheck::Ready,
                unanswered => SubmitCheck::NeedsConfirmation { unanswered },
            }),
            _ => Err(self.wrong_phase(Operation::Submit)),
        }
    }

    /// With unanswered questions left, `confirmed` must be true or nothing happens.
    pub fn begin_submit(&mut self, confirmed: bool) -> Result<(RequestTicket, SubmitRequest), QuizError> {
        let operation = Operation::Submit;
        if let SubmitCheck::NeedsConfirmation { unanswered } = self.submission_check()? {
            if !confirmed {
                return Err(QuizError::ConfirmationRequired { unanswered });
            }
        }
        self.ensure_idle(operation)?;
        let Stage::Take { quiz, .. } = &self.stage else {
            return Err(self.wrong_phase(operation));
        };
        let request = SubmitRequest { session_id: quiz.session_id.clone(), answers: quiz.answers.to_map() };
        info!(session_id = %request.session_id, answered = request.answers.len(), "Submitting quiz");
        let session_id = Some(request.session_id.clone());
        Ok((self.dispatch(operation, None, session_id), request))
    }

    pub fn complete_submit(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<QuizResult, ServiceError>,
    ) -> Result<Completion, QuizError> {
        if !self.settle(&ticket) {
            return Ok(Completion::Stale);
        }
        let active_session = match &self.stage {
            Stage::Take { quiz, .. } => quiz.session_id.clone(),
            _ => return Ok(Completion::Stale),
        };
        if ticket.session_id.as_deref() != Some(active_session.as_str()) {
            return Ok(Completion::Stale);
        }
        let result = match outcome {
            Ok(result) if result.session_id != active_session => {
                debug!(result_session = %result.session_id, %active_session, "Discarding result for another session");
                return Ok(Completion::Stale);
            }
            Ok(result) => result.normalized().map_err(|e| self.fail(ticket.operation, e))?,
            Err(e) => return Err(self.fail(ticket.operation, e)),
        };

        let (document, quiz) = match std::mem::replace(&mut self.stage, Stage::Upload) {
            Stage::Take { document, quiz } => (document, quiz),
            other => {
                self.stage = other;
                return Ok(Completion::Stale);
            }
        };
        let time_taken = (Utc::now() - quiz.started_at).max(Duration::zero());
        // As scored, not as edited while the request was out
        let answers: AnswerStore = result
            .results
            .iter()
            .filter_map(|item| Some((item.question_id.clone(), item.user_answer?)))
            .collect();
        info!(
            session_id = %quiz.session_id,
            correct = result.correct_answers,
            total = result.total_questions,
            percentage = result.percentage,
            "Quiz scored"
        );
        self.stage = Stage::Results {
            document,
            quiz: CompletedQuiz {
                session_id: quiz.session_id,
                questions: quiz.questions,
                answers,
                result,
                review: ReviewState::default(),
                time_taken,
            },
        };
        self.error = None;
        Ok(Completion::Applied(()))
    }

    pub fn begin_export(
        &mut self,
        export_type: ExportType,
        file_format: FileFormat,
    ) -> Result<(RequestTicket, ExportRequest), QuizError> {
        let operation = Operation::Export(export_type, file_format);
        let available = match (&self.stage, export_type) {
            (Stage::Results { .. }, _) => true,
            (Stage::Take { .. }, ExportType::QuestionsOnly) => true,
            _ => false,
        };
        let session_id = match self.session_id() {
            Some(id) if available => id.to_string(),
            _ => return Err(self.wrong_phase(operation)),
        };
        self.ensure_idle(operation)?;
        let request = ExportRequest { session_id: session_id.clone(), export_type, file_format };
        Ok((self.dispatch(operation, None, Some(session_id)), request))
    }

    /// On success the document is returned for immediate delivery; the session keeps nothing.
    pub fn complete_export(
        &mut self,
        ticket: RequestTicket,
        outcome: Result<ExportedDocument, ServiceError>,
    ) -> Result<Completion<ExportedDocument>, QuizError> {
        if !self.settle(&ticket) || ticket.session_id.as_deref() != self.session_id() {
            return Ok(Completion::Stale);
        }
        let document = outcome.map_err(|e| self.fail(ticket.operation, e))?;
        info!(file_name = %document.file_name, bytes = document.bytes.len(), "Export received");
        Ok(Completion::Applied(document))
    }

    pub fn begin_health_check(&mut self) -> Result<(), QuizError> {
        self.ensure_idle(Operation::HealthCheck)?;
        self.health_in_flight = true;
        Ok(())
    }

    /// Releases the health control without recording an outcome.
    pub fn abandon_health_check(&mut self) {
        self.health_in_flight = false;
    }

    /// Advisory only: never touches the phase or the error overlay.
    pub fn complete_health_check(&mut self, reachable: bool) {
        self.health_in_flight = false;
        if !reachable {
            warn!("Quiz backend is not reachable");
        }
        self.backend_reachable = Some(reachable);
    }
}
