//! In-process quiz backend for tests and offline demos.
//!
//! Without scripted responses the mock behaves like a small backend: it accepts
//! uploads, serves questions from a built-in bank, scores submissions against its
//! own answer key and renders exports as plain text. Scripted [`MockResponse`]s take
//! precedence, and [`MockHandle::hold`] keeps calls of one kind pending until
//! [`MockHandle::release`].

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;
use tracing::debug;

use super::QuizService;
use crate::error::ServiceError;
use crate::export::{ExportRequest, ExportType, ExportedDocument};
use crate::models::{
    Difficulty, GenerateRequest, GeneratedQuestion, GeneratedQuiz, OptionLabel, QuizResult, ResultItem,
    SessionId, SubmitRequest, UploadFile, UploadedDocument,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Upload,
    Generate,
    Submit,
    Export,
    Health,
}

#[derive(Debug, Clone)]
pub enum MockResponse {
    Upload(Result<UploadedDocument, ServiceError>),
    Generate(Result<GeneratedQuiz, ServiceError>),
    Submit(Result<QuizResult, ServiceError>),
    Export(Result<ExportedDocument, ServiceError>),
    Health(bool),
}

impl MockResponse {
    fn op(&self) -> MockOp {
        match self {
            MockResponse::Upload(_) => MockOp::Upload,
            MockResponse::Generate(_) => MockOp::Generate,
            MockResponse::Submit(_) => MockOp::Submit,
            MockResponse::Export(_) => MockOp::Export,
            MockResponse::Health(_) => MockOp::Health,
        }
    }
}

/// A request as the mock received it.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Upload { file_name: String, size: usize },
    Generate(GenerateRequest),
    Submit(SubmitRequest),
    Export(ExportRequest),
    Health,
}

impl MockCall {
    pub fn op(&self) -> MockOp {
        match self {
            MockCall::Upload { .. } => MockOp::Upload,
            MockCall::Generate(_) => MockOp::Generate,
            MockCall::Submit(_) => MockOp::Submit,
            MockCall::Export(_) => MockOp::Export,
            MockCall::Health => MockOp::Health,
        }
    }
}

#[derive(Debug, Clone)]
struct KeyedQuestion {
    question: GeneratedQuestion,
    correct: OptionLabel,
    explanation: String,
}

/// Control surface shared between a [`MockQuizService`] and the test driving it.
#[derive(Debug, Default)]
pub struct MockHandle {
    responses: Mutex<Vec<MockResponse>>,
    calls: Mutex<Vec<MockCall>>,
    gates: Mutex<HashMap<MockOp, Arc<Notify>>>,
    sessions: Mutex<HashMap<SessionId, Vec<KeyedQuestion>>>,
    counter: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockHandle {
    /// Queue a response for the next call of its kind.
    pub fn add_response(&self, response: MockResponse) {
        lock(&self.responses).push(response);
    }

    pub fn add_responses(&self, responses: impl IntoIterator<Item = MockResponse>) {
        lock(&self.responses).extend(responses);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self, op: MockOp) -> usize {
        lock(&self.calls).iter().filter(|call| call.op() == op).count()
    }

    /// Keep calls of kind `op` pending until [`release`](Self::release).
    pub fn hold(&self, op: MockOp) {
        lock(&self.gates).entry(op).or_insert_with(|| Arc::new(Notify::new()));
    }

    /// Let one held call through and stop holding new ones.
    pub fn release(&self, op: MockOp) {
        if let Some(gate) = lock(&self.gates).remove(&op) {
            gate.notify_one();
        }
    }

    /// Resolves once at least `count` calls of kind `op` have arrived.
    pub async fn wait_for_calls(&self, op: MockOp, count: usize) {
        while self.call_count(op) < count {
            tokio::task::yield_now().await;
        }
    }

    fn record(&self, call: MockCall) -> Option<Arc<Notify>> {
        let op = call.op();
        debug!(?op, "Mock quiz service called");
        lock(&self.calls).push(call);
        lock(&self.gates).get(&op).cloned()
    }

    fn take_response(&self, op: MockOp) -> Option<MockResponse> {
        let mut responses = lock(&self.responses);
        let index = responses.iter().position(|r| r.op() == op)?;
        Some(responses.remove(index))
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }

    fn build_quiz(&self, request: &GenerateRequest) -> GeneratedQuiz {
        let session_id = self.next_id("session");
        let keyed: Vec<KeyedQuestion> = (0..request.num_questions as usize)
            .map(|i| {
                let (text, options, correct, blooms, explanation) = QUESTION_BANK[i % QUESTION_BANK.len()];
                let difficulty = request.difficulty.unwrap_or(Difficulty::ALL[i % Difficulty::ALL.len()]);
                KeyedQuestion {
                    question: GeneratedQuestion {
                        id: format!("{}-q{}", session_id, i + 1),
                        question_text: text.to_string(),
                        option_a: options[0].to_string(),
                        option_b: options[1].to_string(),
                        option_c: options[2].to_string(),
                        option_d: options[3].to_string(),
                        difficulty_level: Some(difficulty),
                        blooms_taxonomy: Some(blooms.to_string()),
                    },
                    correct,
                    explanation: explanation.to_string(),
                }
            })
            .collect();

        let questions = keyed.iter().map(|k| k.question.clone()).collect();
        lock(&self.sessions).insert(session_id.clone(), keyed);
        GeneratedQuiz { session_id, questions }
    }

    fn score(&self, request: &SubmitRequest) -> Result<QuizResult, ServiceError> {
        let sessions = lock(&self.sessions);
        let keyed = sessions.get(&request.session_id).ok_or_else(|| ServiceError::Api {
            status: 404,
            message: "Quiz session not found".to_string(),
        })?;

        let results: Vec<ResultItem> = keyed
            .iter()
            .map(|k| {
                let user_answer = request.answers.get(&k.question.id).copied();
                ResultItem {
                    question_id: k.question.id.clone(),
                    question_text: k.question.question_text.clone(),
                    option_a: k.question.option_a.clone(),
                    option_b: k.question.option_b.clone(),
                    option_c: k.question.option_c.clone(),
                    option_d: k.question.option_d.clone(),
                    user_answer,
                    correct_answer: k.correct,
                    is_correct: user_answer == Some(k.correct),
                    explanation: k.explanation.clone(),
                }
            })
            .collect();

        let total = results.len();
        let correct = results.iter().filter(|r| r.is_correct).count();
        let raw = if total == 0 { 0.0 } else { correct as f64 / total as f64 * 100.0 };
        Ok(QuizResult {
            session_id: request.session_id.clone(),
            total_questions: total,
            correct_answers: correct,
            incorrect_answers: total - correct,
            percentage: (raw * 100.0).round() / 100.0,
            results,
            grade: None,
            feedback: None,
        })
    }

    fn render(&self, request: &ExportRequest) -> Result<ExportedDocument, ServiceError> {
        let sessions = lock(&self.sessions);
        let keyed = sessions.get(&request.session_id).ok_or_else(|| ServiceError::Api {
            status: 404,
            message: "Quiz session not found".to_string(),
        })?;

        let title = match request.export_type {
            ExportType::QuestionsOnly => "Quiz Questions",
            ExportType::ResultsWithAnswers => "Quiz Results",
        };
        let mut text = format!("{title}\nTotal Questions: {}\n\n", keyed.len());
        for (idx, k) in keyed.iter().enumerate() {
            text.push_str(&format!("Question {}: {}\n", idx + 1, k.question.question_text));
            for (label, option) in k.question.options() {
                let tick = request.export_type == ExportType::ResultsWithAnswers && label == k.correct;
                text.push_str(&format!("  {}. {}{}\n", label, option, if tick { " ✓" } else { "" }));
            }
            if request.export_type == ExportType::ResultsWithAnswers && !k.explanation.is_empty() {
                text.push_str(&format!("  Explanation: {}\n", k.explanation));
            }
            text.push('\n');
        }

        Ok(ExportedDocument { file_name: request.default_file_name(), bytes: text.into_bytes().into() })
    }
}

type BankEntry = (&'static str, [&'static str; 4], OptionLabel, &'static str, &'static str);

const QUESTION_BANK: [BankEntry; 5] = [
    (
        "Which layer of the OSI model is responsible for routing?",
        ["Data link", "Network", "Transport", "Session"],
        OptionLabel::B,
        "Remember",
        "Routing between networks happens at the network layer.",
    ),
    (
        "What does a hash function map its input to?",
        ["A fixed-size digest", "A sorted list", "A public key", "A random seed"],
        OptionLabel::A,
        "Understand",
        "Hash functions produce a fixed-size output regardless of input length.",
    ),
    (
        "Which data structure gives O(1) average lookup by key?",
        ["Linked list", "Binary heap", "Hash table", "Stack"],
        OptionLabel::C,
        "Apply",
        "Hash tables index buckets directly from the key's hash.",
    ),
    (
        "A process that waits forever for a resource held by another waiting process is in",
        ["Starvation", "Livelock", "Thrashing", "Deadlock"],
        OptionLabel::D,
        "Analyze",
        "Circular waiting on held resources is a deadlock.",
    ),
    (
        "Which sorting algorithm is stable in its standard form?",
        ["Merge sort", "Quick sort", "Heap sort", "Selection sort"],
        OptionLabel::A,
        "Evaluate",
        "Merge sort keeps equal elements in their original order.",
    ),
];

/// Scriptable in-process [`QuizService`].
#[derive(Debug, Clone)]
pub struct MockQuizService {
    handle: Arc<MockHandle>,
}

impl MockQuizService {
    pub fn new() -> (Self, Arc<MockHandle>) {
        let handle = Arc::new(MockHandle::default());
        (Self { handle: handle.clone() }, handle)
    }

    pub fn with_responses(responses: Vec<MockResponse>) -> (Self, Arc<MockHandle>) {
        let (service, handle) = Self::new();
        handle.add_responses(responses);
        (service, handle)
    }

    async fn enter(&self, call: MockCall) -> Option<MockResponse> {
        let op = call.op();
        if let Some(gate) = self.handle.record(call) {
            gate.notified().await;
        }
        self.handle.take_response(op)
    }
}

#[async_trait]
impl QuizService for MockQuizService {
    async fn upload(&self, file: UploadFile) -> Result<UploadedDocument, ServiceError> {
        let call = MockCall::Upload { file_name: file.file_name.clone(), size: file.bytes.len() };
        match self.enter(call).await {
            Some(MockResponse::Upload(scripted)) => scripted,
            _ => Ok(UploadedDocument { file_id: self.handle.next_id("file"), file_name: file.file_name }),
        }
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GeneratedQuiz, ServiceError> {
        match self.enter(MockCall::Generate(request.clone())).await {
            Some(MockResponse::Generate(scripted)) => scripted,
            _ => Ok(self.handle.build_quiz(&request)),
        }
    }

    async fn submit(&self, request: SubmitRequest) -> Result<QuizResult, ServiceError> {
        match self.enter(MockCall::Submit(request.clone())).await {
            Some(MockResponse::Submit(scripted)) => scripted,
            _ => self.handle.score(&request),
        }
    }

    async fn export(&self, request: ExportRequest) -> Result<ExportedDocument, ServiceError> {
        match self.enter(MockCall::Export(request.clone())).await {
            Some(MockResponse::Export(scripted)) => scripted,
            _ => self.handle.render(&request),
        }
    }

    async fn health(&self) -> bool {
        match self.enter(MockCall::Health).await {
            Some(MockResponse::Health(reachable)) => reachable,
            _ => true,
        }
    }

    fn clone_box(&self) -> Box<dyn QuizService> {
        Box::new(self.clone())
    }
}
