#![allow(dead_code)]

use std::sync::{Arc, Once};

use quizgen_client::clients::{MockHandle, MockQuizService};
use quizgen_client::config::UploadPolicy;
use quizgen_client::models::{OptionLabel, UploadFile};
use quizgen_client::{Phase, QuizController};

pub const MB: usize = 1024 * 1024;

static INIT: Once = Once::new();

/// Routes `tracing` output through the test harness when RUST_LOG is set.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn mock_controller() -> (QuizController<MockQuizService>, Arc<MockHandle>) {
    init_test_logging();
    let (service, handle) = MockQuizService::new();
    (QuizController::new(service, UploadPolicy::default()), handle)
}

pub fn file_of_size(file_name: &str, size: usize) -> UploadFile {
    UploadFile::new(file_name, vec![b'x'; size])
}

/// A controller already past upload and generation, sitting in Take.
pub async fn controller_in_take(num_questions: u32) -> (QuizController<MockQuizService>, Arc<MockHandle>) {
    let (controller, handle) = mock_controller();
    controller.upload(file_of_size("lecture.pdf", 2 * MB)).await.unwrap();
    controller.generate(num_questions, None).await.unwrap();
    assert_eq!(controller.session().phase(), Phase::Take);
    (controller, handle)
}

/// Answers the first `count` questions with option A.
pub fn answer_first(controller: &QuizController<MockQuizService>, count: usize) {
    let mut session = controller.session();
    let ids: Vec<String> = session.questions().iter().take(count).map(|q| q.id.clone()).collect();
    for id in ids {
        session.set_answer(&id, OptionLabel::A).unwrap();
    }
}

/// A controller sitting in Results after answering every question.
pub async fn controller_in_results(num_questions: u32) -> (QuizController<MockQuizService>, Arc<MockHandle>) {
    let (controller, handle) = controller_in_take(num_questions).await;
    answer_first(&controller, num_questions as usize);
    controller.submit(|_| panic!("nothing is unanswered")).await.unwrap();
    assert_eq!(controller.session().phase(), Phase::Results);
    (controller, handle)
}
