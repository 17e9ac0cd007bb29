//! Late responses and repeated triggers, driven through held mock calls.

mod test_utils;

use quizgen_client::clients::{MockOp, MockResponse};
use quizgen_client::export::{ExportType, FileFormat};
use quizgen_client::models::QuizResult;
use quizgen_client::{Completion, Operation, Phase, QuizError, SubmitOutcome};

use crate::test_utils::*;

#[tokio::test]
async fn upload_answered_after_restart_is_discarded() {
    let (controller, handle) = mock_controller();
    handle.hold(MockOp::Upload);

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.upload(file_of_size("old.pdf", 1024)).await })
    };
    handle.wait_for_calls(MockOp::Upload, 1).await;
    assert!(controller.session().is_in_flight(Operation::Upload));

    controller.restart();
    assert!(!controller.session().is_in_flight(Operation::Upload));
    handle.release(MockOp::Upload);

    let completion = pending.await.unwrap().unwrap();
    assert_eq!(completion, Completion::Stale);
    let session = controller.session();
    assert_eq!(session.phase(), Phase::Upload);
    assert!(session.document().is_none());
    assert_eq!(session.error(), None);
}

#[tokio::test]
async fn late_quiz_does_not_replace_the_new_document() {
    let (controller, handle) = mock_controller();
    controller.upload(file_of_size("first.pdf", 1024)).await.unwrap();
    handle.hold(MockOp::Generate);

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.generate(5, None).await })
    };
    handle.wait_for_calls(MockOp::Generate, 1).await;

    controller.restart();
    controller.upload(file_of_size("second.pdf", 1024)).await.unwrap();
    handle.release(MockOp::Generate);

    assert_eq!(pending.await.unwrap().unwrap(), Completion::Stale);
    let session = controller.session();
    assert_eq!(session.phase(), Phase::Generate);
    assert_eq!(session.document().unwrap().file_name, "second.pdf");
    assert!(session.questions().is_empty());
    assert!(!session.is_in_flight(Operation::Generate));
}

#[tokio::test]
async fn late_failure_after_restart_leaves_no_overlay() {
    let (controller, handle) = controller_in_take(3).await;
    answer_first(&controller, 3);
    handle.add_response(MockResponse::Submit(Err(quizgen_client::ServiceError::Http(
        "timed out".to_string(),
    ))));
    handle.hold(MockOp::Submit);

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit(|_| true).await })
    };
    handle.wait_for_calls(MockOp::Submit, 1).await;
    controller.restart();
    handle.release(MockOp::Submit);

    let outcome = pending.await.unwrap().unwrap();
    assert_eq!(outcome, SubmitOutcome::Sent(Completion::Stale));
    let session = controller.session();
    assert_eq!(session.phase(), Phase::Upload);
    assert_eq!(session.error(), None);
}

#[tokio::test]
async fn result_for_another_session_is_ignored() {
    let (controller, handle) = controller_in_take(2).await;
    answer_first(&controller, 2);
    handle.add_response(MockResponse::Submit(Ok(QuizResult {
        session_id: "someone-else".to_string(),
        total_questions: 0,
        correct_answers: 0,
        incorrect_answers: 0,
        percentage: 0.0,
        results: Vec::new(),
        grade: None,
        feedback: None,
    })));

    let outcome = controller.submit(|_| true).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Sent(Completion::Stale));
    let session = controller.session();
    assert_eq!(session.phase(), Phase::Take);
    assert_eq!(session.answered_count(), 2);
}

#[tokio::test]
async fn repeated_upload_is_suppressed_while_pending() {
    let (controller, handle) = mock_controller();
    handle.hold(MockOp::Upload);

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.upload(file_of_size("lecture.pdf", 1024)).await })
    };
    handle.wait_for_calls(MockOp::Upload, 1).await;

    let err = controller.upload(file_of_size("lecture.pdf", 1024)).await.unwrap_err();
    assert!(matches!(err, QuizError::Busy(Operation::Upload)));
    assert_eq!(handle.call_count(MockOp::Upload), 1);

    handle.release(MockOp::Upload);
    assert!(pending.await.unwrap().unwrap().is_applied());
    assert_eq!(controller.session().phase(), Phase::Generate);
}

#[tokio::test]
async fn navigation_stays_live_during_submission() {
    let (controller, handle) = controller_in_take(4).await;
    answer_first(&controller, 4);
    handle.hold(MockOp::Submit);

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit(|_| true).await })
    };
    handle.wait_for_calls(MockOp::Submit, 1).await;

    {
        let mut session = controller.session();
        assert!(session.next());
        assert_eq!(session.cursor(), 1);
    }
    let err = controller.submit(|_| true).await.unwrap_err();
    assert!(matches!(err, QuizError::Busy(Operation::Submit)));

    handle.release(MockOp::Submit);
    assert!(matches!(pending.await.unwrap().unwrap(), SubmitOutcome::Sent(Completion::Applied(()))));
    assert_eq!(controller.session().phase(), Phase::Results);
    assert_eq!(handle.call_count(MockOp::Submit), 1);
}

#[tokio::test]
async fn exports_of_different_formats_run_side_by_side() {
    let (controller, handle) = controller_in_results(2).await;
    handle.hold(MockOp::Export);

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.export(ExportType::ResultsWithAnswers, FileFormat::Pdf).await })
    };
    handle.wait_for_calls(MockOp::Export, 1).await;

    let same = controller.export(ExportType::ResultsWithAnswers, FileFormat::Pdf).await.unwrap_err();
    assert!(matches!(
        same,
        QuizError::Busy(Operation::Export(ExportType::ResultsWithAnswers, FileFormat::Pdf))
    ));

    handle.release(MockOp::Export);
    let docx = controller.export(ExportType::ResultsWithAnswers, FileFormat::Docx).await.unwrap();
    assert!(docx.is_applied());
    assert!(pending.await.unwrap().unwrap().is_applied());
}
