use std::collections::HashMap;

use crate::models::{OptionLabel, QuestionId};

/// Answers chosen so far in the quiz being taken.
///
/// One entry per question at most: selecting again overwrites. The store does not
/// know the active question set; [`crate::session::QuizSession`] only hands it ids
/// from that set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    answers: HashMap<QuestionId, OptionLabel>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the answer for `question_id`. Returns the previous choice.
    pub fn set_answer(&mut self, question_id: impl Into<QuestionId>, option: OptionLabel) -> Option<OptionLabel> {
        self.answers.insert(question_id.into(), option)
    }

    pub fn answer(&self, question_id: &str) -> Option<OptionLabel> {
        self.answers.get(question_id).copied()
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.answers.contains_key(question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Share of `total_questions` answered, in `[0, 1]`; 0 for an empty quiz.
    pub fn progress_fraction(&self, total_questions: usize) -> f64 {
        if total_questions == 0 {
            return 0.0;
        }
        self.answered_count() as f64 / total_questions as f64
    }

    /// Snapshot for the submission payload.
    pub fn to_map(&self) -> HashMap<QuestionId, OptionLabel> {
        self.answers.clone()
    }
}

impl FromIterator<(QuestionId, OptionLabel)> for AnswerStore {
    fn from_iter<I: IntoIterator<Item = (QuestionId, OptionLabel)>>(iter: I) -> Self {
        Self { answers: iter.into_iter().collect() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selecting_again_overwrites() {
        let mut store = AnswerStore::new();
        assert_eq!(store.set_answer("q1", OptionLabel::A), None);
        assert_eq!(store.set_answer("q1", OptionLabel::C), Some(OptionLabel::A));
        assert_eq!(store.answered_count(), 1);
        assert_eq!(store.answer("q1"), Some(OptionLabel::C));
    }

    #[test]
    fn progress_fraction_handles_empty_quiz() {
        let mut store = AnswerStore::new();
        assert_eq!(store.progress_fraction(0), 0.0);
        store.set_answer("q1", OptionLabel::B);
        store.set_answer("q2", OptionLabel::D);
        assert_eq!(store.progress_fraction(4), 0.5);
        assert!(store.is_answered("q2"));
        assert!(!store.is_answered("q3"));
    }

    #[test]
    fn collects_from_pairs() {
        let store: AnswerStore = vec![("q1".to_string(), OptionLabel::A), ("q1".to_string(), OptionLabel::C)]
            .into_iter()
            .collect();
        assert_eq!(store.answered_count(), 1);
        assert_eq!(store.answer("q1"), Some(OptionLabel::C));
    }
}
