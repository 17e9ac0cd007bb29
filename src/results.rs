//! Presentation of a scored quiz: letter grade, per-option marks, review expansion,
//! feedback text and per-difficulty / per-Bloom's-level breakdown.
//!
//! Everything here is derived from an already computed [`QuizResult`]; nothing is
//! scored client-side.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::models::{Difficulty, GeneratedQuestion, OptionLabel, QuestionId, QuizResult, ResultItem};

const DEFAULT_BLOOMS_LEVEL: &str = "Understand";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Grade {
    S,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Bands are inclusive at each threshold and evaluated top-down.
    pub fn from_percentage(percentage: f64) -> Self {
        if percentage >= 93.0 {
            Grade::S
        } else if percentage >= 85.0 {
            Grade::A
        } else if percentage >= 75.0 {
            Grade::B
        } else if percentage >= 60.0 {
            Grade::C
        } else if percentage >= 35.0 {
            Grade::D
        } else {
            Grade::F
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self {
            Grade::S => "S",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        };
        f.write_str(letter)
    }
}

/// How a single option is highlighted in the review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    /// The user picked the correct answer.
    CorrectChoice,
    /// The user picked this option and it is wrong.
    WrongChoice,
    /// The correct answer, which the user did not pick (or nothing was picked).
    CorrectAnswer,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionView<'a> {
    pub label: OptionLabel,
    pub text: &'a str,
    pub is_correct: bool,
    pub is_selected: bool,
    pub mark: OptionMark,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    Unanswered,
}

impl ResultItem {
    pub fn verdict(&self) -> Verdict {
        match self.user_answer {
            None => Verdict::Unanswered,
            Some(_) if self.is_correct => Verdict::Correct,
            Some(_) => Verdict::Incorrect,
        }
    }

    pub fn option_views(&self) -> [OptionView<'_>; 4] {
        OptionLabel::ALL.map(|label| {
            let is_correct = label == self.correct_answer;
            let is_selected = self.user_answer == Some(label);
            let mark = match (is_selected, is_correct) {
                (true, true) => OptionMark::CorrectChoice,
                (true, false) => OptionMark::WrongChoice,
                (false, true) => OptionMark::CorrectAnswer,
                (false, false) => OptionMark::Plain,
            };
            OptionView { label, text: self.option(label), is_correct, is_selected, mark }
        })
    }
}

/// Which review item shows its detail. Toggling replaces, never stacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewState {
    expanded: Option<QuestionId>,
}

impl ReviewState {
    pub fn expanded(&self) -> Option<&str> {
        self.expanded.as_deref()
    }

    pub fn is_expanded(&self, question_id: &str) -> bool {
        self.expanded.as_deref() == Some(question_id)
    }

    pub fn toggle(&mut self, question_id: &str) {
        if self.is_expanded(question_id) {
            self.expanded = None;
        } else {
            self.expanded = Some(question_id.to_string());
        }
    }
}

/// Grade-aligned feedback message shown under the score.
pub fn feedback(result: &QuizResult, breakdown: &Breakdown) -> String {
    let pct = format_percentage(result.percentage);
    let grade = Grade::from_percentage(result.percentage);
    let mut message = match grade {
        Grade::S => format!("Outstanding performance! You scored {pct}% (Grade: S). You have mastered the concepts exceptionally well."),
        Grade::A => format!("Excellent work! You scored {pct}% (Grade: A). You show a strong understanding of the material."),
        Grade::B => format!("Good job! You scored {pct}% (Grade: B). You have a solid grasp of most concepts."),
        Grade::C => format!("Fair performance. You scored {pct}% (Grade: C). Some areas need review, check the explanations."),
        Grade::D => format!("You scored {pct}% (Grade: D). Review the material and practice more to improve."),
        Grade::F => format!("You scored {pct}% (Grade: F). Consider revisiting the material and taking the quiz again."),
    };

    if let Some(hard) = breakdown.by_difficulty.get(&Difficulty::Hard) {
        if hard.total > 0 && hard.percentage() < 50.0 {
            message.push_str(" You struggled with hard questions, focus on advanced topics to improve.");
        }
    }
    message
}

/// Two decimals, trailing zeros dropped: `66.67`, `80`, `12.5`.
pub fn format_percentage(percentage: f64) -> String {
    let rounded = format!("{:.2}", percentage);
    rounded.trim_end_matches('0').trim_end_matches('.').to_string()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Tally {
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.correct as f64 / self.total as f64 * 100.0
        }
    }

    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }
}

/// Correctness per difficulty tier and per Bloom's level.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Breakdown {
    pub by_difficulty: BTreeMap<Difficulty, Tally>,
    pub by_blooms: BTreeMap<String, Tally>,
}

impl Breakdown {
    /// Joins result items to their questions by id. Untagged questions count as
    /// `Medium` / `Understand`.
    pub fn compute(questions: &[GeneratedQuestion], result: &QuizResult) -> Self {
        let by_id: HashMap<&str, &GeneratedQuestion> =
            questions.iter().map(|q| (q.id.as_str(), q)).collect();

        let mut breakdown = Breakdown::default();
        for difficulty in Difficulty::ALL {
            breakdown.by_difficulty.insert(difficulty, Tally::default());
        }

        for item in &result.results {
            let question = by_id.get(item.question_id.as_str());
            let difficulty = question
                .and_then(|q| q.difficulty_level)
                .unwrap_or(Difficulty::Medium);
            let blooms = question
                .and_then(|q| q.blooms_taxonomy.clone())
                .unwrap_or_else(|| DEFAULT_BLOOMS_LEVEL.to_string());

            breakdown.by_difficulty.entry(difficulty).or_default().record(item.is_correct);
            breakdown.by_blooms.entry(blooms).or_default().record(item.is_correct);
        }
        breakdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, user: Option<OptionLabel>, correct: OptionLabel) -> ResultItem {
        ResultItem {
            question_id: id.to_string(),
            question_text: format!("Question {id}"),
            option_a: "alpha".into(),
            option_b: "beta".into(),
            option_c: "gamma".into(),
            option_d: "delta".into(),
            user_answer: user,
            correct_answer: correct,
            is_correct: user == Some(correct),
            explanation: String::new(),
        }
    }

    fn question(id: &str, difficulty: Option<Difficulty>, blooms: Option<&str>) -> GeneratedQuestion {
        GeneratedQuestion {
            id: id.to_string(),
            question_text: format!("Question {id}"),
            option_a: "alpha".into(),
            option_b: "beta".into(),
            option_c: "gamma".into(),
            option_d: "delta".into(),
            difficulty_level: difficulty,
            blooms_taxonomy: blooms.map(str::to_string),
        }
    }

    fn scored(items: Vec<ResultItem>) -> QuizResult {
        let correct = items.iter().filter(|i| i.is_correct).count();
        let total = items.len();
        QuizResult {
            session_id: "s".into(),
            total_questions: total,
            correct_answers: correct,
            incorrect_answers: total - correct,
            percentage: if total == 0 { 0.0 } else { correct as f64 / total as f64 * 100.0 },
            results: items,
            grade: None,
            feedback: None,
        }
    }

    #[test]
    fn grade_boundaries_are_inclusive() {
        assert_eq!(Grade::from_percentage(100.0), Grade::S);
        assert_eq!(Grade::from_percentage(93.0), Grade::S);
        assert_eq!(Grade::from_percentage(92.999), Grade::A);
        assert_eq!(Grade::from_percentage(85.0), Grade::A);
        assert_eq!(Grade::from_percentage(84.999), Grade::B);
        assert_eq!(Grade::from_percentage(75.0), Grade::B);
        assert_eq!(Grade::from_percentage(60.0), Grade::C);
        assert_eq!(Grade::from_percentage(59.999), Grade::D);
        assert_eq!(Grade::from_percentage(35.0), Grade::D);
        assert_eq!(Grade::from_percentage(34.999), Grade::F);
        assert_eq!(Grade::from_percentage(0.0), Grade::F);
    }

    #[test]
    fn correct_pick_is_marked_once() {
        let i = item("q1", Some(OptionLabel::B), OptionLabel::B);
        let views = i.option_views();
        assert_eq!(views[1].mark, OptionMark::CorrectChoice);
        assert!(views.iter().filter(|v| v.mark != OptionMark::Plain).count() == 1);
    }

    #[test]
    fn wrong_pick_shows_both_answers() {
        let i = item("q1", Some(OptionLabel::A), OptionLabel::D);
        let views = i.option_views();
        assert_eq!(views[0].mark, OptionMark::WrongChoice);
        assert_eq!(views[3].mark, OptionMark::CorrectAnswer);
        assert_eq!(i.verdict(), Verdict::Incorrect);
    }

    #[test]
    fn unanswered_still_highlights_correct_answer() {
        let i = item("q1", None, OptionLabel::C);
        let views = i.option_views();
        assert!(views.iter().all(|v| !v.is_selected));
        assert_eq!(views[2].mark, OptionMark::CorrectAnswer);
        assert_eq!(i.verdict(), Verdict::Unanswered);
    }

    #[test]
    fn toggle_replaces_expanded_item() {
        let mut review = ReviewState::default();
        review.toggle("q1");
        assert!(review.is_expanded("q1"));
        review.toggle("q2");
        assert!(review.is_expanded("q2"));
        assert!(!review.is_expanded("q1"));
        review.toggle("q2");
        assert_eq!(review.expanded(), None);
    }

    #[test]
    fn breakdown_groups_by_difficulty_and_blooms() {
        let questions = vec![
            question("q1", Some(Difficulty::Easy), Some("Remember")),
            question("q2", Some(Difficulty::Hard), Some("Analyze")),
            question("q3", Some(Difficulty::Hard), None),
            question("q4", None, None),
        ];
        let result = scored(vec![
            item("q1", Some(OptionLabel::A), OptionLabel::A),
            item("q2", Some(OptionLabel::B), OptionLabel::C),
            item("q3", None, OptionLabel::C),
            item("q4", Some(OptionLabel::D), OptionLabel::D),
        ]);

        let breakdown = Breakdown::compute(&questions, &result);
        assert_eq!(breakdown.by_difficulty[&Difficulty::Easy], Tally { correct: 1, total: 1 });
        assert_eq!(breakdown.by_difficulty[&Difficulty::Medium], Tally { correct: 1, total: 1 });
        assert_eq!(breakdown.by_difficulty[&Difficulty::Hard], Tally { correct: 0, total: 2 });
        assert_eq!(breakdown.by_blooms["Understand"], Tally { correct: 1, total: 2 });
        assert_eq!(breakdown.by_blooms["Analyze"].total, 1);
    }

    #[test]
    fn feedback_flags_weak_hard_questions() {
        let questions = vec![
            question("q1", Some(Difficulty::Hard), None),
            question("q2", Some(Difficulty::Easy), None),
        ];
        let result = scored(vec![
            item("q1", Some(OptionLabel::B), OptionLabel::C),
            item("q2", Some(OptionLabel::A), OptionLabel::A),
        ]);
        let breakdown = Breakdown::compute(&questions, &result);
        let text = feedback(&result, &breakdown);
        assert!(text.starts_with("You scored 50% (Grade: D)"));
        assert!(text.contains("struggled with hard questions"));
    }

    #[test]
    fn percentage_formatting_drops_trailing_zeros() {
        assert_eq!(format_percentage(80.0), "80");
        assert_eq!(format_percentage(12.5), "12.5");
        assert_eq!(format_percentage(200.0 / 3.0), "66.67");
    }
}
