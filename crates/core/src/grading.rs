use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::{OptionId, QuestionId, Quiz};

//
// ─── RESULT TYPES ──────────────────────────────────────────────────────────────
//

/// Why an attempt left the in-progress phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// The learner pressed submit.
    Manual,
    /// The countdown reached zero.
    TimeExpired,
}

/// Grading verdict for one question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,
    pub selected: Option<OptionId>,
    pub correct: Option<OptionId>,
    pub is_correct: bool,
}

/// Timing facts recorded alongside a grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptTiming {
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub time_used_secs: u32,
    pub reason: SubmitReason,
}

/// Result of a completed attempt. Computed once, when grading finishes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizResult {
    pub correct_count: u32,
    pub total_questions: u32,
    pub answered_count: u32,
    /// Rounded half-up, 0..=100.
    pub percentage: u8,
    pub passed: bool,
    pub passing_score: u8,
    pub outcomes: Vec<QuestionOutcome>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub time_used_secs: u32,
    pub reason: SubmitReason,
}

impl QuizResult {
    #[must_use]
    pub fn incorrect_count(&self) -> u32 {
        self.total_questions.saturating_sub(self.correct_count)
    }

    #[must_use]
    pub fn outcome(&self, question_id: QuestionId) -> Option<&QuestionOutcome> {
        self.outcomes.iter().find(|o| o.question_id == question_id)
    }
}

//
// ─── GRADING ───────────────────────────────────────────────────────────────────
//

/// Grades `answers` against `quiz`.
///
/// A question counts as correct only when the selected option id is the id
/// of its single correct option. Unanswered questions, and questions that do
/// not have exactly one correct option, count as incorrect.
#[must_use]
pub fn grade(
    quiz: &Quiz,
    answers: &BTreeMap<QuestionId, OptionId>,
    timing: AttemptTiming,
) -> QuizResult {
    let outcomes: Vec<QuestionOutcome> = quiz
        .questions()
        .iter()
        .map(|question| {
            let selected = answers.get(&question.id).copied();
            let correct = question.correct_option().map(|o| o.id);
            QuestionOutcome {
                question_id: question.id,
                selected,
                correct,
                is_correct: selected.is_some() && selected == correct,
            }
        })
        .collect();

    let total = saturating_u32(outcomes.len());
    let correct_count = saturating_u32(outcomes.iter().filter(|o| o.is_correct).count());
    let answered_count = saturating_u32(outcomes.iter().filter(|o| o.selected.is_some()).count());
    let percentage = percentage(correct_count, total);

    QuizResult {
        correct_count,
        total_questions: total,
        answered_count,
        percentage,
        passed: percentage >= quiz.passing_score(),
        passing_score: quiz.passing_score(),
        outcomes,
        started_at: timing.started_at,
        completed_at: timing.completed_at,
        time_used_secs: timing.time_used_secs,
        reason: timing.reason,
    }
}

/// `round(correct / total * 100)` in integer arithmetic, half rounding up.
#[must_use]
pub fn percentage(correct: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let correct = u64::from(correct.min(total));
    let total = u64::from(total);
    let rounded = (correct * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

fn saturating_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnswerOption, Difficulty, Question, QuizDraft, QuizId};
    use crate::time::fixed_now;

    fn quiz(count: u64, passing_score: u8) -> Quiz {
        let questions = (1..=count)
            .map(|id| {
                Question::new(
                    QuestionId::new(id),
                    format!("Question {id}"),
                    Difficulty::Medium,
                    vec![
                        AnswerOption::new(OptionId::new(id * 10 + 1), "right", true),
                        AnswerOption::new(OptionId::new(id * 10 + 2), "wrong", false),
                    ],
                )
            })
            .collect();
        Quiz::new(QuizDraft {
            id: QuizId::new(1),
            title: "Grading".into(),
            subject: "Tests".into(),
            time_limit_minutes: 5,
            passing_score,
            questions,
        })
        .unwrap()
    }

    fn timing() -> AttemptTiming {
        AttemptTiming {
            started_at: fixed_now(),
            completed_at: fixed_now(),
            time_used_secs: 0,
            reason: SubmitReason::Manual,
        }
    }

    fn right(id: u64) -> OptionId {
        OptionId::new(id * 10 + 1)
    }

    fn wrong(id: u64) -> OptionId {
        OptionId::new(id * 10 + 2)
    }

    #[test]
    fn four_of_five_scores_eighty() {
        let quiz = quiz(5, 80);
        let mut answers = BTreeMap::new();
        for id in 1..=4 {
            answers.insert(QuestionId::new(id), right(id));
        }
        answers.insert(QuestionId::new(5), wrong(5));

        let result = grade(&quiz, &answers, timing());
        assert_eq!(result.correct_count, 4);
        assert_eq!(result.total_questions, 5);
        assert_eq!(result.percentage, 80);
        assert!(result.passed);
        assert_eq!(result.incorrect_count(), 1);
    }

    #[test]
    fn unanswered_questions_count_as_wrong() {
        let quiz = quiz(5, 70);
        let answers: BTreeMap<_, _> = (1..=3).map(|id| (QuestionId::new(id), right(id))).collect();

        let result = grade(&quiz, &answers, timing());
        assert_eq!(result.correct_count, 3);
        assert_eq!(result.answered_count, 3);
        assert_eq!(result.percentage, 60);
        assert!(!result.passed);
        let skipped = result.outcome(QuestionId::new(5)).unwrap();
        assert_eq!(skipped.selected, None);
        assert!(!skipped.is_correct);
    }

    #[test]
    fn options_with_identical_text_grade_by_id() {
        let question = Question::new(
            QuestionId::new(1),
            "Which one?",
            Difficulty::Easy,
            vec![
                AnswerOption::new(OptionId::new(1), "Same", false),
                AnswerOption::new(OptionId::new(2), "Same", true),
            ],
        );
        let quiz = Quiz::new(QuizDraft {
            id: QuizId::new(2),
            title: "Twins".into(),
            subject: String::new(),
            time_limit_minutes: 1,
            passing_score: 100,
            questions: vec![question],
        })
        .unwrap();

        let mut answers = BTreeMap::new();
        answers.insert(QuestionId::new(1), OptionId::new(1));
        assert_eq!(grade(&quiz, &answers, timing()).correct_count, 0);

        answers.insert(QuestionId::new(1), OptionId::new(2));
        assert_eq!(grade(&quiz, &answers, timing()).correct_count, 1);
    }

    #[test]
    fn passing_is_inclusive() {
        let quiz = quiz(2, 50);
        let mut answers = BTreeMap::new();
        answers.insert(QuestionId::new(1), right(1));
        let result = grade(&quiz, &answers, timing());
        assert_eq!(result.percentage, 50);
        assert!(result.passed);
    }

    #[test]
    fn percentage_rounds_half_up() {
        assert_eq!(percentage(1, 3), 33);
        assert_eq!(percentage(2, 3), 67);
        assert_eq!(percentage(1, 8), 13);
        assert_eq!(percentage(0, 4), 0);
        assert_eq!(percentage(4, 4), 100);
        assert_eq!(percentage(0, 0), 0);
    }
}
