//! Read models handed to the presentation layer.
//!
//! Nothing here carries `is_correct` while an attempt is running; correct
//! options only surface through the [`QuizResult`] once the attempt is
//! completed.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::grading::QuizResult;
use crate::model::{AnswerOption, Difficulty, OptionId, QuestionId, QuizId};
use crate::session::{QuizSession, SessionPhase, SessionProgress};
use crate::time::format_countdown;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionView {
    pub id: OptionId,
    pub label: String,
    pub text: String,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView {
    pub index: usize,
    /// 1-based position, for "Question 3 of 10".
    pub number: usize,
    pub total: usize,
    pub question_id: QuestionId,
    pub prompt: String,
    pub difficulty: Difficulty,
    pub options: Vec<OptionView>,
    pub flagged: bool,
}

impl QuestionView {
    #[must_use]
    pub fn current(session: &QuizSession) -> Self {
        let question = session.current_question();
        let selected = session.answer(question.id);
        let options = question
            .options
            .iter()
            .enumerate()
            .map(|(i, option)| OptionView {
                id: option.id,
                label: AnswerOption::label_for(i),
                text: option.text.clone(),
                selected: selected == Some(option.id),
            })
            .collect();

        Self {
            index: session.current_index(),
            number: session.current_index() + 1,
            total: session.question_count(),
            question_id: question.id,
            prompt: question.prompt.clone(),
            difficulty: question.difficulty,
            options,
            flagged: session.is_flagged(question.id),
        }
    }

    /// Option at a display label such as `"b"` or `"B"`.
    #[must_use]
    pub fn option_by_label(&self, label: &str) -> Option<&OptionView> {
        let label = label.trim();
        self.options
            .iter()
            .find(|o| o.label.eq_ignore_ascii_case(label))
    }
}

/// Everything a renderer needs for one frame of the quiz player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub quiz_id: QuizId,
    pub title: String,
    pub subject: String,
    pub phase: SessionPhase,
    pub attempt_number: u32,
    pub question: QuestionView,
    pub answers: BTreeMap<QuestionId, OptionId>,
    pub flagged: Vec<QuestionId>,
    pub time_remaining_secs: u32,
    pub countdown: String,
    pub progress: SessionProgress,
    pub result: Option<QuizResult>,
}

impl SessionSnapshot {
    #[must_use]
    pub fn capture(session: &QuizSession) -> Self {
        let quiz = session.quiz();
        Self {
            quiz_id: quiz.id(),
            title: quiz.title().to_owned(),
            subject: quiz.subject().to_owned(),
            phase: session.phase(),
            attempt_number: session.attempt_number(),
            question: QuestionView::current(session),
            answers: session.answers().clone(),
            flagged: session.flagged().iter().copied().collect(),
            time_remaining_secs: session.time_remaining_secs(),
            countdown: format_countdown(session.time_remaining_secs()),
            progress: session.progress(),
            result: session.result().cloned(),
        }
    }
}
