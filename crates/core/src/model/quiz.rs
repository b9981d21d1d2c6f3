use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::model::ids::{OptionId, QuestionId, QuizId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuizError {
    #[error("quiz title cannot be empty")]
    EmptyTitle,

    #[error("time limit must be at least one minute")]
    InvalidTimeLimit,

    #[error("passing score must be between 0 and 100, got {provided}")]
    InvalidPassingScore { provided: u8 },

    #[error("quiz must contain at least one question")]
    NoQuestions,

    #[error("question {question} appears more than once")]
    DuplicateQuestion { question: QuestionId },

    #[error("question {question} has an empty prompt")]
    EmptyPrompt { question: QuestionId },

    #[error("question {question} needs at least two options, got {count}")]
    TooFewOptions { question: QuestionId, count: usize },

    #[error("option {option} appears more than once in question {question}")]
    DuplicateOption {
        question: QuestionId,
        option: OptionId,
    },

    #[error("option {option} of question {question} has empty text")]
    EmptyOptionText {
        question: QuestionId,
        option: OptionId,
    },

    #[error("question {question} has no correct option")]
    NoCorrectOption { question: QuestionId },

    #[error("question {question} has {count} correct options, expected exactly one")]
    MultipleCorrectOptions { question: QuestionId, count: usize },
}

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

/// Difficulty label attached to a question. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

/// One selectable answer of a question.
///
/// `is_correct` is kept on the domain value for grading; the view layer
/// never copies it into what is shown during a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: OptionId,
    pub text: String,
    pub is_correct: bool,
}

impl AnswerOption {
    #[must_use]
    pub fn new(id: OptionId, text: impl Into<String>, is_correct: bool) -> Self {
        Self {
            id,
            text: text.into(),
            is_correct,
        }
    }

    /// Positional display label: `A`, `B`, ... then numbers past `Z`.
    #[must_use]
    pub fn label_for(index: usize) -> String {
        match u8::try_from(index) {
            Ok(i) if i < 26 => char::from(b'A' + i).to_string(),
            _ => (index + 1).to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub prompt: String,
    pub options: Vec<AnswerOption>,
    pub difficulty: Difficulty,
}

impl Question {
    #[must_use]
    pub fn new(
        id: QuestionId,
        prompt: impl Into<String>,
        difficulty: Difficulty,
        options: Vec<AnswerOption>,
    ) -> Self {
        Self {
            id,
            prompt: prompt.into(),
            options,
            difficulty,
        }
    }

    /// The single option flagged correct, if the question has exactly one.
    #[must_use]
    pub fn correct_option(&self) -> Option<&AnswerOption> {
        let mut correct = self.options.iter().filter(|o| o.is_correct);
        match (correct.next(), correct.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }

    #[must_use]
    pub fn option(&self, id: OptionId) -> Option<&AnswerOption> {
        self.options.iter().find(|o| o.id == id)
    }

    #[must_use]
    pub fn has_option(&self, id: OptionId) -> bool {
        self.option(id).is_some()
    }

    fn validate(&self) -> Result<(), QuizError> {
        let question = self.id;
        if self.prompt.trim().is_empty() {
            return Err(QuizError::EmptyPrompt { question });
        }
        if self.options.len() < 2 {
            return Err(QuizError::TooFewOptions {
                question,
                count: self.options.len(),
            });
        }

        let mut seen = HashSet::with_capacity(self.options.len());
        for option in &self.options {
            if !seen.insert(option.id) {
                return Err(QuizError::DuplicateOption {
                    question,
                    option: option.id,
                });
            }
            if option.text.trim().is_empty() {
                return Err(QuizError::EmptyOptionText {
                    question,
                    option: option.id,
                });
            }
        }

        match self.options.iter().filter(|o| o.is_correct).count() {
            0 => Err(QuizError::NoCorrectOption { question }),
            1 => Ok(()),
            count => Err(QuizError::MultipleCorrectOptions { question, count }),
        }
    }
}

//
// ─── QUIZ ──────────────────────────────────────────────────────────────────────
//

/// Unvalidated quiz definition as handed over by a quiz provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizDraft {
    pub id: QuizId,
    pub title: String,
    pub subject: String,
    pub time_limit_minutes: u32,
    pub passing_score: u8,
    pub questions: Vec<Question>,
}

/// Immutable, validated quiz definition.
///
/// Every question has a non-empty prompt, at least two options with unique
/// ids, and exactly one correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    id: QuizId,
    title: String,
    subject: String,
    time_limit_minutes: u32,
    passing_score: u8,
    questions: Vec<Question>,
}

impl Quiz {
    /// Validates a draft into a quiz.
    ///
    /// # Errors
    ///
    /// Returns the first `QuizError` found, checking quiz-level fields before
    /// walking the questions in order.
    pub fn new(draft: QuizDraft) -> Result<Self, QuizError> {
        let title = draft.title.trim().to_owned();
        if title.is_empty() {
            return Err(QuizError::EmptyTitle);
        }
        if draft.time_limit_minutes == 0 {
            return Err(QuizError::InvalidTimeLimit);
        }
        if draft.passing_score > 100 {
            return Err(QuizError::InvalidPassingScore {
                provided: draft.passing_score,
            });
        }
        if draft.questions.is_empty() {
            return Err(QuizError::NoQuestions);
        }

        let mut seen = HashSet::with_capacity(draft.questions.len());
        for question in &draft.questions {
            if !seen.insert(question.id) {
                return Err(QuizError::DuplicateQuestion {
                    question: question.id,
                });
            }
            question.validate()?;
        }

        Ok(Self {
            id: draft.id,
            title,
            subject: draft.subject.trim().to_owned(),
            time_limit_minutes: draft.time_limit_minutes,
            passing_score: draft.passing_score,
            questions: draft.questions,
        })
    }

    #[must_use]
    pub fn id(&self) -> QuizId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    #[must_use]
    pub fn time_limit_minutes(&self) -> u32 {
        self.time_limit_minutes
    }

    /// Countdown length for one attempt.
    #[must_use]
    pub fn time_limit_secs(&self) -> u32 {
        self.time_limit_minutes.saturating_mul(60)
    }

    /// Minimum percentage required to pass.
    #[must_use]
    pub fn passing_score(&self) -> u8 {
        self.passing_score
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    /// Never zero for a validated quiz.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
