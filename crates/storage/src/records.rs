use serde::{Deserialize, Serialize};

use quiz_core::model::{
    AnswerOption, Difficulty, OptionId, Question, QuestionId, Quiz, QuizDraft, QuizError, QuizId,
};

/// Wire shape of a quiz as served by the quiz provider.
///
/// This mirrors the domain `Quiz` so loaders can deserialize without leaking
/// provider field names into the domain layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub subject: String,
    /// Minutes.
    pub time_limit: u32,
    /// Percentage, 0..=100.
    pub passing_score: u8,
    pub questions: Vec<QuestionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    pub options: Vec<OptionRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionRecord {
    /// Providers that only send text get positional ids (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub text: String,
    #[serde(default)]
    pub is_correct: bool,
}

impl QuizRecord {
    /// Convert the record into a validated domain `Quiz`.
    ///
    /// # Errors
    ///
    /// Returns `QuizError` when the payload breaks a quiz invariant, e.g. a
    /// question with zero or several correct options.
    pub fn into_quiz(self) -> Result<Quiz, QuizError> {
        let questions = self
            .questions
            .into_iter()
            .map(QuestionRecord::into_question)
            .collect();

        Quiz::new(QuizDraft {
            id: QuizId::new(self.id),
            title: self.title,
            subject: self.subject,
            time_limit_minutes: self.time_limit,
            passing_score: self.passing_score,
            questions,
        })
    }
}

impl QuestionRecord {
    fn into_question(self) -> Question {
        let options = self
            .options
            .into_iter()
            .zip(1_u64..)
            .map(|(option, position)| {
                AnswerOption::new(
                    OptionId::new(option.id.unwrap_or(position)),
                    option.text,
                    option.is_correct,
                )
            })
            .collect();
        Question::new(QuestionId::new(self.id), self.text, self.difficulty, options)
    }
}
