mod ids;
mod quiz;

pub use ids::{AttemptId, OptionId, ParseIdError, QuestionId, QuizId, UserId};
pub use quiz::{AnswerOption, Difficulty, Question, Quiz, QuizDraft, QuizError};
