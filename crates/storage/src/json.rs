//! JSON quiz files: a single quiz object or an array of them.

use serde::Deserialize;
use std::path::Path;

use quiz_core::model::Quiz;

use crate::records::QuizRecord;
use crate::repository::{InMemoryRepository, StorageError};

#[derive(Deserialize)]
#[serde(untagged)]
enum QuizFile {
    Many(Vec<QuizRecord>),
    One(QuizRecord),
}

/// # Errors
///
/// Returns `StorageError::Serialization` when the text is not a quiz or a
/// list of quizzes.
pub fn parse_quiz_records(raw: &str) -> Result<Vec<QuizRecord>, StorageError> {
    let file: QuizFile =
        serde_json::from_str(raw).map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(match file {
        QuizFile::Many(records) => records,
        QuizFile::One(record) => vec![record],
    })
}

/// Parse and validate every quiz in `raw`.
///
/// # Errors
///
/// Returns `StorageError::Serialization` for malformed JSON and
/// `StorageError::InvalidQuiz` for the first quiz that fails validation.
pub fn parse_quizzes(raw: &str) -> Result<Vec<Quiz>, StorageError> {
    parse_quiz_records(raw)?
        .into_iter()
        .map(|record| record.into_quiz().map_err(StorageError::from))
        .collect()
}

/// # Errors
///
/// Returns `StorageError::Io` if the file cannot be read, otherwise the
/// errors of [`parse_quizzes`].
pub fn load_quizzes(path: impl AsRef<Path>) -> Result<Vec<Quiz>, StorageError> {
    let raw = std::fs::read_to_string(path)?;
    parse_quizzes(&raw)
}

/// Load a quiz file into a fresh in-memory repository.
///
/// # Errors
///
/// See [`load_quizzes`].
pub fn load_repository(path: impl AsRef<Path>) -> Result<InMemoryRepository, StorageError> {
    Ok(InMemoryRepository::with_quizzes(load_quizzes(path)?))
}
