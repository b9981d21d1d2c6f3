use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use quiz_core::model::{AttemptId, Quiz, QuizError, QuizId, UserId};
use quiz_core::{QuizResult, SubmitReason};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid quiz: {0}")]
    InvalidQuiz(#[from] QuizError),
}

//
// ─── ATTEMPT RECORDS ───────────────────────────────────────────────────────────
//

/// Completed attempt ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewAttemptRecord {
    pub quiz_id: QuizId,
    pub user_id: UserId,
    pub attempt_number: u32,
    pub correct_count: u32,
    pub total_questions: u32,
    pub percentage: u8,
    pub passed: bool,
    pub reason: SubmitReason,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub time_used_secs: u32,
}

impl NewAttemptRecord {
    #[must_use]
    pub fn from_result(
        quiz_id: QuizId,
        user_id: UserId,
        attempt_number: u32,
        result: &QuizResult,
    ) -> Self {
        Self {
            quiz_id,
            user_id,
            attempt_number,
            correct_count: result.correct_count,
            total_questions: result.total_questions,
            percentage: result.percentage,
            passed: result.passed,
            reason: result.reason,
            started_at: result.started_at,
            completed_at: result.completed_at,
            time_used_secs: result.time_used_secs,
        }
    }
}

/// Persisted attempt with its assigned id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttemptRecord {
    pub id: AttemptId,
    #[serde(flatten)]
    pub attempt: NewAttemptRecord,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Read side of the quiz provider.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    /// Persist or replace a quiz definition.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the quiz cannot be stored.
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError>;

    /// Fetch a quiz by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError>;

    /// All quizzes ordered by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails.
    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError>;
}

/// History of completed attempts. In-progress state is never stored.
#[async_trait]
pub trait AttemptRepository: Send + Sync {
    /// Append a completed attempt and return its new id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the attempt cannot be stored.
    async fn append_attempt(&self, attempt: &NewAttemptRecord) -> Result<AttemptId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError>;

    /// Attempts for one quiz, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the listing fails.
    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptRecord>, StorageError>;
}

//
// ─── IN-MEMORY BACKEND ─────────────────────────────────────────────────────────
//

/// Simple in-memory repository implementation for testing and the terminal player.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    quizzes: Arc<Mutex<BTreeMap<QuizId, Quiz>>>,
    attempts: Arc<Mutex<Vec<AttemptRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with the given quizzes. Later duplicates win.
    #[must_use]
    pub fn with_quizzes(quizzes: impl IntoIterator<Item = Quiz>) -> Self {
        let map = quizzes.into_iter().map(|q| (q.id(), q)).collect();
        Self {
            quizzes: Arc::new(Mutex::new(map)),
            attempts: Arc::default(),
        }
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl QuizRepository for InMemoryRepository {
    async fn upsert_quiz(&self, quiz: &Quiz) -> Result<(), StorageError> {
        let mut guard = self.quizzes.lock().map_err(poisoned)?;
        guard.insert(quiz.id(), quiz.clone());
        Ok(())
    }

    async fn get_quiz(&self, id: QuizId) -> Result<Quiz, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_quizzes(&self) -> Result<Vec<Quiz>, StorageError> {
        let guard = self.quizzes.lock().map_err(poisoned)?;
        Ok(guard.values().cloned().collect())
    }
}

#[async_trait]
impl AttemptRepository for InMemoryRepository {
    async fn append_attempt(&self, attempt: &NewAttemptRecord) -> Result<AttemptId, StorageError> {
        let mut guard = self.attempts.lock().map_err(poisoned)?;
        let next = u64::try_from(guard.len())
            .map_err(|_| StorageError::Conflict)?
            .saturating_add(1);
        let id = AttemptId::new(next);
        guard.push(AttemptRecord {
            id,
            attempt: attempt.clone(),
        });
        Ok(id)
    }

    async fn get_attempt(&self, id: AttemptId) -> Result<AttemptRecord, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn list_attempts(&self, quiz_id: QuizId) -> Result<Vec<AttemptRecord>, StorageError> {
        let guard = self.attempts.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .filter(|a| a.attempt.quiz_id == quiz_id)
            .cloned()
            .collect())
    }
}

/// Aggregates the repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub quizzes: Arc<dyn QuizRepository>,
    pub attempts: Arc<dyn AttemptRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory(repo: InMemoryRepository) -> Self {
        let quizzes: Arc<dyn QuizRepository> = Arc::new(repo.clone());
        let attempts: Arc<dyn AttemptRepository> = Arc::new(repo);
        Self { quizzes, attempts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{AnswerOption, Difficulty, OptionId, Question, QuestionId, QuizDraft};
    use quiz_core::time::fixed_now;

    fn build_quiz(id: u64) -> Quiz {
        Quiz::new(QuizDraft {
            id: QuizId::new(id),
            title: format!("Quiz {id}"),
            subject: "Testing".into(),
            time_limit_minutes: 1,
            passing_score: 50,
            questions: vec![Question::new(
                QuestionId::new(1),
                "Q",
                Difficulty::Medium,
                vec![
                    AnswerOption::new(OptionId::new(1), "yes", true),
                    AnswerOption::new(OptionId::new(2), "no", false),
                ],
            )],
        })
        .unwrap()
    }

    fn attempt(quiz_id: u64, percentage: u8) -> NewAttemptRecord {
        NewAttemptRecord {
            quiz_id: QuizId::new(quiz_id),
            user_id: UserId::new(1),
            attempt_number: 1,
            correct_count: 1,
            total_questions: 1,
            percentage,
            passed: percentage >= 50,
            reason: SubmitReason::Manual,
            started_at: fixed_now(),
            completed_at: fixed_now(),
            time_used_secs: 5,
        }
    }

    #[tokio::test]
    async fn quizzes_round_trip_and_list_in_id_order() {
        let repo = InMemoryRepository::new();
        repo.upsert_quiz(&build_quiz(2)).await.unwrap();
        repo.upsert_quiz(&build_quiz(1)).await.unwrap();

        let fetched = repo.get_quiz(QuizId::new(2)).await.unwrap();
        assert_eq!(fetched.title(), "Quiz 2");

        let ids: Vec<_> = repo
            .list_quizzes()
            .await
            .unwrap()
            .iter()
            .map(Quiz::id)
            .collect();
        assert_eq!(ids, vec![QuizId::new(1), QuizId::new(2)]);
    }

    #[tokio::test]
    async fn missing_quiz_is_not_found() {
        let repo = InMemoryRepository::with_quizzes([build_quiz(1)]);
        let err = repo.get_quiz(QuizId::new(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn attempts_get_sequential_ids_and_filter_by_quiz() {
        let repo = InMemoryRepository::new();
        let first = repo.append_attempt(&attempt(1, 100)).await.unwrap();
        let second = repo.append_attempt(&attempt(2, 0)).await.unwrap();
        let third = repo.append_attempt(&attempt(1, 0)).await.unwrap();
        assert_eq!(first, AttemptId::new(1));
        assert_eq!(second, AttemptId::new(2));
        assert_eq!(third, AttemptId::new(3));

        let history = repo.list_attempts(QuizId::new(1)).await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history[0].attempt.passed);
        assert!(!history[1].attempt.passed);

        let fetched = repo.get_attempt(second).await.unwrap();
        assert_eq!(fetched.attempt.quiz_id, QuizId::new(2));
    }
}
