use std::sync::Arc;

use tracing::info;

use quiz_core::{Clock, QuizResult};
use quiz_core::model::{AttemptId, Quiz, QuizId, UserId};
use storage::{AttemptRecord, AttemptRepository, NewAttemptRecord, QuizRepository};

use super::events::SessionEvents;
use super::service::{SessionService, SessionSettings};
use crate::error::SessionError;

/// Who is taking the quiz. Passed in explicitly; there is no ambient user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Learner {
    pub id: UserId,
    pub name: String,
}

impl Learner {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Orchestrates session start from the quiz provider and attempt persistence.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    quizzes: Arc<dyn QuizRepository>,
    attempts: Arc<dyn AttemptRepository>,
    settings: SessionSettings,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        quizzes: Arc<dyn QuizRepository>,
        attempts: Arc<dyn AttemptRepository>,
    ) -> Self {
        Self {
            clock,
            quizzes,
            attempts,
            settings: SessionSettings::default(),
        }
    }

    #[must_use]
    pub fn with_settings(mut self, settings: SessionSettings) -> Self {
        self.settings = settings;
        self
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the provider cannot list quizzes.
    pub async fn list_quizzes(&self) -> Result<Vec<Quiz>, SessionError> {
        Ok(self.quizzes.list_quizzes().await?)
    }

    /// Fetch the quiz once and start a timed attempt on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` when the quiz cannot be fetched.
    pub async fn start_session(
        &self,
        quiz_id: QuizId,
        learner: Learner,
    ) -> Result<(SessionService, SessionEvents), SessionError> {
        let quiz = self.quizzes.get_quiz(quiz_id).await?;
        info!(
            %quiz_id,
            user_id = %learner.id,
            questions = quiz.question_count(),
            time_limit_secs = quiz.time_limit_secs(),
            "starting quiz session"
        );
        Ok(SessionService::start(
            Arc::new(quiz),
            learner,
            self.clock,
            self.settings,
        ))
    }

    /// Persist the attempt the session currently holds. Calling this again
    /// for the same attempt returns the id already stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotCompleted` if the attempt has no result yet.
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn finalize_attempt(
        &self,
        session: &mut SessionService,
    ) -> Result<AttemptId, SessionError> {
        let (attempt_number, result) =
            session.inspect(|s| (s.attempt_number(), s.result().cloned()))?;
        let result = result.ok_or(SessionError::NotCompleted)?;
        self.record_result(session, attempt_number, &result).await
    }

    /// Persist a result as delivered by `SessionEvent::Completed`.
    ///
    /// The live attempt is not consulted, so a result still gets stored when
    /// a retake has already replaced it. Each attempt number is stored once.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if persistence fails.
    pub async fn record_result(
        &self,
        session: &mut SessionService,
        attempt_number: u32,
        result: &QuizResult,
    ) -> Result<AttemptId, SessionError> {
        if let Some(id) = session.recorded_attempt(attempt_number) {
            return Ok(id);
        }

        let quiz_id = session.quiz_id();
        let record =
            NewAttemptRecord::from_result(quiz_id, session.learner().id, attempt_number, result);
        let id = self.attempts.append_attempt(&record).await?;
        session.mark_recorded(attempt_number, id);
        info!(%quiz_id, attempt_id = %id, attempt_number, "attempt recorded");
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Storage` (`NotFound` included) if the attempt
    /// cannot be read back.
    pub async fn attempt(&self, id: AttemptId) -> Result<AttemptRecord, SessionError> {
        Ok(self.attempts.get_attempt(id).await?)
    }

    /// Recorded attempts for a quiz, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` if the listing fails.
    pub async fn attempt_history(
        &self,
        quiz_id: QuizId,
    ) -> Result<Vec<AttemptRecord>, SessionError> {
        Ok(self.attempts.list_attempts(quiz_id).await?)
    }
}
