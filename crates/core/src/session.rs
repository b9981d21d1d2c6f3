use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::grading::{self, AttemptTiming, QuizResult, SubmitReason};
use crate::model::{OptionId, Question, QuestionId, Quiz};

//
// ─── PHASE ─────────────────────────────────────────────────────────────────────
//

/// Coarse state of one attempt.
///
/// `InProgress -> Grading -> Completed`, and `Completed -> InProgress` only
/// through [`QuizSession::retake`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    InProgress,
    Grading,
    Completed,
}

/// What a single countdown step did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session was not in progress; nothing changed.
    Ignored,
    /// One second was consumed and time remains.
    Counted { remaining_secs: u32 },
    /// The countdown hit zero and the attempt was submitted and graded.
    Expired,
}

/// Aggregated view of attempt progress, useful for a question sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    pub total: usize,
    pub answered: usize,
    pub flagged: usize,
    pub unanswered: Vec<QuestionId>,
    pub is_complete: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// One timed attempt at a quiz.
///
/// All mutation goes through the methods below. Each returns whether it
/// changed anything; calls outside their precondition leave state untouched.
/// Invariants: `current_index < quiz.question_count()`, the countdown never
/// increases during an attempt, and answers/flags only change while
/// `InProgress`.
#[derive(Clone)]
pub struct QuizSession {
    quiz: Arc<Quiz>,
    answers: BTreeMap<QuestionId, OptionId>,
    flagged: BTreeSet<QuestionId>,
    current_index: usize,
    time_remaining_secs: u32,
    phase: SessionPhase,
    submit_reason: Option<SubmitReason>,
    started_at: DateTime<Utc>,
    result: Option<QuizResult>,
    attempt_number: u32,
}

impl QuizSession {
    /// Begin a fresh attempt: cursor on the first question, nothing answered
    /// or flagged, full time limit on the clock.
    #[must_use]
    pub fn start(quiz: Arc<Quiz>, started_at: DateTime<Utc>) -> Self {
        Self::with_attempt_number(quiz, started_at, 1)
    }

    fn with_attempt_number(quiz: Arc<Quiz>, started_at: DateTime<Utc>, attempt_number: u32) -> Self {
        let time_remaining_secs = quiz.time_limit_secs();
        Self {
            quiz,
            answers: BTreeMap::new(),
            flagged: BTreeSet::new(),
            current_index: 0,
            time_remaining_secs,
            phase: SessionPhase::InProgress,
            submit_reason: None,
            started_at,
            result: None,
            attempt_number,
        }
    }

    // Accessors

    #[must_use]
    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    #[must_use]
    pub fn is_in_progress(&self) -> bool {
        self.phase == SessionPhase::InProgress
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Completed
    }

    #[must_use]
    pub fn answers(&self) -> &BTreeMap<QuestionId, OptionId> {
        &self.answers
    }

    #[must_use]
    pub fn answer(&self, question_id: QuestionId) -> Option<OptionId> {
        self.answers.get(&question_id).copied()
    }

    #[must_use]
    pub fn flagged(&self) -> &BTreeSet<QuestionId> {
        &self.flagged
    }

    #[must_use]
    pub fn is_flagged(&self, question_id: QuestionId) -> bool {
        self.flagged.contains(&question_id)
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current_index
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        &self.quiz.questions()[self.current_index]
    }

    #[must_use]
    pub fn question_count(&self) -> usize {
        self.quiz.question_count()
    }

    #[must_use]
    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    /// Seconds consumed so far in this attempt.
    #[must_use]
    pub fn time_used_secs(&self) -> u32 {
        self.quiz
            .time_limit_secs()
            .saturating_sub(self.time_remaining_secs)
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn submit_reason(&self) -> Option<SubmitReason> {
        self.submit_reason
    }

    /// Present once the attempt is `Completed`.
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    /// 1 for the first attempt, incremented by every retake.
    #[must_use]
    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let unanswered: Vec<QuestionId> = self
            .quiz
            .questions()
            .iter()
            .map(|q| q.id)
            .filter(|id| !self.answers.contains_key(id))
            .collect();
        SessionProgress {
            total: self.question_count(),
            answered: self.answers.len(),
            flagged: self.flagged.len(),
            unanswered,
            is_complete: self.is_complete(),
        }
    }

    // Answers and flags

    /// Record `option_id` as the answer to `question_id`, replacing any
    /// earlier choice. Ignored unless in progress, and ignored when the
    /// option does not belong to the question.
    pub fn select_answer(&mut self, question_id: QuestionId, option_id: OptionId) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        let Some(question) = self.quiz.question(question_id) else {
            return false;
        };
        if !question.has_option(option_id) {
            return false;
        }
        self.answers.insert(question_id, option_id);
        true
    }

    pub fn clear_answer(&mut self, question_id: QuestionId) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        self.answers.remove(&question_id).is_some()
    }

    /// Flags or unflags a question for review. Has no effect on grading.
    pub fn toggle_flag(&mut self, question_id: QuestionId) -> bool {
        if !self.is_in_progress() || self.quiz.question(question_id).is_none() {
            return false;
        }
        if !self.flagged.remove(&question_id) {
            self.flagged.insert(question_id);
        }
        true
    }

    // Navigation

    pub fn go_to(&mut self, index: usize) -> bool {
        if index >= self.question_count() {
            return false;
        }
        self.current_index = index;
        true
    }

    /// No wraparound: a no-op on the first question.
    pub fn previous(&mut self) -> bool {
        match self.current_index.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => false,
        }
    }

    /// No wraparound: a no-op on the last question.
    pub fn next(&mut self) -> bool {
        self.go_to(self.current_index + 1)
    }

    // Countdown and submission

    /// Consume one second of the countdown.
    ///
    /// Reaching zero submits the attempt with [`SubmitReason::TimeExpired`]
    /// and grades it before returning.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if !self.is_in_progress() {
            return TickOutcome::Ignored;
        }
        self.time_remaining_secs = self.time_remaining_secs.saturating_sub(1);
        if self.time_remaining_secs > 0 {
            return TickOutcome::Counted {
                remaining_secs: self.time_remaining_secs,
            };
        }
        self.begin_grading(SubmitReason::TimeExpired);
        self.finish_grading(now);
        TickOutcome::Expired
    }

    /// Manual submit: grade immediately.
    pub fn submit(&mut self, now: DateTime<Utc>) -> bool {
        self.begin_grading(SubmitReason::Manual) && self.finish_grading(now)
    }

    /// First half of submission: freeze answers and enter `Grading`.
    pub fn begin_grading(&mut self, reason: SubmitReason) -> bool {
        if !self.is_in_progress() {
            return false;
        }
        self.phase = SessionPhase::Grading;
        self.submit_reason = Some(reason);
        true
    }

    /// Second half of submission: compute the result and enter `Completed`.
    pub fn finish_grading(&mut self, now: DateTime<Utc>) -> bool {
        if self.phase != SessionPhase::Grading {
            return false;
        }
        let timing = AttemptTiming {
            started_at: self.started_at,
            completed_at: now.max(self.started_at),
            time_used_secs: self.time_used_secs(),
            reason: self.submit_reason.unwrap_or(SubmitReason::Manual),
        };
        self.result = Some(grading::grade(&self.quiz, &self.answers, timing));
        self.phase = SessionPhase::Completed;
        true
    }

    /// Start over on the same quiz. Only valid once completed; nothing from
    /// the previous attempt carries over.
    pub fn retake(&mut self, now: DateTime<Utc>) -> bool {
        if !self.is_complete() {
            return false;
        }
        let next_attempt = self.attempt_number.saturating_add(1);
        *self = Self::with_attempt_number(Arc::clone(&self.quiz), now, next_attempt);
        true
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("quiz_id", &self.quiz.id())
            .field("phase", &self.phase)
            .field("current_index", &self.current_index)
            .field("answers_len", &self.answers.len())
            .field("flagged_len", &self.flagged.len())
            .field("time_remaining_secs", &self.time_remaining_secs)
            .field("attempt_number", &self.attempt_number)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
