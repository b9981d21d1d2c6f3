use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use quiz_core::model::{AttemptId, OptionId, QuestionId, Quiz, QuizId, UserId};
use quiz_core::{
    Clock, QuizResult, QuizSession, SessionPhase, SessionSnapshot, SubmitReason, TickOutcome,
};

use super::events::{SessionEvent, SessionEvents};
use super::workflow::Learner;
use crate::error::SessionError;
use crate::timer::{SessionTimer, TickControl};

/// Timing knobs for live sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Real time per countdown second. One second outside of tests.
    pub tick_period: Duration,
    /// Pause spent in `Grading` on manual submit.
    pub grading_delay: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(1),
            grading_delay: Duration::ZERO,
        }
    }
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// A live attempt: the engine, its countdown task and its event stream.
///
/// The countdown runs only while the attempt is in progress. It is disposed
/// on manual submit, stops itself on expiry, and is aborted when this value
/// is dropped. Grading of a manual submit runs on its own task and always
/// reaches `Completed`, even if the `submit` future is dropped.
pub struct SessionService {
    quiz_id: QuizId,
    session: Arc<Mutex<QuizSession>>,
    timer: Option<SessionTimer>,
    clock: Clock,
    learner: Learner,
    settings: SessionSettings,
    events: mpsc::UnboundedSender<SessionEvent>,
    /// Stored attempt ids keyed by attempt number.
    recorded: BTreeMap<u32, AttemptId>,
}

impl SessionService {
    /// Start an attempt and its countdown.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn start(
        quiz: Arc<Quiz>,
        learner: Learner,
        clock: Clock,
        settings: SessionSettings,
    ) -> (Self, SessionEvents) {
        let (events, receiver) = mpsc::unbounded_channel();
        let quiz_id = quiz.id();
        let session = Arc::new(Mutex::new(QuizSession::start(quiz, clock.now())));
        let mut service = Self {
            quiz_id,
            session,
            timer: None,
            clock,
            learner,
            settings,
            events,
            recorded: BTreeMap::new(),
        };
        service.restart_countdown(1);
        (service, receiver)
    }

    fn lock(&self) -> Result<MutexGuard<'_, QuizSession>, SessionError> {
        self.session.lock().map_err(|_| SessionError::LockPoisoned)
    }

    fn emit(&self, event: SessionEvent) {
        // A dropped receiver only means nobody is rendering.
        let _ = self.events.send(event);
    }

    fn restart_countdown(&mut self, attempt_number: u32) {
        if let Some(mut old) = self.timer.take() {
            old.dispose();
        }
        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let clock = self.clock;
        self.timer = Some(SessionTimer::start(self.settings.tick_period, move || {
            countdown_step(&session, &events, clock, attempt_number)
        }));
    }

    fn stop_countdown(&mut self) {
        if let Some(mut timer) = self.timer.take() {
            timer.dispose();
        }
    }

    // Read side

    #[must_use]
    pub fn learner(&self) -> &Learner {
        &self.learner
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    /// Id under which the given attempt was stored, if it was.
    #[must_use]
    pub fn recorded_attempt(&self, attempt_number: u32) -> Option<AttemptId> {
        self.recorded.get(&attempt_number).copied()
    }

    pub(crate) fn mark_recorded(&mut self, attempt_number: u32, id: AttemptId) {
        self.recorded.insert(attempt_number, id);
    }

    /// True while a countdown task is scheduled.
    #[must_use]
    pub fn timer_active(&self) -> bool {
        self.timer.as_ref().is_some_and(SessionTimer::is_active)
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn snapshot(&self) -> Result<SessionSnapshot, SessionError> {
        let session = self.lock()?;
        Ok(SessionSnapshot::capture(&session))
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn phase(&self) -> Result<SessionPhase, SessionError> {
        Ok(self.lock()?.phase())
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn time_remaining_secs(&self) -> Result<u32, SessionError> {
        Ok(self.lock()?.time_remaining_secs())
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn result(&self) -> Result<Option<QuizResult>, SessionError> {
        Ok(self.lock()?.result().cloned())
    }

    /// Run a read-only closure against the engine state.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn inspect<R>(&self, f: impl FnOnce(&QuizSession) -> R) -> Result<R, SessionError> {
        let session = self.lock()?;
        Ok(f(&*session))
    }

    // Write side. Each returns whether the engine accepted the call.

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn select_answer(
        &self,
        question_id: QuestionId,
        option_id: OptionId,
    ) -> Result<bool, SessionError> {
        let applied = self.lock()?.select_answer(question_id, option_id);
        if !applied {
            debug!(%question_id, %option_id, "select_answer ignored");
        }
        Ok(applied)
    }

    /// Select an option of the current question by its display label (`A`, `b`, ...).
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn select_by_label(&self, label: &str) -> Result<bool, SessionError> {
        let mut session = self.lock()?;
        let view = quiz_core::QuestionView::current(&session);
        let Some(option) = view.option_by_label(label) else {
            debug!(label, "no option with this label");
            return Ok(false);
        };
        Ok(session.select_answer(view.question_id, option.id))
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn clear_current_answer(&self) -> Result<bool, SessionError> {
        let mut session = self.lock()?;
        let question_id = session.current_question().id;
        Ok(session.clear_answer(question_id))
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn toggle_flag(&self, question_id: QuestionId) -> Result<bool, SessionError> {
        let applied = self.lock()?.toggle_flag(question_id);
        if !applied {
            debug!(%question_id, "toggle_flag ignored");
        }
        Ok(applied)
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn toggle_current_flag(&self) -> Result<bool, SessionError> {
        let mut session = self.lock()?;
        let question_id = session.current_question().id;
        Ok(session.toggle_flag(question_id))
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn go_to(&self, index: usize) -> Result<bool, SessionError> {
        let applied = self.lock()?.go_to(index);
        if !applied {
            debug!(index, "go_to out of range");
        }
        Ok(applied)
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn previous(&self) -> Result<bool, SessionError> {
        Ok(self.lock()?.previous())
    }

    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn next(&self) -> Result<bool, SessionError> {
        Ok(self.lock()?.next())
    }

    /// Manual submit. Stops the countdown, spends the configured grading
    /// delay in `Grading`, then grades.
    ///
    /// Grading runs on a spawned task. Dropping this future early does not
    /// stop it; the attempt still completes and `Completed` is still emitted.
    ///
    /// Returns `false` when the attempt was no longer in progress.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked and
    /// `SessionError::GradingAborted` if the grading task died.
    pub async fn submit(&mut self) -> Result<bool, SessionError> {
        if !self.lock()?.begin_grading(SubmitReason::Manual) {
            debug!("submit ignored, attempt not in progress");
            return Ok(false);
        }
        self.stop_countdown();
        self.emit(SessionEvent::GradingStarted {
            reason: SubmitReason::Manual,
        });

        let session = Arc::clone(&self.session);
        let events = self.events.clone();
        let clock = self.clock;
        let delay = self.settings.grading_delay;
        let user_id = self.learner.id;
        let grading = tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            grading_step(&session, &events, clock, user_id);
        });
        grading.await.map_err(|_| SessionError::GradingAborted)?;
        Ok(true)
    }

    /// Start a new attempt on the same quiz with a fresh countdown.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LockPoisoned` if a countdown step panicked.
    pub fn retake(&mut self) -> Result<bool, SessionError> {
        let attempt_number = {
            let mut session = self.lock()?;
            if !session.retake(self.clock.now()) {
                debug!(phase = ?session.phase(), "retake ignored");
                return Ok(false);
            }
            session.attempt_number()
        };
        self.restart_countdown(attempt_number);
        info!(attempt_number, "retake started");
        self.emit(SessionEvent::Restarted { attempt_number });
        Ok(true)
    }

    /// Tear the session down: cancel the countdown. The engine state stays
    /// readable but nothing will mutate it on its own anymore.
    pub fn dispose(&mut self) {
        self.stop_countdown();
    }
}

/// Second half of a manual submit, run on the grading task.
fn grading_step(
    session: &Mutex<QuizSession>,
    events: &mpsc::UnboundedSender<SessionEvent>,
    clock: Clock,
    user_id: UserId,
) {
    let Ok(mut session) = session.lock() else {
        return;
    };
    if !session.finish_grading(clock.now()) {
        return;
    }
    let Some(result) = session.result().cloned() else {
        return;
    };
    info!(
        %user_id,
        correct = result.correct_count,
        total = result.total_questions,
        percentage = result.percentage,
        passed = result.passed,
        "attempt submitted"
    );
    let _ = events.send(SessionEvent::Completed {
        attempt_number: session.attempt_number(),
        result,
    });
}

/// One countdown second, run on the timer task.
fn countdown_step(
    session: &Mutex<QuizSession>,
    events: &mpsc::UnboundedSender<SessionEvent>,
    clock: Clock,
    attempt_number: u32,
) -> TickControl {
    let Ok(mut session) = session.lock() else {
        return TickControl::Stop;
    };
    if session.attempt_number() != attempt_number {
        return TickControl::Stop;
    }

    match session.tick(clock.now()) {
        TickOutcome::Ignored => TickControl::Stop,
        TickOutcome::Counted { remaining_secs } => {
            let _ = events.send(SessionEvent::Tick { remaining_secs });
            TickControl::Continue
        }
        TickOutcome::Expired => {
            info!(quiz_id = %session.quiz().id(), "time expired, attempt auto-submitted");
            let _ = events.send(SessionEvent::GradingStarted {
                reason: SubmitReason::TimeExpired,
            });
            if let Some(result) = session.result().cloned() {
                let _ = events.send(SessionEvent::Completed {
                    attempt_number,
                    result,
                });
            }
            TickControl::Stop
        }
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("learner", &self.learner)
            .field("timer", &self.timer)
            .field("settings", &self.settings)
            .field("quiz_id", &self.quiz_id)
            .field("recorded", &self.recorded)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
