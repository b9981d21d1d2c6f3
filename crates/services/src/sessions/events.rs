use quiz_core::{QuizResult, SubmitReason};
use tokio::sync::mpsc;

/// Notifications pushed by a live session to whoever renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// One second elapsed and time remains.
    Tick { remaining_secs: u32 },
    /// Answers are frozen; the result is being computed.
    GradingStarted { reason: SubmitReason },
    /// The attempt finished, manually or because time ran out. The reason is
    /// `result.reason`.
    Completed {
        attempt_number: u32,
        result: QuizResult,
    },
    /// A retake began with a full countdown.
    Restarted { attempt_number: u32 },
}

/// Receiving end of a session's event stream.
pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;
