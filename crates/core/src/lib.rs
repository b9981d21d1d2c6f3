#![forbid(unsafe_code)]

pub mod grading;
pub mod model;
pub mod session;
pub mod time;
pub mod view;

pub use grading::{QuestionOutcome, QuizResult, SubmitReason};
pub use session::{QuizSession, SessionPhase, SessionProgress, TickOutcome};
pub use time::Clock;
pub use view::{OptionView, QuestionView, SessionSnapshot};
