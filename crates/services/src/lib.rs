#![forbid(unsafe_code)]

pub mod error;
pub mod sessions;
pub mod timer;

pub use quiz_core::Clock;
pub use sessions as session;

pub use error::SessionError;
pub use timer::{SessionTimer, TickControl};

pub use sessions::{
    Learner, SessionEvent, SessionEvents, SessionLoopService, SessionService, SessionSettings,
};
