mod events;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use events::{SessionEvent, SessionEvents};
pub use service::{SessionService, SessionSettings};
pub use workflow::{Learner, SessionLoopService};
