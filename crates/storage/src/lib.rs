#![forbid(unsafe_code)]

pub mod json;
pub mod records;
pub mod repository;

pub use records::{OptionRecord, QuestionRecord, QuizRecord};
pub use repository::{
    AttemptRecord, AttemptRepository, InMemoryRepository, NewAttemptRecord, QuizRepository,
    Storage, StorageError,
};
