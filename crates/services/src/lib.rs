#![forbid(unsafe_code)]

pub mod error;
pub mod tutor_service;

pub use tutor_core::Clock;

pub use error::TutorError;
pub use tutor_service::{LessonStatus, TutorService};
