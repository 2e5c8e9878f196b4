mod progress;
mod runner;
mod service;
mod timer;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use progress::{QuestionStatus, SessionProgress};
pub use runner::{Completion, HintOutcome, HintState, QuizRunner};
pub use service::{AnswerFeedback, Lifecycle, QuizSession, TickOutcome};
pub use timer::Countdown;
pub use workflow::QuizLoopService;
