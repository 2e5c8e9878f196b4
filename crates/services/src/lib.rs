#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod hint_service;
pub mod history_service;
pub mod sessions;

pub use quiz_core::Clock;

pub use app_services::AppServices;
pub use error::{AppServicesError, HintError, HistoryError, SessionError};
pub use hint_service::{DEFAULT_HINT_TIMEOUT, HintConfig, HintProvider, HintService};
pub use history_service::{
    HistoryEntry, HistoryQuery, HistorySort, HistoryStats, Mistake, ParseHistorySortError,
    QuizHistoryService,
};

pub use sessions::{
    AnswerFeedback, Completion, HintOutcome, HintState, Lifecycle, QuizLoopService, QuizRunner,
    QuizSession, SessionProgress,
};
