//! Shared error types for the services crate.

use std::time::Duration;

use thiserror::Error;

use quiz_core::model::{QuizId, SnapshotError};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

use crate::sessions::Lifecycle;

/// Errors emitted by hint providers.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HintError {
    #[error("hint service is not configured")]
    Disabled,
    #[error("hint service returned an empty response")]
    EmptyResponse,
    #[error("hint service request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("hint service did not answer within {0:?}")]
    Timeout(Duration),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by quiz sessions.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("quiz has no questions")]
    Empty,
    #[error("quiz {0} is not in the question bank")]
    UnknownQuiz(QuizId),
    #[error("cannot {action} while the session is {from}")]
    InvalidTransition {
        from: Lifecycle,
        action: &'static str,
    },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `QuizHistoryService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
