use async_trait::async_trait;
use quiz_core::model::{ProgressSnapshot, QuizId, QuizResult};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Latest recorded result for a quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord {
    pub quiz_id: QuizId,
    pub result: QuizResult,
}

/// Saved mid-session progress, one snapshot per quiz.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Load the saved snapshot for a quiz, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if a stored snapshot cannot be
    /// decoded, or other storage errors.
    async fn load_progress(&self, quiz_id: QuizId) -> Result<Option<ProgressSnapshot>, StorageError>;

    /// Store or replace the snapshot for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the snapshot cannot be stored.
    async fn save_progress(
        &self,
        quiz_id: QuizId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError>;

    /// Delete the snapshot for a quiz. Removing a missing snapshot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the delete fails.
    async fn remove_progress(&self, quiz_id: QuizId) -> Result<(), StorageError>;
}

/// Completed results, keeping the latest attempt per quiz.
#[async_trait]
pub trait QuizHistoryRepository: Send + Sync {
    /// Insert or replace the result for a quiz.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the result cannot be stored.
    async fn upsert_result(&self, quiz_id: QuizId, result: &QuizResult) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn get_result(&self, quiz_id: QuizId) -> Result<Option<QuizResult>, StorageError>;

    /// All recorded results ordered by quiz id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on read or decode failures.
    async fn list_results(&self) -> Result<Vec<HistoryRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Snapshots are kept in their encoded JSON form so corrupt payloads behave
/// the same way they do in persistent backends.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    progress: Arc<Mutex<HashMap<QuizId, String>>>,
    results: Arc<Mutex<BTreeMap<QuizId, QuizResult>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a raw progress payload as-is, bypassing encoding.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the lock is poisoned.
    pub fn insert_raw_progress(
        &self,
        quiz_id: QuizId,
        payload: impl Into<String>,
    ) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(quiz_id, payload.into());
        Ok(())
    }

    /// True if a progress payload (valid or not) is stored for `quiz_id`.
    #[must_use]
    pub fn has_raw_progress(&self, quiz_id: QuizId) -> bool {
        self.progress
            .lock()
            .map(|guard| guard.contains_key(&quiz_id))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn load_progress(&self, quiz_id: QuizId) -> Result<Option<ProgressSnapshot>, StorageError> {
        let guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard
            .get(&quiz_id)
            .map(|raw| {
                ProgressSnapshot::from_json(raw)
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .transpose()
    }

    async fn save_progress(
        &self,
        quiz_id: QuizId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        let payload = snapshot
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.insert_raw_progress(quiz_id, payload)
    }

    async fn remove_progress(&self, quiz_id: QuizId) -> Result<(), StorageError> {
        let mut guard = self
            .progress
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(&quiz_id);
        Ok(())
    }
}

#[async_trait]
impl QuizHistoryRepository for InMemoryRepository {
    async fn upsert_result(&self, quiz_id: QuizId, result: &QuizResult) -> Result<(), StorageError> {
        let mut guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(quiz_id, result.clone());
        Ok(())
    }

    async fn get_result(&self, quiz_id: QuizId) -> Result<Option<QuizResult>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&quiz_id).cloned())
    }

    async fn list_results(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let guard = self
            .results
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard
            .iter()
            .map(|(quiz_id, result)| HistoryRecord {
                quiz_id: *quiz_id,
                result: result.clone(),
            })
            .collect())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
    pub history: Arc<dyn QuizHistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let history: Arc<dyn QuizHistoryRepository> = Arc::new(repo);
        Self { progress, history }
    }
}
