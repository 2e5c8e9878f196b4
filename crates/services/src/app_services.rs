use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::SessionConfig;
use storage::repository::Storage;

use crate::error::AppServicesError;
use crate::hint_service::{HintProvider, HintService};
use crate::history_service::QuizHistoryService;
use crate::sessions::QuizLoopService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    quiz_loop: Arc<QuizLoopService>,
    history: Arc<QuizHistoryService>,
    hints: Arc<HintService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, with hints configured from the environment.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        config: SessionConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(storage, clock, config, HintService::from_env()))
    }

    /// Build services over in-memory storage with hints disabled.
    #[must_use]
    pub fn in_memory(clock: Clock, config: SessionConfig) -> Self {
        Self::from_storage(Storage::in_memory(), clock, config, HintService::disabled())
    }

    fn from_storage(
        storage: Storage,
        clock: Clock,
        config: SessionConfig,
        hints: HintService,
    ) -> Self {
        let hints = Arc::new(hints);
        let provider: Arc<dyn HintProvider> = hints.clone();
        let quiz_loop = QuizLoopService::new(Arc::clone(&storage.progress), provider)
            .with_config(config)
            .with_hint_timeout(hints.timeout());
        let history = QuizHistoryService::new(clock, Arc::clone(&storage.history));

        Self {
            quiz_loop: Arc::new(quiz_loop),
            history: Arc::new(history),
            hints,
        }
    }

    #[must_use]
    pub fn quiz_loop(&self) -> Arc<QuizLoopService> {
        Arc::clone(&self.quiz_loop)
    }

    #[must_use]
    pub fn history(&self) -> Arc<QuizHistoryService> {
        Arc::clone(&self.history)
    }

    #[must_use]
    pub fn hints(&self) -> Arc<HintService> {
        Arc::clone(&self.hints)
    }
}
