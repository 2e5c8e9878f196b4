use std::sync::Arc;
use std::time::Duration;

use quiz_core::model::{Question, QuestionBank, QuizId, SessionConfig};
use storage::repository::ProgressRepository;

use super::runner::QuizRunner;
use super::service::QuizSession;
use crate::error::SessionError;
use crate::hint_service::{DEFAULT_HINT_TIMEOUT, HintProvider};

/// Opens quiz runners wired to the shared progress store and hint provider.
#[derive(Clone)]
pub struct QuizLoopService {
    progress: Arc<dyn ProgressRepository>,
    hints: Arc<dyn HintProvider>,
    config: SessionConfig,
    hint_timeout: Duration,
    tick_period: Duration,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>, hints: Arc<dyn HintProvider>) -> Self {
        Self {
            progress,
            hints,
            config: SessionConfig::default(),
            hint_timeout: DEFAULT_HINT_TIMEOUT,
            tick_period: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn with_hint_timeout(mut self, timeout: Duration) -> Self {
        self.hint_timeout = timeout;
        self
    }

    /// Wall-clock length of one countdown second.
    #[must_use]
    pub fn with_tick_period(mut self, period: Duration) -> Self {
        self.tick_period = period;
        self
    }

    #[must_use]
    pub fn config(&self) -> SessionConfig {
        self.config
    }

    /// Build a runner for the given questions. Nothing starts until
    /// `start` or `resume` is called on it.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `questions` is empty.
    pub fn open(&self, quiz_id: QuizId, questions: Vec<Question>) -> Result<QuizRunner, SessionError> {
        let session = QuizSession::new(quiz_id, questions, self.config)?;
        Ok(QuizRunner::new(
            session,
            Arc::clone(&self.progress),
            Arc::clone(&self.hints),
            self.hint_timeout,
            self.tick_period,
        ))
    }

    /// Build a runner for a quiz from the bank.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::UnknownQuiz` if the bank has no such quiz.
    pub fn open_from_bank(
        &self,
        bank: &QuestionBank,
        quiz_id: QuizId,
    ) -> Result<QuizRunner, SessionError> {
        let questions = bank
            .questions(quiz_id)
            .ok_or(SessionError::UnknownQuiz(quiz_id))?;
        self.open(quiz_id, questions.to_vec())
    }
}
