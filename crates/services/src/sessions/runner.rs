use std::collections::HashMap;
use std::future::Future;
use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use quiz_core::model::{Question, QuizId, QuizResult};
use storage::repository::{ProgressRepository, StorageError};

use super::progress::SessionProgress;
use super::service::{AnswerFeedback, Lifecycle, QuizSession, TickOutcome};
use super::timer::Countdown;
use crate::error::{HintError, SessionError};
use crate::hint_service::HintProvider;

//
// ─── HINTS ─────────────────────────────────────────────────────────────────────
//

/// Per-question hint slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum HintState {
    #[default]
    Idle,
    Loading,
    Ready(String),
    Failed(String),
}

/// What a single `request_hint` call ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HintOutcome {
    /// Not running, or a hint for this question is already loading or ready.
    Skipped,
    Ready(String),
    Failed(String),
    /// The user moved on before the answer arrived.
    Discarded,
}

//
// ─── COMPLETION ────────────────────────────────────────────────────────────────
//

/// Resolves with the result once the attempt finishes.
///
/// Resolves to `None` if the attempt ends without a result, for example after
/// a save-and-exit or when the runner is dropped.
#[derive(Debug)]
pub struct Completion {
    rx: oneshot::Receiver<QuizResult>,
}

impl Future for Completion {
    type Output = Option<QuizResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(Result::ok)
    }
}

//
// ─── RUNNER ────────────────────────────────────────────────────────────────────
//

struct RunnerState {
    session: QuizSession,
    hints: HashMap<usize, HintState>,
    completion: Option<oneshot::Sender<QuizResult>>,
    countdown: Countdown,
}

struct Inner {
    state: Mutex<RunnerState>,
    progress: Arc<dyn ProgressRepository>,
    provider: Arc<dyn HintProvider>,
    hint_timeout: Duration,
    tick_period: Duration,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fresh completion channel and countdown for a new attempt.
    fn arm(self: &Arc<Self>, state: &mut RunnerState) -> Completion {
        let (tx, rx) = oneshot::channel();
        state.completion = Some(tx);
        state.hints.clear();

        let weak = Arc::downgrade(self);
        state.countdown = Countdown::spawn(self.tick_period, move || match weak.upgrade() {
            Some(inner) => inner.on_tick(),
            None => ControlFlow::Break(()),
        });
        Completion { rx }
    }

    fn on_tick(self: &Arc<Self>) -> ControlFlow<()> {
        let mut state = self.lock();
        match state.session.tick() {
            TickOutcome::Running { .. } => ControlFlow::Continue(()),
            TickOutcome::Idle => ControlFlow::Break(()),
            TickOutcome::Expired(result) => {
                state.countdown.detach();
                state.hints.clear();
                let quiz_id = state.session.quiz_id();
                let completion = state.completion.take();
                drop(state);

                info!(
                    quiz_id = %quiz_id,
                    score = result.score(),
                    total = result.total(),
                    "time is up, quiz submitted"
                );
                let inner = Arc::clone(self);
                tokio::spawn(async move {
                    inner.finalize(quiz_id, result, completion).await;
                });
                ControlFlow::Break(())
            }
        }
    }

    async fn finalize(
        &self,
        quiz_id: QuizId,
        result: QuizResult,
        completion: Option<oneshot::Sender<QuizResult>>,
    ) {
        if let Err(err) = self.progress.remove_progress(quiz_id).await {
            warn!(quiz_id = %quiz_id, error = %err, "failed to remove saved progress");
        }
        let Some(tx) = completion else {
            return;
        };
        if tx.send(result).is_err() {
            debug!(quiz_id = %quiz_id, "completion receiver already dropped");
        }
    }
}

/// Async driver around a [`QuizSession`]: owns the countdown, talks to the
/// progress store and the hint provider, and emits the result.
///
/// Cloning shares the same session. The countdown stops when the last clone
/// is dropped.
#[derive(Clone)]
pub struct QuizRunner {
    inner: Arc<Inner>,
}

impl QuizRunner {
    pub(crate) fn new(
        session: QuizSession,
        progress: Arc<dyn ProgressRepository>,
        provider: Arc<dyn HintProvider>,
        hint_timeout: Duration,
        tick_period: Duration,
    ) -> Self {
        let state = RunnerState {
            session,
            hints: HashMap::new(),
            completion: None,
            countdown: Countdown::default(),
        };
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                progress,
                provider,
                hint_timeout,
                tick_period,
            }),
        }
    }

    fn ensure_not_started(&self, action: &'static str) -> Result<QuizId, SessionError> {
        let state = self.inner.lock();
        let from = state.session.lifecycle();
        if from != Lifecycle::NotStarted {
            return Err(SessionError::InvalidTransition { from, action });
        }
        Ok(state.session.quiz_id())
    }

    // ─── Lifecycle ─────────────────────────────────────────────────────────

    /// Start a fresh attempt, discarding any saved progress for this quiz.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless not started, or
    /// `SessionError::Storage` if stale progress cannot be removed.
    pub async fn start(&self) -> Result<Completion, SessionError> {
        let quiz_id = self.ensure_not_started("start")?;
        self.inner.progress.remove_progress(quiz_id).await?;

        let mut state = self.inner.lock();
        state.session.start()?;
        info!(
            quiz_id = %quiz_id,
            questions = state.session.questions().len(),
            duration_secs = state.session.duration_secs(),
            instant_feedback = state.session.instant_feedback(),
            "quiz started"
        );
        Ok(Inner::arm(&self.inner, &mut state))
    }

    /// Continue from saved progress.
    ///
    /// Returns `Ok(None)` when there is nothing usable to resume. Undecodable
    /// snapshots are removed.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless not started, or
    /// `SessionError::Storage` if the store itself fails.
    pub async fn resume(&self) -> Result<Option<Completion>, SessionError> {
        let quiz_id = self.ensure_not_started("resume")?;
        let snapshot = match self.inner.progress.load_progress(quiz_id).await {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return Ok(None),
            Err(StorageError::Serialization(reason)) => {
                warn!(quiz_id = %quiz_id, %reason, "discarding undecodable saved progress");
                if let Err(err) = self.inner.progress.remove_progress(quiz_id).await {
                    warn!(quiz_id = %quiz_id, error = %err, "failed to remove saved progress");
                }
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };

        let mut state = self.inner.lock();
        match state.session.resume(snapshot) {
            Ok(()) => {}
            Err(SessionError::Snapshot(err)) => {
                warn!(quiz_id = %quiz_id, error = %err, "saved progress does not fit this quiz");
                return Ok(None);
            }
            Err(err) => return Err(err),
        }
        info!(
            quiz_id = %quiz_id,
            current_index = state.session.current_index(),
            time_left_secs = state.session.time_left_secs(),
            answered = state.session.answers().len(),
            "quiz resumed"
        );
        Ok(Some(Inner::arm(&self.inner, &mut state)))
    }

    /// True if a snapshot that fits this quiz is stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage` for store failures other than a corrupt payload.
    pub async fn has_saved_progress(&self) -> Result<bool, SessionError> {
        let (quiz_id, duration) = {
            let state = self.inner.lock();
            (state.session.quiz_id(), state.session.duration_secs())
        };
        let snapshot = match self.inner.progress.load_progress(quiz_id).await {
            Ok(snapshot) => snapshot,
            Err(StorageError::Serialization(_)) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        let state = self.inner.lock();
        Ok(snapshot.is_some_and(|s| {
            s.validate_against(state.session.questions(), duration)
                .is_ok()
        }))
    }

    /// Persist progress and stop the clock. The session stays `Running`.
    ///
    /// If the attempt ends while the snapshot is being written, the snapshot
    /// is removed again and the call fails with the new lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless running, or
    /// `SessionError::Storage` if the save fails, in which case the clock
    /// keeps running.
    pub async fn save_and_exit(&self) -> Result<(), SessionError> {
        let (quiz_id, attempt, snapshot) = {
            let state = self.inner.lock();
            match state.session.snapshot() {
                Some(snapshot) => (state.session.quiz_id(), state.session.attempt(), snapshot),
                None => {
                    return Err(SessionError::InvalidTransition {
                        from: state.session.lifecycle(),
                        action: "save",
                    });
                }
            }
        };
        self.inner.progress.save_progress(quiz_id, &snapshot).await?;

        let mut state = self.inner.lock();
        if !state.session.is_running() || state.session.attempt() != attempt {
            let from = state.session.lifecycle();
            drop(state);
            warn!(quiz_id = %quiz_id, lifecycle = %from, "attempt ended while saving, dropping snapshot");
            self.inner.progress.remove_progress(quiz_id).await?;
            return Err(SessionError::InvalidTransition { from, action: "save" });
        }
        state.countdown.cancel();
        state.completion = None;
        state.hints.clear();
        info!(
            quiz_id = %quiz_id,
            current_index = snapshot.current_question_index,
            time_left_secs = snapshot.time_left_secs,
            "quiz progress saved"
        );
        Ok(())
    }

    /// Submit the attempt. Only the first caller gets the result.
    pub async fn finish(&self) -> Option<QuizResult> {
        let (quiz_id, result, completion) = {
            let mut state = self.inner.lock();
            let result = state.session.finish()?;
            state.countdown.cancel();
            state.hints.clear();
            (state.session.quiz_id(), result, state.completion.take())
        };
        info!(
            quiz_id = %quiz_id,
            score = result.score(),
            total = result.total(),
            time_spent_secs = result.time_spent_secs(),
            "quiz finished"
        );
        self.inner
            .finalize(quiz_id, result.clone(), completion)
            .await;
        Some(result)
    }

    /// Back to `NotStarted` after a finished attempt.
    pub fn restart(&self) -> bool {
        let mut state = self.inner.lock();
        let restarted = state.session.restart();
        if restarted {
            state.hints.clear();
            debug!(quiz_id = %state.session.quiz_id(), "quiz reset");
        }
        restarted
    }

    pub fn set_instant_feedback(&self, enabled: bool) -> bool {
        self.inner.lock().session.set_instant_feedback(enabled)
    }

    // ─── Interaction ───────────────────────────────────────────────────────

    pub fn go_to(&self, index: usize) -> Option<usize> {
        self.inner.lock().session.go_to(index)
    }

    pub fn next(&self) -> Option<usize> {
        self.inner.lock().session.next()
    }

    pub fn previous(&self) -> Option<usize> {
        self.inner.lock().session.previous()
    }

    pub fn select_answer(&self, question_index: usize, option_index: usize) -> Option<AnswerFeedback> {
        self.inner
            .lock()
            .session
            .select_answer(question_index, option_index)
    }

    pub fn select_current(&self, option_index: usize) -> Option<AnswerFeedback> {
        self.inner.lock().session.select_current(option_index)
    }

    pub fn set_note(&self, question_index: usize, text: impl Into<String>) -> bool {
        self.inner.lock().session.set_note(question_index, text)
    }

    /// Ask the hint provider about the current question.
    ///
    /// The session lock is released while waiting. The answer is dropped if
    /// the user navigated away, the attempt ended, or a new one began.
    pub async fn request_hint(&self) -> HintOutcome {
        let (index, attempt, text, options) = {
            let mut state = self.inner.lock();
            if !state.session.is_running() {
                return HintOutcome::Skipped;
            }
            let index = state.session.current_index();
            if matches!(
                state.hints.get(&index),
                Some(HintState::Loading | HintState::Ready(_))
            ) {
                return HintOutcome::Skipped;
            }
            state.hints.insert(index, HintState::Loading);

            let question = state.session.current_question();
            let options: Vec<String> = question
                .visible_options()
                .map(|(_, text)| text.to_owned())
                .collect();
            (
                index,
                state.session.attempt(),
                question.text().to_owned(),
                options,
            )
        };
        debug!(question_index = index, "requesting hint");

        let timeout = self.inner.hint_timeout;
        let answer =
            match tokio::time::timeout(timeout, self.inner.provider.ask_hint(&text, &options)).await
            {
                Ok(answer) => answer,
                Err(_) => Err(HintError::Timeout(timeout)),
            };

        let mut state = self.inner.lock();
        let stale = !state.session.is_running()
            || state.session.attempt() != attempt
            || state.session.current_index() != index;
        if stale {
            if state.session.attempt() == attempt {
                state.hints.remove(&index);
            }
            debug!(question_index = index, "discarding hint for a question no longer shown");
            return HintOutcome::Discarded;
        }

        match answer {
            Ok(hint) => {
                state.hints.insert(index, HintState::Ready(hint.clone()));
                HintOutcome::Ready(hint)
            }
            Err(err) => {
                let message = err.to_string();
                warn!(question_index = index, error = %message, "hint request failed");
                state.hints.insert(index, HintState::Failed(message.clone()));
                HintOutcome::Failed(message)
            }
        }
    }

    // ─── Views ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn hint_state(&self, question_index: usize) -> HintState {
        self.inner
            .lock()
            .hints
            .get(&question_index)
            .cloned()
            .unwrap_or_default()
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.inner.lock().session.quiz_id()
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.inner.lock().session.lifecycle()
    }

    #[must_use]
    pub fn time_left_secs(&self) -> u32 {
        self.inner.lock().session.time_left_secs()
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.inner.lock().session.current_index()
    }

    #[must_use]
    pub fn current_question(&self) -> Question {
        self.inner.lock().session.current_question().clone()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        self.inner.lock().session.progress()
    }

    /// True while the countdown task is alive.
    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.inner.lock().countdown.is_active()
    }

    /// Run `f` against the session state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&QuizSession) -> R) -> R {
        f(&self.inner.lock().session)
    }
}
