use std::fmt;

use quiz_core::build_result;
use quiz_core::model::{
    Answers, Notes, ProgressSnapshot, Question, QuizId, QuizResult, SessionConfig,
};

use super::progress::{QuestionStatus, SessionProgress};
use crate::error::SessionError;

//
// ─── LIFECYCLE ─────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    NotStarted,
    Running,
    Finished,
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Lifecycle::NotStarted => "not started",
            Lifecycle::Running => "running",
            Lifecycle::Finished => "finished",
        };
        f.write_str(label)
    }
}

/// Outcome of recording an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerFeedback {
    pub question_index: usize,
    pub option_index: usize,
    pub is_correct: bool,
    /// True when the answer can no longer be changed (instant-feedback mode).
    pub locked: bool,
}

/// Outcome of a single countdown tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// The session is not running; nothing was decremented.
    Idle,
    Running { time_left_secs: u32 },
    /// The clock reached zero and the session was finished by this tick.
    Expired(QuizResult),
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// In-memory state machine for one quiz attempt.
///
/// Holds no I/O: persistence and the wall clock are driven from `QuizRunner`.
/// Calls that do not apply to the current lifecycle are ignored and report
/// `None`/`false`, except `start` and `resume`, which return
/// `SessionError::InvalidTransition`.
#[derive(Debug, Clone)]
pub struct QuizSession {
    quiz_id: QuizId,
    questions: Vec<Question>,
    config: SessionConfig,
    instant_feedback: bool,
    lifecycle: Lifecycle,
    current: usize,
    answers: Answers,
    notes: Notes,
    time_left_secs: u32,
    attempt: u64,
    result: Option<QuizResult>,
}

impl QuizSession {
    /// Create a session that has not started yet.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if `questions` is empty.
    pub fn new(
        quiz_id: QuizId,
        questions: Vec<Question>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        Ok(Self {
            quiz_id,
            questions,
            instant_feedback: config.instant_feedback(),
            config,
            lifecycle: Lifecycle::NotStarted,
            current: 0,
            answers: Answers::new(),
            notes: Notes::new(),
            time_left_secs: config.duration_secs(),
            attempt: 0,
            result: None,
        })
    }

    #[must_use]
    pub fn quiz_id(&self) -> QuizId {
        self.quiz_id
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lifecycle == Lifecycle::Running
    }

    #[must_use]
    pub fn instant_feedback(&self) -> bool {
        self.instant_feedback
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.config.duration_secs()
    }

    #[must_use]
    pub fn time_left_secs(&self) -> u32 {
        self.time_left_secs
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> &Question {
        // `current` is clamped on every write and `questions` is never empty.
        &self.questions[self.current]
    }

    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    #[must_use]
    pub fn answer_for(&self, question_index: usize) -> Option<usize> {
        self.answers.get(&question_index).copied()
    }

    #[must_use]
    pub fn notes(&self) -> &Notes {
        &self.notes
    }

    #[must_use]
    pub fn note(&self, question_index: usize) -> Option<&str> {
        self.notes.get(&question_index).map(String::as_str)
    }

    #[must_use]
    pub fn has_note(&self, question_index: usize) -> bool {
        self.note(question_index)
            .is_some_and(|text| !text.trim().is_empty())
    }

    /// Counter bumped every time the session enters `Running`.
    #[must_use]
    pub fn attempt(&self) -> u64 {
        self.attempt
    }

    /// Result of the finished attempt, kept for review screens.
    #[must_use]
    pub fn result(&self) -> Option<&QuizResult> {
        self.result.as_ref()
    }

    // ─── Configuration ─────────────────────────────────────────────────────

    /// Toggle instant feedback. Only allowed before the session starts.
    pub fn set_instant_feedback(&mut self, enabled: bool) -> bool {
        if self.lifecycle != Lifecycle::NotStarted {
            return false;
        }
        self.instant_feedback = enabled;
        true
    }

    // ─── Transitions ───────────────────────────────────────────────────────

    fn ensure(&self, expected: Lifecycle, action: &'static str) -> Result<(), SessionError> {
        if self.lifecycle == expected {
            Ok(())
        } else {
            Err(SessionError::InvalidTransition {
                from: self.lifecycle,
                action,
            })
        }
    }

    /// Begin a fresh attempt with a full clock.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is `NotStarted`.
    pub fn start(&mut self) -> Result<(), SessionError> {
        self.ensure(Lifecycle::NotStarted, "start")?;
        self.current = 0;
        self.answers.clear();
        self.notes.clear();
        self.time_left_secs = self.config.duration_secs();
        self.result = None;
        self.enter_running();
        Ok(())
    }

    /// Continue from a saved snapshot, restoring it verbatim.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidTransition` unless the session is
    /// `NotStarted`, or `SessionError::Snapshot` if the snapshot does not fit
    /// this quiz. The session is unchanged on error.
    pub fn resume(&mut self, snapshot: ProgressSnapshot) -> Result<(), SessionError> {
        self.ensure(Lifecycle::NotStarted, "resume")?;
        snapshot.validate_against(&self.questions, self.config.duration_secs())?;

        self.current = snapshot.current_question_index;
        self.answers = snapshot.answers;
        self.notes = snapshot.notes;
        self.time_left_secs = snapshot.time_left_secs;
        self.result = None;
        self.enter_running();
        Ok(())
    }

    fn enter_running(&mut self) {
        self.lifecycle = Lifecycle::Running;
        self.attempt = self.attempt.wrapping_add(1);
    }

    /// Capture the state needed to resume later. `None` unless running.
    #[must_use]
    pub fn snapshot(&self) -> Option<ProgressSnapshot> {
        self.is_running().then(|| {
            ProgressSnapshot::new(
                self.answers.clone(),
                self.current,
                self.time_left_secs,
                self.notes.clone(),
            )
        })
    }

    /// Score the attempt and move to `Finished`.
    ///
    /// Returns the result only for the call that performs the transition;
    /// later calls return `None`.
    pub fn finish(&mut self) -> Option<QuizResult> {
        if !self.is_running() {
            return None;
        }
        let result = build_result(
            &self.questions,
            &self.answers,
            self.config.duration_secs(),
            self.time_left_secs,
        );
        self.lifecycle = Lifecycle::Finished;
        self.result = Some(result.clone());
        Some(result)
    }

    /// Return a finished session to `NotStarted` with empty state.
    pub fn restart(&mut self) -> bool {
        if self.lifecycle != Lifecycle::Finished {
            return false;
        }
        self.lifecycle = Lifecycle::NotStarted;
        self.current = 0;
        self.answers.clear();
        self.notes.clear();
        self.time_left_secs = self.config.duration_secs();
        self.result = None;
        true
    }

    /// Advance the clock by one second, finishing the session at zero.
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_running() {
            return TickOutcome::Idle;
        }
        self.time_left_secs = self.time_left_secs.saturating_sub(1);
        if self.time_left_secs > 0 {
            return TickOutcome::Running {
                time_left_secs: self.time_left_secs,
            };
        }
        match self.finish() {
            Some(result) => TickOutcome::Expired(result),
            None => TickOutcome::Idle,
        }
    }

    // ─── Navigation ────────────────────────────────────────────────────────

    /// Jump to `index`, clamped to the last question. Returns the new index.
    pub fn go_to(&mut self, index: usize) -> Option<usize> {
        if !self.is_running() {
            return None;
        }
        self.current = index.min(self.questions.len() - 1);
        Some(self.current)
    }

    pub fn next(&mut self) -> Option<usize> {
        self.go_to(self.current.saturating_add(1))
    }

    pub fn previous(&mut self) -> Option<usize> {
        self.go_to(self.current.saturating_sub(1))
    }

    // ─── Answers & notes ───────────────────────────────────────────────────

    /// Record an answer.
    ///
    /// Ignored unless running, for unknown questions or blank options, and
    /// for already answered questions in instant-feedback mode.
    pub fn select_answer(
        &mut self,
        question_index: usize,
        option_index: usize,
    ) -> Option<AnswerFeedback> {
        if !self.is_running() {
            return None;
        }
        let question = self.questions.get(question_index)?;
        if !question.is_selectable(option_index) {
            return None;
        }
        if self.instant_feedback && self.answers.contains_key(&question_index) {
            return None;
        }

        let is_correct = question.is_correct(option_index);
        self.answers.insert(question_index, option_index);
        Some(AnswerFeedback {
            question_index,
            option_index,
            is_correct,
            locked: self.instant_feedback,
        })
    }

    pub fn select_current(&mut self, option_index: usize) -> Option<AnswerFeedback> {
        self.select_answer(self.current, option_index)
    }

    /// Overwrite the scratch note for a question.
    pub fn set_note(&mut self, question_index: usize, text: impl Into<String>) -> bool {
        if !self.is_running() || question_index >= self.questions.len() {
            return false;
        }
        self.notes.insert(question_index, text.into());
        true
    }

    // ─── Views ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        let reveal = self.instant_feedback || self.lifecycle == Lifecycle::Finished;
        let questions = self
            .questions
            .iter()
            .enumerate()
            .map(|(idx, question)| {
                let answer = self.answer_for(idx);
                QuestionStatus {
                    answered: answer.is_some(),
                    correct: answer
                        .filter(|_| reveal)
                        .map(|chosen| question.is_correct(chosen)),
                    has_note: self.has_note(idx),
                }
            })
            .collect();

        SessionProgress {
            lifecycle: self.lifecycle,
            current_index: self.current,
            total: self.questions.len(),
            answered: self.answers.len(),
            time_left_secs: self.time_left_secs,
            questions,
        }
    }
}
