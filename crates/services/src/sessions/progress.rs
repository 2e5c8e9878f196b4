use super::service::Lifecycle;

/// Per-question flags for the question navigator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuestionStatus {
    pub answered: bool,
    /// Only revealed in instant-feedback mode or once the session is finished.
    pub correct: Option<bool>,
    pub has_note: bool,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionProgress {
    pub lifecycle: Lifecycle,
    pub current_index: usize,
    pub total: usize,
    pub answered: usize,
    pub time_left_secs: u32,
    pub questions: Vec<QuestionStatus>,
}

impl SessionProgress {
    #[must_use]
    pub fn unanswered(&self) -> usize {
        self.total.saturating_sub(self.answered)
    }

    #[must_use]
    pub fn is_last_question(&self) -> bool {
        self.current_index + 1 >= self.total
    }

    /// Position of the current question as a rounded percentage.
    #[must_use]
    pub fn position_percent(&self) -> usize {
        if self.total == 0 {
            return 0;
        }
        ((self.current_index + 1) * 100 + self.total / 2) / self.total
    }
}
