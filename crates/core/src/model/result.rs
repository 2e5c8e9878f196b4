use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Question index → selected option index.
pub type Answers = BTreeMap<usize, usize>;

/// Question index → scratch note text.
pub type Notes = BTreeMap<usize, String>;

/// Percentage at or above which a result counts as excellent.
pub const EXCELLENT_PERCENTAGE: u32 = 80;

/// Final tally of a finished quiz attempt.
///
/// The engine emits results with no timestamp; the application stamps them
/// when it records them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    score: u32,
    total: u32,
    answers: Answers,
    time_spent_secs: u32,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl QuizResult {
    #[must_use]
    pub fn new(score: u32, total: u32, answers: Answers, time_spent_secs: u32) -> Self {
        Self {
            score: score.min(total),
            total,
            answers,
            time_spent_secs,
            timestamp: None,
        }
    }

    #[must_use]
    pub fn with_timestamp(mut self, at: DateTime<Utc>) -> Self {
        self.timestamp = Some(at);
        self
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> u32 {
        self.total
    }

    #[must_use]
    pub fn answers(&self) -> &Answers {
        &self.answers
    }

    #[must_use]
    pub fn time_spent_secs(&self) -> u32 {
        self.time_spent_secs
    }

    #[must_use]
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    /// Fraction of correct answers in `[0, 1]`; zero for an empty quiz.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.score) / f64::from(self.total)
        }
    }

    /// Rounded percentage of correct answers.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn percentage(&self) -> u32 {
        (self.ratio() * 100.0).round() as u32
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.score == self.total
    }

    /// Compares the exact ratio, so 79.6 % is not excellent even though it rounds to 80.
    #[must_use]
    pub fn is_excellent(&self) -> bool {
        let percent = u64::from(EXCELLENT_PERCENTAGE);
        self.total > 0 && u64::from(self.score) * 100 >= u64::from(self.total) * percent
    }
}
