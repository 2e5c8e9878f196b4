use std::cmp::Reverse;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::info;

use quiz_core::Clock;
use quiz_core::model::league::{League, points_to_next, total_points};
use quiz_core::model::{Question, QuestionBank, QuizId, QuizResult};
use storage::repository::{HistoryRecord, InMemoryRepository, QuizHistoryRepository};

use crate::error::HistoryError;

/// Ordering for history listings. Score ordering uses the percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HistorySort {
    #[default]
    DateDesc,
    DateAsc,
    ScoreDesc,
    ScoreAsc,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown sort order `{0}` (expected date-desc, date-asc, score-desc or score-asc)")]
pub struct ParseHistorySortError(String);

impl FromStr for HistorySort {
    type Err = ParseHistorySortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "date-desc" | "newest" => Ok(Self::DateDesc),
            "date-asc" | "oldest" => Ok(Self::DateAsc),
            "score-desc" | "highest" => Ok(Self::ScoreDesc),
            "score-asc" | "lowest" => Ok(Self::ScoreAsc),
            _ => Err(ParseHistorySortError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryQuery {
    /// Case-insensitive match against the quiz title or id.
    pub search: Option<String>,
    pub sort: HistorySort,
}

/// One recorded quiz, ready for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub quiz_id: QuizId,
    pub title: String,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    pub time_spent_secs: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Totals across the latest result of every quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryStats {
    pub total_tests: usize,
    pub average_percentage: u32,
    pub total_points: u32,
    pub league: League,
    pub points_to_next: Option<u32>,
}

/// A recorded answer that did not match the correct option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mistake {
    pub quiz_id: QuizId,
    pub quiz_title: String,
    pub question_index: usize,
    pub question: Question,
    pub chosen_index: usize,
}

impl Mistake {
    #[must_use]
    pub fn chosen_text(&self) -> &str {
        self.question
            .options()
            .get(self.chosen_index)
            .map_or("", String::as_str)
    }

    #[must_use]
    pub fn correct_text(&self) -> &str {
        self.question
            .options()
            .get(self.question.correct_answer_index())
            .map_or("", String::as_str)
    }
}

fn fallback_title(quiz_id: QuizId) -> String {
    format!("Quiz #{quiz_id}")
}

/// Records finished attempts and derives listings and statistics from them.
#[derive(Clone)]
pub struct QuizHistoryService {
    clock: Clock,
    history: Arc<dyn QuizHistoryRepository>,
}

impl QuizHistoryService {
    #[must_use]
    pub fn new(clock: Clock, history: Arc<dyn QuizHistoryRepository>) -> Self {
        Self { clock, history }
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::new(clock, Arc::new(InMemoryRepository::new()))
    }

    /// Stamp `result` with the current time and store it as the latest for the quiz.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn record(
        &self,
        quiz_id: QuizId,
        result: QuizResult,
    ) -> Result<QuizResult, HistoryError> {
        let stamped = result.with_timestamp(self.clock.now());
        self.history.upsert_result(quiz_id, &stamped).await?;
        info!(
            quiz_id = %quiz_id,
            score = stamped.score(),
            total = stamped.total(),
            "quiz result recorded"
        );
        Ok(stamped)
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn list(
        &self,
        bank: Option<&QuestionBank>,
        query: &HistoryQuery,
    ) -> Result<Vec<HistoryEntry>, HistoryError> {
        let records = self.history.list_results().await?;
        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase);

        let mut entries: Vec<HistoryEntry> = records
            .into_iter()
            .map(|record| entry_for(bank, record))
            .filter(|entry| {
                needle.as_ref().is_none_or(|term| {
                    entry.title.to_lowercase().contains(term.as_str())
                        || entry.quiz_id.to_string().contains(term.as_str())
                })
            })
            .collect();

        match query.sort {
            HistorySort::DateDesc => entries.sort_by_key(|e| Reverse(e.completed_at)),
            HistorySort::DateAsc => entries.sort_by_key(|e| e.completed_at),
            HistorySort::ScoreDesc => entries.sort_by_key(|e| Reverse(e.percentage)),
            HistorySort::ScoreAsc => entries.sort_by_key(|e| e.percentage),
        }
        Ok(entries)
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub async fn stats(&self) -> Result<HistoryStats, HistoryError> {
        let records = self.history.list_results().await?;
        let total_tests = records.len();
        let average_percentage = if records.is_empty() {
            0
        } else {
            let sum: f64 = records
                .iter()
                .map(|r| f64::from(r.result.percentage()))
                .sum();
            (sum / total_tests as f64).round() as u32
        };
        let total_points = total_points(records.iter().map(|r| &r.result));
        Ok(HistoryStats {
            total_tests,
            average_percentage,
            total_points,
            league: League::for_points(total_points),
            points_to_next: points_to_next(total_points),
        })
    }

    /// Wrong answers from every recorded quiz still present in `bank`.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn mistakes(&self, bank: &QuestionBank) -> Result<Vec<Mistake>, HistoryError> {
        let records = self.history.list_results().await?;
        let mut mistakes = Vec::new();
        for record in records {
            let Some(quiz) = bank.get(record.quiz_id) else {
                continue;
            };
            for (&question_index, &chosen_index) in record.result.answers() {
                let Some(question) = quiz.questions().get(question_index) else {
                    continue;
                };
                if question.is_correct(chosen_index) {
                    continue;
                }
                mistakes.push(Mistake {
                    quiz_id: record.quiz_id,
                    quiz_title: quiz.title().to_string(),
                    question_index,
                    question: question.clone(),
                    chosen_index,
                });
            }
        }
        Ok(mistakes)
    }

    /// # Errors
    ///
    /// Returns `HistoryError::Storage` on repository failures.
    pub async fn best_percentage(&self, quiz_id: QuizId) -> Result<Option<u32>, HistoryError> {
        Ok(self
            .history
            .get_result(quiz_id)
            .await?
            .map(|result| result.percentage()))
    }
}

fn entry_for(bank: Option<&QuestionBank>, record: HistoryRecord) -> HistoryEntry {
    let title = bank
        .and_then(|b| b.title(record.quiz_id))
        .map_or_else(|| fallback_title(record.quiz_id), str::to_string);
    let result = record.result;
    HistoryEntry {
        quiz_id: record.quiz_id,
        title,
        score: result.score(),
        total: result.total(),
        percentage: result.percentage(),
        time_spent_secs: result.time_spent_secs(),
        completed_at: result.timestamp(),
    }
}
