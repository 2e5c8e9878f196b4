use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quiz_core::model::{Answers, QuizId, QuizResult};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, quiz_id_from_i64, quiz_id_to_i64, ser, u32_from_i64};
use crate::repository::{HistoryRecord, QuizHistoryRepository, StorageError};

fn map_result_row(row: &sqlx::sqlite::SqliteRow) -> Result<QuizResult, StorageError> {
    let score = u32_from_i64("score", row.try_get::<i64, _>("score").map_err(ser)?)?;
    let total = u32_from_i64("total", row.try_get::<i64, _>("total").map_err(ser)?)?;
    let time_spent = u32_from_i64(
        "time_spent_secs",
        row.try_get::<i64, _>("time_spent_secs").map_err(ser)?,
    )?;
    let answers_json: String = row.try_get("answers").map_err(ser)?;
    let answers: Answers = serde_json::from_str(&answers_json).map_err(ser)?;
    let completed_at: Option<DateTime<Utc>> = row.try_get("completed_at").map_err(ser)?;

    let result = QuizResult::new(score, total, answers, time_spent);
    Ok(match completed_at {
        Some(at) => result.with_timestamp(at),
        None => result,
    })
}

#[async_trait]
impl QuizHistoryRepository for SqliteRepository {
    async fn upsert_result(&self, quiz_id: QuizId, result: &QuizResult) -> Result<(), StorageError> {
        let answers = serde_json::to_string(result.answers()).map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO quiz_results (quiz_id, score, total, time_spent_secs, answers, completed_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(quiz_id) DO UPDATE SET
                score = excluded.score,
                total = excluded.total,
                time_spent_secs = excluded.time_spent_secs,
                answers = excluded.answers,
                completed_at = excluded.completed_at
            ",
        )
        .bind(quiz_id_to_i64(quiz_id)?)
        .bind(i64::from(result.score()))
        .bind(i64::from(result.total()))
        .bind(i64::from(result.time_spent_secs()))
        .bind(answers)
        .bind(result.timestamp())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn get_result(&self, quiz_id: QuizId) -> Result<Option<QuizResult>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT score, total, time_spent_secs, answers, completed_at
            FROM quiz_results
            WHERE quiz_id = ?1
            ",
        )
        .bind(quiz_id_to_i64(quiz_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_result_row).transpose()
    }

    async fn list_results(&self) -> Result<Vec<HistoryRecord>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT quiz_id, score, total, time_spent_secs, answers, completed_at
            FROM quiz_results
            ORDER BY quiz_id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter()
            .map(|row| {
                let quiz_id = quiz_id_from_i64(row.try_get::<i64, _>("quiz_id").map_err(ser)?)?;
                Ok(HistoryRecord {
                    quiz_id,
                    result: map_result_row(row)?,
                })
            })
            .collect()
    }
}
