use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::{ProgressSnapshot, QuizId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, quiz_id_to_i64, ser};
use crate::repository::{ProgressRepository, StorageError};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn load_progress(&self, quiz_id: QuizId) -> Result<Option<ProgressSnapshot>, StorageError> {
        let row = sqlx::query("SELECT payload FROM quiz_progress WHERE quiz_id = ?1")
            .bind(quiz_id_to_i64(quiz_id)?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let payload: String = row.try_get("payload").map_err(ser)?;
        ProgressSnapshot::from_json(&payload).map(Some).map_err(ser)
    }

    async fn save_progress(
        &self,
        quiz_id: QuizId,
        snapshot: &ProgressSnapshot,
    ) -> Result<(), StorageError> {
        let payload = snapshot.to_json().map_err(ser)?;
        sqlx::query(
            r"
            INSERT INTO quiz_progress (quiz_id, payload, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(quiz_id) DO UPDATE SET
                payload = excluded.payload,
                saved_at = excluded.saved_at
            ",
        )
        .bind(quiz_id_to_i64(quiz_id)?)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn remove_progress(&self, quiz_id: QuizId) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM quiz_progress WHERE quiz_id = ?1")
            .bind(quiz_id_to_i64(quiz_id)?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
