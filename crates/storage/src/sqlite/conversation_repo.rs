use async_trait::async_trait;
use lingua_core::model::{Conversation, NewConversation, UserId};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, id_to_i64, map_conversation_row, ser, u32_from_i64, write_err};
use crate::repository::{ConversationRepository, StorageError};

#[async_trait]
impl ConversationRepository for SqliteRepository {
    async fn append_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<i64, StorageError> {
        let lesson_id = conversation
            .lesson_id
            .map(|id| id_to_i64("lesson_id", id.value()))
            .transpose()?;

        let result = sqlx::query(
            r"
            INSERT INTO conversations (user_id, lesson_id, user_input, model_response, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
        )
        .bind(conversation.user_id.to_string())
        .bind(lesson_id)
        .bind(conversation.user_input)
        .bind(conversation.model_response)
        .bind(conversation.created_at)
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(result.last_insert_rowid())
    }

    async fn recent_conversations(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Conversation>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, user_id, lesson_id, user_input, model_response, created_at
            FROM conversations
            WHERE user_id = ?1
            ORDER BY created_at DESC, id DESC
            LIMIT ?2
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_conversation_row).collect()
    }

    async fn count_conversations(&self, user_id: UserId) -> Result<u32, StorageError> {
        let row = sqlx::query(
            r"
            SELECT COUNT(*) AS count
            FROM conversations
            WHERE user_id = ?1
            ",
        )
        .bind(user_id.to_string())
        .fetch_one(&self.pool)
        .await
        .map_err(conn)?;

        u32_from_i64("count", row.try_get::<i64, _>("count").map_err(ser)?)
    }
}
