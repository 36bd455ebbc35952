use lingua_core::model::{CourseId, LessonId, LessonProgress, UserId};

use super::SqliteRepository;
use super::mapping::{bool_to_i64, conn, id_to_i64, map_progress_row, write_err};
use crate::repository::{ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = "p.user_id, p.lesson_id, p.status, p.watched_video, \
     p.viewed_materials, p.read_transcript, p.practiced_script, p.practiced_open, p.last_viewed_at";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress p WHERE p.user_id = ?1 AND p.lesson_id = ?2"
        );
        let row = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(id_to_i64("lesson_id", lesson_id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        let flags = progress.flags();
        sqlx::query(
            r"
            INSERT INTO user_progress (
                user_id, lesson_id, status,
                watched_video, viewed_materials, read_transcript, practiced_script, practiced_open,
                last_viewed_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(user_id, lesson_id) DO UPDATE SET
                status = excluded.status,
                watched_video = excluded.watched_video,
                viewed_materials = excluded.viewed_materials,
                read_transcript = excluded.read_transcript,
                practiced_script = excluded.practiced_script,
                practiced_open = excluded.practiced_open,
                last_viewed_at = excluded.last_viewed_at
            ",
        )
        .bind(progress.user_id().to_string())
        .bind(id_to_i64("lesson_id", progress.lesson_id().value())?)
        .bind(progress.status().as_str())
        .bind(bool_to_i64(flags.watched_video))
        .bind(bool_to_i64(flags.viewed_materials))
        .bind(bool_to_i64(flags.read_transcript))
        .bind(bool_to_i64(flags.practiced_script))
        .bind(bool_to_i64(flags.practiced_open))
        .bind(progress.last_viewed_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress p WHERE p.user_id = ?1 ORDER BY p.lesson_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn progress_for_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let sql = format!(
            r"
            SELECT {PROGRESS_COLUMNS}
            FROM user_progress p
            JOIN lessons l ON l.id = p.lesson_id
            WHERE p.user_id = ?1 AND l.course_id = ?2
            ORDER BY p.lesson_id ASC
            "
        );
        let rows = sqlx::query(&sql)
            .bind(user_id.to_string())
            .bind(id_to_i64("course_id", course_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }

    async fn progress_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress p WHERE p.lesson_id = ?1 ORDER BY p.user_id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("lesson_id", lesson_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_progress_row).collect()
    }
}
