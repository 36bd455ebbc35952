use lingua_core::model::{Course, CourseId, Lesson, LessonId, Material};
use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{
    conn, id_to_i64, map_course_row, map_lesson_row, map_material_row, ser, u32_from_i64,
    write_err,
};
use crate::repository::{CatalogRepository, StorageError};

const COURSE_COLUMNS: &str =
    "id, title, description, instructor, level, duration, thumbnail, created_at";
const LESSON_COLUMNS: &str =
    "id, course_id, title, description, position, video_url, transcript, created_at";

#[async_trait::async_trait]
impl CatalogRepository for SqliteRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO courses (id, title, description, instructor, level, duration, thumbnail, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                instructor = excluded.instructor,
                level = excluded.level,
                duration = excluded.duration,
                thumbnail = excluded.thumbnail
            ",
        )
        .bind(id_to_i64("course_id", course.id().value())?)
        .bind(course.title())
        .bind(course.description())
        .bind(course.instructor())
        .bind(course.level())
        .bind(course.duration())
        .bind(course.thumbnail())
        .bind(course.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("course_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_course_row).transpose()
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let sql = format!("SELECT {COURSE_COLUMNS} FROM courses ORDER BY id ASC");
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_course_row).collect()
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lessons (id, course_id, title, description, position, video_url, transcript, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                course_id = excluded.course_id,
                title = excluded.title,
                description = excluded.description,
                position = excluded.position,
                video_url = excluded.video_url,
                transcript = excluded.transcript
            ",
        )
        .bind(id_to_i64("lesson_id", lesson.id().value())?)
        .bind(id_to_i64("course_id", lesson.course_id().value())?)
        .bind(lesson.title())
        .bind(lesson.description())
        .bind(i64::from(lesson.position()))
        .bind(lesson.video_url())
        .bind(lesson.transcript())
        .bind(lesson.created_at())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(id_to_i64("lesson_id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_lesson_row).transpose()
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let sql = format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE course_id = ?1 ORDER BY position ASC, id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(id_to_i64("course_id", course_id.value())?)
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_lesson_row).collect()
    }

    async fn count_lessons(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let row = sqlx::query("SELECT COUNT(*) AS count FROM lessons WHERE course_id = ?1")
            .bind(id_to_i64("course_id", course_id.value())?)
            .fetch_one(&self.pool)
            .await
            .map_err(conn)?;

        u32_from_i64("count", row.try_get::<i64, _>("count").map_err(ser)?)
    }

    async fn upsert_material(&self, material: &Material) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO materials (id, lesson_id, title, kind, url)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ON CONFLICT(id) DO UPDATE SET
                lesson_id = excluded.lesson_id,
                title = excluded.title,
                kind = excluded.kind,
                url = excluded.url
            ",
        )
        .bind(id_to_i64("material_id", material.id().value())?)
        .bind(id_to_i64("lesson_id", material.lesson_id().value())?)
        .bind(material.title())
        .bind(material.kind().as_str())
        .bind(material.url())
        .execute(&self.pool)
        .await
        .map_err(write_err)?;

        Ok(())
    }

    async fn materials_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<Material>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, lesson_id, title, kind, url
            FROM materials
            WHERE lesson_id = ?1
            ORDER BY id ASC
            ",
        )
        .bind(id_to_i64("lesson_id", lesson_id.value())?)
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        rows.iter().map(map_material_row).collect()
    }
}
