use chrono::{DateTime, NaiveDate, Utc};
use lingua_core::model::{
    CefrLevel, Conversation, Course, CourseId, Lesson, LessonId, LessonProgress, LessonStatus,
    Material, MaterialId, MaterialKind, Profile, ProfileId, ProgressFlags, Subscription, UserId,
};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Maps a write failure; a foreign key violation means the parent row is missing.
pub(crate) fn write_err(e: sqlx::Error) -> StorageError {
    let missing_parent =
        matches!(&e, sqlx::Error::Database(db) if db.is_foreign_key_violation());
    if missing_parent {
        StorageError::NotFound
    } else {
        conn(e)
    }
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn course_id_from_i64(v: i64) -> Result<CourseId, StorageError> {
    Ok(CourseId::new(i64_to_u64("course_id", v)?))
}

pub(crate) fn lesson_id_from_i64(v: i64) -> Result<LessonId, StorageError> {
    Ok(LessonId::new(i64_to_u64("lesson_id", v)?))
}

pub(crate) fn profile_id_from_i64(v: i64) -> Result<ProfileId, StorageError> {
    Ok(ProfileId::new(i64_to_u64("profile_id", v)?))
}

pub(crate) fn user_id_from_str(raw: &str) -> Result<UserId, StorageError> {
    raw.parse::<UserId>().map_err(ser)
}

pub(crate) fn bool_to_i64(v: bool) -> i64 {
    i64::from(v)
}

pub(crate) fn strings_to_json(values: &[String]) -> Result<String, StorageError> {
    serde_json::to_string(values).map_err(ser)
}

fn strings_from_json(raw: &str) -> Result<Vec<String>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

pub(crate) fn map_course_row(row: &SqliteRow) -> Result<Course, StorageError> {
    let course = Course::new(
        course_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(course
        .with_description(row.try_get("description").map_err(ser)?)
        .with_instructor(row.try_get("instructor").map_err(ser)?)
        .with_level(row.try_get("level").map_err(ser)?)
        .with_duration(row.try_get("duration").map_err(ser)?)
        .with_thumbnail(row.try_get("thumbnail").map_err(ser)?))
}

pub(crate) fn map_lesson_row(row: &SqliteRow) -> Result<Lesson, StorageError> {
    let lesson = Lesson::new(
        lesson_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        course_id_from_i64(row.try_get::<i64, _>("course_id").map_err(ser)?)?,
        row.try_get::<String, _>("title").map_err(ser)?,
        u32_from_i64("position", row.try_get::<i64, _>("position").map_err(ser)?)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)?;

    Ok(lesson
        .with_description(row.try_get("description").map_err(ser)?)
        .with_video_url(row.try_get("video_url").map_err(ser)?)
        .with_transcript(row.try_get("transcript").map_err(ser)?))
}

pub(crate) fn map_material_row(row: &SqliteRow) -> Result<Material, StorageError> {
    let kind: String = row.try_get("kind").map_err(ser)?;
    Material::new(
        MaterialId::new(i64_to_u64(
            "material_id",
            row.try_get::<i64, _>("id").map_err(ser)?,
        )?),
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        row.try_get("title").map_err(ser)?,
        MaterialKind::from(kind),
        row.try_get::<String, _>("url").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<LessonProgress, StorageError> {
    let flag = |column: &str| -> Result<bool, StorageError> {
        Ok(row.try_get::<i64, _>(column).map_err(ser)? != 0)
    };
    let status: String = row.try_get("status").map_err(ser)?;
    let last_viewed_at: Option<DateTime<Utc>> = row.try_get("last_viewed_at").map_err(ser)?;

    Ok(LessonProgress::from_persisted(
        user_id_from_str(row.try_get::<String, _>("user_id").map_err(ser)?.as_str())?,
        lesson_id_from_i64(row.try_get::<i64, _>("lesson_id").map_err(ser)?)?,
        status.parse::<LessonStatus>().map_err(ser)?,
        ProgressFlags {
            watched_video: flag("watched_video")?,
            viewed_materials: flag("viewed_materials")?,
            read_transcript: flag("read_transcript")?,
            practiced_script: flag("practiced_script")?,
            practiced_open: flag("practiced_open")?,
        },
        last_viewed_at,
    ))
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<Profile, StorageError> {
    let cefr: String = row.try_get("cefr_level").map_err(ser)?;
    let goals: String = row.try_get("learning_goals").map_err(ser)?;
    let join_date: NaiveDate = row.try_get("join_date").map_err(ser)?;

    Ok(Profile {
        id: Some(profile_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?),
        user_id: user_id_from_str(row.try_get::<String, _>("user_id").map_err(ser)?.as_str())?,
        name: row.try_get("name").map_err(ser)?,
        email: row.try_get("email").map_err(ser)?,
        avatar: row.try_get("avatar").map_err(ser)?,
        cefr_level: cefr.parse::<CefrLevel>().map_err(ser)?,
        streak: u32_from_i64("streak", row.try_get::<i64, _>("streak").map_err(ser)?)?,
        total_hours: row.try_get("total_hours").map_err(ser)?,
        join_date,
        preferred_language: row.try_get("preferred_language").map_err(ser)?,
        learning_goals: strings_from_json(&goals)?,
    })
}

pub(crate) fn map_subscription_row(row: &SqliteRow) -> Result<Subscription, StorageError> {
    let features: String = row.try_get("features").map_err(ser)?;
    Ok(Subscription {
        plan: row.try_get("plan").map_err(ser)?,
        status: row.try_get("status").map_err(ser)?,
        renewal_date: row.try_get("renewal_date").map_err(ser)?,
        billing_cycle: row.try_get("billing_cycle").map_err(ser)?,
        next_payment: row.try_get("next_payment").map_err(ser)?,
        features: strings_from_json(&features)?,
    })
}

pub(crate) fn map_conversation_row(row: &SqliteRow) -> Result<Conversation, StorageError> {
    Ok(Conversation {
        id: row.try_get("id").map_err(ser)?,
        user_id: user_id_from_str(row.try_get::<String, _>("user_id").map_err(ser)?.as_str())?,
        lesson_id: row
            .try_get::<Option<i64>, _>("lesson_id")
            .map_err(ser)?
            .map(lesson_id_from_i64)
            .transpose()?,
        user_input: row.try_get("user_input").map_err(ser)?,
        model_response: row.try_get("model_response").map_err(ser)?,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}
