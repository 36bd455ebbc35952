use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::SqliteInitError;

/// Version 1: catalog and lesson progress.
const CATALOG_AND_PROGRESS: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS courses (
            id INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            description TEXT,
            instructor TEXT,
            level TEXT,
            duration TEXT,
            thumbnail TEXT,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS lessons (
            id INTEGER PRIMARY KEY,
            course_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            position INTEGER NOT NULL CHECK (position >= 0),
            video_url TEXT,
            transcript TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (course_id) REFERENCES courses(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS materials (
            id INTEGER PRIMARY KEY,
            lesson_id INTEGER NOT NULL,
            title TEXT,
            kind TEXT NOT NULL,
            url TEXT NOT NULL,
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_progress (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            lesson_id INTEGER NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('in_progress', 'completed')),
            watched_video INTEGER NOT NULL DEFAULT 0,
            viewed_materials INTEGER NOT NULL DEFAULT 0,
            read_transcript INTEGER NOT NULL DEFAULT 0,
            practiced_script INTEGER NOT NULL DEFAULT 0,
            practiced_open INTEGER NOT NULL DEFAULT 0,
            last_viewed_at TEXT,
            UNIQUE (user_id, lesson_id),
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_lessons_course_position
            ON lessons (course_id, position, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_materials_lesson
            ON materials (lesson_id, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_user_progress_lesson
            ON user_progress (lesson_id);
    ",
];

/// Version 2: learner profiles, subscriptions and the coach conversation log.
const PROFILES_AND_CONVERSATIONS: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS profiles (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL UNIQUE,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            avatar TEXT NOT NULL,
            cefr_level TEXT NOT NULL,
            streak INTEGER NOT NULL DEFAULT 0 CHECK (streak >= 0),
            total_hours REAL NOT NULL DEFAULT 0,
            join_date TEXT NOT NULL,
            preferred_language TEXT,
            learning_goals TEXT NOT NULL DEFAULT '[]'
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY,
            profile_id INTEGER NOT NULL UNIQUE,
            plan TEXT NOT NULL,
            status TEXT NOT NULL,
            renewal_date TEXT,
            billing_cycle TEXT NOT NULL,
            next_payment TEXT NOT NULL,
            features TEXT NOT NULL DEFAULT '[]',
            FOREIGN KEY (profile_id) REFERENCES profiles(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS conversations (
            id INTEGER PRIMARY KEY,
            user_id TEXT NOT NULL,
            lesson_id INTEGER,
            user_input TEXT,
            model_response TEXT,
            created_at TEXT NOT NULL,
            FOREIGN KEY (lesson_id) REFERENCES lessons(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_conversations_user_created
            ON conversations (user_id, created_at);
    ",
];

const MIGRATIONS: &[(i64, &[&str])] = &[(1, CATALOG_AND_PROGRESS), (2, PROFILES_AND_CONVERSATIONS)];

pub(crate) async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    for (version, statements) in MIGRATIONS {
        if is_applied(pool, *version).await? {
            continue;
        }

        let mut tx = pool.begin().await?;
        for statement in *statements {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(*version)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        info!(version, "applied schema migration");
    }

    Ok(())
}
