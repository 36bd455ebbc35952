use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{LessonId, UserId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("unknown progress flag: {0}")]
    UnknownFlag(String),

    #[error("unknown lesson status: {0}")]
    UnknownStatus(String),
}

//
// ─── STATUS ────────────────────────────────────────────────────────────────────
//

/// Lifecycle of a learner's engagement with one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonStatus {
    #[default]
    InProgress,
    Completed,
}

impl LessonStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LessonStatus::InProgress => "in_progress",
            LessonStatus::Completed => "completed",
        }
    }
}

impl FromStr for LessonStatus {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(LessonStatus::InProgress),
            "completed" => Ok(LessonStatus::Completed),
            other => Err(ProgressError::UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//
// ─── FLAGS ─────────────────────────────────────────────────────────────────────
//

/// Interaction markers recorded per lesson. Informational only; they never
/// change the lesson status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressFlag {
    WatchedVideo,
    ViewedMaterials,
    ReadTranscript,
    PracticedScript,
    PracticedOpen,
}

impl ProgressFlag {
    pub const ALL: [ProgressFlag; 5] = [
        ProgressFlag::WatchedVideo,
        ProgressFlag::ViewedMaterials,
        ProgressFlag::ReadTranscript,
        ProgressFlag::PracticedScript,
        ProgressFlag::PracticedOpen,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProgressFlag::WatchedVideo => "watched_video",
            ProgressFlag::ViewedMaterials => "viewed_materials",
            ProgressFlag::ReadTranscript => "read_transcript",
            ProgressFlag::PracticedScript => "practiced_script",
            ProgressFlag::PracticedOpen => "practiced_open",
        }
    }
}

impl FromStr for ProgressFlag {
    type Err = ProgressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ProgressFlag::ALL
            .into_iter()
            .find(|flag| flag.as_str() == s)
            .ok_or_else(|| ProgressError::UnknownFlag(s.to_string()))
    }
}

impl fmt::Display for ProgressFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The five interaction flags of a lesson record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProgressFlags {
    pub watched_video: bool,
    pub viewed_materials: bool,
    pub read_transcript: bool,
    pub practiced_script: bool,
    pub practiced_open: bool,
}

impl ProgressFlags {
    #[must_use]
    pub fn get(&self, flag: ProgressFlag) -> bool {
        match flag {
            ProgressFlag::WatchedVideo => self.watched_video,
            ProgressFlag::ViewedMaterials => self.viewed_materials,
            ProgressFlag::ReadTranscript => self.read_transcript,
            ProgressFlag::PracticedScript => self.practiced_script,
            ProgressFlag::PracticedOpen => self.practiced_open,
        }
    }

    pub fn set(&mut self, flag: ProgressFlag, value: bool) {
        let slot = match flag {
            ProgressFlag::WatchedVideo => &mut self.watched_video,
            ProgressFlag::ViewedMaterials => &mut self.viewed_materials,
            ProgressFlag::ReadTranscript => &mut self.read_transcript,
            ProgressFlag::PracticedScript => &mut self.practiced_script,
            ProgressFlag::PracticedOpen => &mut self.practiced_open,
        };
        *slot = value;
    }

    /// Number of flags currently set.
    #[must_use]
    pub fn count(&self) -> u32 {
        ProgressFlag::ALL
            .into_iter()
            .map(|flag| u32::from(self.get(flag)))
            .sum()
    }
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// Progress of one learner on one lesson.
///
/// Unique per `(user_id, lesson_id)`. A record that has never been written is
/// represented by [`LessonProgress::untouched`]: in progress, no flags, no
/// `last_viewed_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LessonProgress {
    user_id: UserId,
    lesson_id: LessonId,
    status: LessonStatus,
    #[serde(flatten)]
    flags: ProgressFlags,
    last_viewed_at: Option<DateTime<Utc>>,
}

impl LessonProgress {
    #[must_use]
    pub fn untouched(user_id: UserId, lesson_id: LessonId) -> Self {
        Self {
            user_id,
            lesson_id,
            status: LessonStatus::InProgress,
            flags: ProgressFlags::default(),
            last_viewed_at: None,
        }
    }

    /// Rehydrate a record loaded from storage.
    #[must_use]
    pub fn from_persisted(
        user_id: UserId,
        lesson_id: LessonId,
        status: LessonStatus,
        flags: ProgressFlags,
        last_viewed_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            user_id,
            lesson_id,
            status,
            flags,
            last_viewed_at,
        }
    }

    /// Merge one flag into the record, leaving every other field untouched
    /// apart from `last_viewed_at`.
    pub fn set_flag(&mut self, flag: ProgressFlag, value: bool, at: DateTime<Utc>) {
        self.flags.set(flag, value);
        self.last_viewed_at = Some(at);
    }

    /// Mark the lesson completed. Flags are preserved.
    pub fn mark_complete(&mut self, at: DateTime<Utc>) {
        self.status = LessonStatus::Completed;
        self.last_viewed_at = Some(at);
    }

    #[must_use]
    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn status(&self) -> LessonStatus {
        self.status
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.status == LessonStatus::Completed
    }

    #[must_use]
    pub fn flags(&self) -> ProgressFlags {
        self.flags
    }

    #[must_use]
    pub fn flag(&self, flag: ProgressFlag) -> bool {
        self.flags.get(flag)
    }

    #[must_use]
    pub fn last_viewed_at(&self) -> Option<DateTime<Utc>> {
        self.last_viewed_at
    }

    /// True when the record has never been written.
    #[must_use]
    pub fn is_untouched(&self) -> bool {
        self.last_viewed_at.is_none()
            && self.status == LessonStatus::InProgress
            && self.flags == ProgressFlags::default()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
