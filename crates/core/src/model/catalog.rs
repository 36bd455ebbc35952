use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{CourseId, LessonId, MaterialId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("course title cannot be empty")]
    EmptyCourseTitle,

    #[error("lesson title cannot be empty")]
    EmptyLessonTitle,

    #[error("material url cannot be empty")]
    EmptyMaterialUrl,
}

fn non_empty(raw: impl Into<String>, err: CatalogError) -> Result<String, CatalogError> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(err);
    }
    Ok(trimmed.to_string())
}

//
// ─── COURSE ────────────────────────────────────────────────────────────────────
//

/// A course in the catalog. Lessons reference it by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    id: CourseId,
    title: String,
    description: Option<String>,
    instructor: Option<String>,
    level: Option<String>,
    duration: Option<String>,
    thumbnail: Option<String>,
    created_at: DateTime<Utc>,
}

impl Course {
    /// Creates a course with just a title; optional metadata is attached with the `with_*` builders.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyCourseTitle` if the title is blank.
    pub fn new(
        id: CourseId,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            title: non_empty(title, CatalogError::EmptyCourseTitle)?,
            description: None,
            instructor: None,
            level: None,
            duration: None,
            thumbnail: None,
            created_at,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn with_instructor(mut self, instructor: Option<String>) -> Self {
        self.instructor = instructor;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: Option<String>) -> Self {
        self.level = level;
        self
    }

    #[must_use]
    pub fn with_duration(mut self, duration: Option<String>) -> Self {
        self.duration = duration;
        self
    }

    #[must_use]
    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    #[must_use]
    pub fn id(&self) -> CourseId {
        self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn instructor(&self) -> Option<&str> {
        self.instructor.as_deref()
    }

    #[must_use]
    pub fn level(&self) -> Option<&str> {
        self.level.as_deref()
    }

    #[must_use]
    pub fn duration(&self) -> Option<&str> {
        self.duration.as_deref()
    }

    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// An ordered unit within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    id: LessonId,
    course_id: CourseId,
    title: String,
    description: Option<String>,
    position: u32,
    video_url: Option<String>,
    transcript: Option<String>,
    created_at: DateTime<Utc>,
}

impl Lesson {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyLessonTitle` if the title is blank.
    pub fn new(
        id: LessonId,
        course_id: CourseId,
        title: impl Into<String>,
        position: u32,
        created_at: DateTime<Utc>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            course_id,
            title: non_empty(title, CatalogError::EmptyLessonTitle)?,
            description: None,
            position,
            video_url: None,
            transcript: None,
            created_at,
        })
    }

    #[must_use]
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    #[must_use]
    pub fn with_video_url(mut self, video_url: Option<String>) -> Self {
        self.video_url = video_url;
        self
    }

    #[must_use]
    pub fn with_transcript(mut self, transcript: Option<String>) -> Self {
        self.transcript = transcript;
        self
    }

    #[must_use]
    pub fn id(&self) -> LessonId {
        self.id
    }

    #[must_use]
    pub fn course_id(&self) -> CourseId {
        self.course_id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Position of the lesson inside its course (ascending).
    #[must_use]
    pub fn position(&self) -> u32 {
        self.position
    }

    #[must_use]
    pub fn video_url(&self) -> Option<&str> {
        self.video_url.as_deref()
    }

    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Sorts lessons by position, falling back to id for ties.
pub fn sort_lessons(lessons: &mut [Lesson]) {
    lessons.sort_by_key(|l| (l.position, l.id));
}

//
// ─── MATERIAL ──────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum MaterialKind {
    Pdf,
    Audio,
    Link,
    Worksheet,
    Other(String),
}

impl MaterialKind {
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            MaterialKind::Pdf => "pdf",
            MaterialKind::Audio => "audio",
            MaterialKind::Link => "link",
            MaterialKind::Worksheet => "worksheet",
            MaterialKind::Other(raw) => raw.as_str(),
        }
    }
}

impl FromStr for MaterialKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "pdf" => MaterialKind::Pdf,
            "audio" => MaterialKind::Audio,
            "link" => MaterialKind::Link,
            "worksheet" => MaterialKind::Worksheet,
            _ => MaterialKind::Other(s.trim().to_string()),
        })
    }
}

impl From<String> for MaterialKind {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(kind) => kind,
            Err(never) => match never {},
        }
    }
}

impl From<MaterialKind> for String {
    fn from(value: MaterialKind) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MaterialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A downloadable or linked resource attached to a lesson.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Material {
    id: MaterialId,
    lesson_id: LessonId,
    title: Option<String>,
    kind: MaterialKind,
    url: String,
}

impl Material {
    /// # Errors
    ///
    /// Returns `CatalogError::EmptyMaterialUrl` if the url is blank.
    pub fn new(
        id: MaterialId,
        lesson_id: LessonId,
        title: Option<String>,
        kind: MaterialKind,
        url: impl Into<String>,
    ) -> Result<Self, CatalogError> {
        Ok(Self {
            id,
            lesson_id,
            title,
            kind,
            url: non_empty(url, CatalogError::EmptyMaterialUrl)?,
        })
    }

    #[must_use]
    pub fn id(&self) -> MaterialId {
        self.id
    }

    #[must_use]
    pub fn lesson_id(&self) -> LessonId {
        self.lesson_id
    }

    #[must_use]
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    #[must_use]
    pub fn kind(&self) -> &MaterialKind {
        &self.kind
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

//
// ─── OUTLINE ───────────────────────────────────────────────────────────────────
//

/// A lesson together with its materials, as shown by the course viewer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LessonOutline {
    pub lesson: Lesson,
    pub materials: Vec<Material>,
}

/// A course with its lessons in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseOutline {
    pub course: Course,
    pub lessons: Vec<LessonOutline>,
}

impl CourseOutline {
    #[must_use]
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
