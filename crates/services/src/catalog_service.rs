use std::sync::Arc;

use lingua_core::model::{
    Course, CourseId, CourseOutline, Lesson, LessonId, LessonOutline, Material, MaterialId,
    MaterialKind,
};
use storage::repository::CatalogRepository;

use crate::Clock;
use crate::error::CatalogServiceError;

/// Fields accepted when authoring a course.
#[derive(Debug, Clone, Default)]
pub struct CourseDraft {
    pub title: String,
    pub description: Option<String>,
    pub instructor: Option<String>,
    pub level: Option<String>,
    pub duration: Option<String>,
    pub thumbnail: Option<String>,
}

/// Fields accepted when authoring a lesson.
#[derive(Debug, Clone, Default)]
pub struct LessonDraft {
    pub title: String,
    pub description: Option<String>,
    pub position: u32,
    pub video_url: Option<String>,
    pub transcript: Option<String>,
}

/// Course browsing and authoring.
#[derive(Clone)]
pub struct CatalogService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
}

impl CatalogService {
    #[must_use]
    pub fn new(clock: Clock, catalog: Arc<dyn CatalogRepository>) -> Self {
        Self { clock, catalog }
    }

    /// # Errors
    ///
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn list_courses(&self) -> Result<Vec<Course>, CatalogServiceError> {
        Ok(self.catalog.list_courses().await?)
    }

    /// A course with its lessons in display order, each carrying its materials.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::UnknownCourse` if the course does not exist.
    /// Returns `CatalogServiceError::Storage` if repository access fails.
    pub async fn course_outline(
        &self,
        course_id: CourseId,
    ) -> Result<CourseOutline, CatalogServiceError> {
        let course = self
            .catalog
            .get_course(course_id)
            .await?
            .ok_or(CatalogServiceError::UnknownCourse(course_id))?;

        let lessons = self.catalog.lessons_for_course(course_id).await?;
        let mut outlines = Vec::with_capacity(lessons.len());
        for lesson in lessons {
            let materials = self.catalog.materials_for_lesson(lesson.id()).await?;
            outlines.push(LessonOutline { lesson, materials });
        }

        Ok(CourseOutline {
            course,
            lessons: outlines,
        })
    }

    /// Create or replace the course with `id`. A replaced course keeps its
    /// original creation time.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::Catalog` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn create_course(
        &self,
        id: CourseId,
        draft: CourseDraft,
    ) -> Result<Course, CatalogServiceError> {
        let created_at = match self.catalog.get_course(id).await? {
            Some(existing) => existing.created_at(),
            None => self.clock.now(),
        };
        let course = Course::new(id, draft.title, created_at)?
            .with_description(draft.description)
            .with_instructor(draft.instructor)
            .with_level(draft.level)
            .with_duration(draft.duration)
            .with_thumbnail(draft.thumbnail);
        self.catalog.upsert_course(&course).await?;
        tracing::info!(course_id = %id, title = course.title(), "course saved");
        Ok(course)
    }

    /// Create or replace a lesson inside an existing course. A replaced lesson
    /// keeps its original creation time.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::UnknownCourse` if the course does not exist.
    /// Returns `CatalogServiceError::Catalog` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn add_lesson(
        &self,
        course_id: CourseId,
        id: LessonId,
        draft: LessonDraft,
    ) -> Result<Lesson, CatalogServiceError> {
        if self.catalog.get_course(course_id).await?.is_none() {
            return Err(CatalogServiceError::UnknownCourse(course_id));
        }
        let created_at = match self.catalog.get_lesson(id).await? {
            Some(existing) => existing.created_at(),
            None => self.clock.now(),
        };
        let lesson = Lesson::new(id, course_id, draft.title, draft.position, created_at)?
            .with_description(draft.description)
            .with_video_url(draft.video_url)
            .with_transcript(draft.transcript);
        self.catalog.upsert_lesson(&lesson).await?;
        Ok(lesson)
    }

    /// Attach a material to an existing lesson.
    ///
    /// # Errors
    ///
    /// Returns `CatalogServiceError::UnknownLesson` if the lesson does not exist.
    /// Returns `CatalogServiceError::Catalog` for validation failures.
    /// Returns `CatalogServiceError::Storage` if persistence fails.
    pub async fn add_material(
        &self,
        lesson_id: LessonId,
        id: MaterialId,
        title: Option<String>,
        kind: MaterialKind,
        url: String,
    ) -> Result<Material, CatalogServiceError> {
        if self.catalog.get_lesson(lesson_id).await?.is_none() {
            return Err(CatalogServiceError::UnknownLesson(lesson_id));
        }
        let material = Material::new(id, lesson_id, title, kind, url)?;
        self.catalog.upsert_material(&material).await?;
        Ok(material)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use lingua_core::model::CatalogError;
    use lingua_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    fn service() -> CatalogService {
        CatalogService::new(Clock::fixed(fixed_now()), Arc::new(InMemoryRepository::new()))
    }

    fn lesson(title: &str, position: u32) -> LessonDraft {
        LessonDraft {
            title: title.into(),
            position,
            ..LessonDraft::default()
        }
    }

    #[tokio::test]
    async fn outline_orders_lessons_and_attaches_materials() {
        let service = service();
        let course_id = CourseId::new(1);
        service
            .create_course(
                course_id,
                CourseDraft {
                    title: "Numbers 1-10".into(),
                    level: Some("Beginner".into()),
                    ..CourseDraft::default()
                },
            )
            .await
            .unwrap();
        service
            .add_lesson(course_id, LessonId::new(2), lesson("Six to ten", 2))
            .await
            .unwrap();
        service
            .add_lesson(course_id, LessonId::new(1), lesson("One to five", 1))
            .await
            .unwrap();
        service
            .add_material(
                LessonId::new(1),
                MaterialId::new(1),
                Some("Chart".into()),
                MaterialKind::Pdf,
                "https://cdn.example.com/chart.pdf".into(),
            )
            .await
            .unwrap();

        let outline = service.course_outline(course_id).await.unwrap();
        assert_eq!(outline.course.level(), Some("Beginner"));
        assert_eq!(outline.lesson_count(), 2);
        assert_eq!(outline.lessons[0].lesson.title(), "One to five");
        assert_eq!(outline.lessons[0].materials.len(), 1);
        assert!(outline.lessons[1].materials.is_empty());
        assert_eq!(service.list_courses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unknown_parents_are_rejected() {
        let service = service();
        let err = service
            .add_lesson(CourseId::new(9), LessonId::new(1), lesson("Orphan", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogServiceError::UnknownCourse(_)));

        let err = service
            .add_material(
                LessonId::new(9),
                MaterialId::new(1),
                None,
                MaterialKind::Link,
                "https://example.com".into(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogServiceError::UnknownLesson(_)));

        let err = service.course_outline(CourseId::new(9)).await.unwrap_err();
        assert!(matches!(err, CatalogServiceError::UnknownCourse(_)));
    }

    #[tokio::test]
    async fn blank_titles_fail_validation() {
        let service = service();
        let err = service
            .create_course(CourseId::new(1), CourseDraft::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogServiceError::Catalog(CatalogError::EmptyCourseTitle)
        ));
    }

    #[tokio::test]
    async fn resaving_keeps_the_original_creation_time() {
        let repo = Arc::new(InMemoryRepository::new());
        let first = CatalogService::new(Clock::fixed(fixed_now()), repo.clone());
        let later = CatalogService::new(
            Clock::fixed(fixed_now() + chrono::Duration::days(3)),
            repo.clone(),
        );
        let course_id = CourseId::new(1);
        let draft = |title: &str| CourseDraft {
            title: title.into(),
            ..CourseDraft::default()
        };

        first.create_course(course_id, draft("Numbers")).await.unwrap();
        first
            .add_lesson(course_id, LessonId::new(1), lesson("One to five", 1))
            .await
            .unwrap();

        let course = later
            .create_course(course_id, draft("Numbers 1-10"))
            .await
            .unwrap();
        assert_eq!(course.created_at(), fixed_now());
        assert_eq!(repo.get_course(course_id).await.unwrap(), Some(course));

        let lesson = later
            .add_lesson(course_id, LessonId::new(1), lesson("One to five again", 1))
            .await
            .unwrap();
        assert_eq!(lesson.created_at(), fixed_now());
        assert_eq!(lesson.title(), "One to five again");
        assert_eq!(repo.get_lesson(LessonId::new(1)).await.unwrap(), Some(lesson));
    }
}
