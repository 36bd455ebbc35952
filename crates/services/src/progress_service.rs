use std::sync::Arc;

use lingua_core::metrics::{self, CourseProgress, LessonEngagement};
use lingua_core::model::{CourseId, LessonId, LessonProgress, ProgressFlag, UserId};
use storage::repository::{CatalogRepository, ProgressRepository};

use crate::Clock;
use crate::error::ProgressServiceError;

/// Reads and writes per-lesson progress and derives course completion from it.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    catalog: Arc<dyn CatalogRepository>,
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        catalog: Arc<dyn CatalogRepository>,
        progress: Arc<dyn ProgressRepository>,
    ) -> Self {
        Self {
            clock,
            catalog,
            progress,
        }
    }

    /// The stored record, or an untouched in-progress record when the learner
    /// has never opened the lesson. Absence is never an error.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonProgress, ProgressServiceError> {
        let stored = self.progress.get_progress(user_id, lesson_id).await?;
        Ok(stored.unwrap_or_else(|| LessonProgress::untouched(user_id, lesson_id)))
    }

    /// Merge one flag into the learner's record and write it through.
    ///
    /// Other flags and the status are preserved. Setting a flag to the value it
    /// already has only refreshes `last_viewed_at`.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLesson` if the lesson does not exist.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn set_flag(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
        flag: ProgressFlag,
        value: bool,
    ) -> Result<LessonProgress, ProgressServiceError> {
        self.ensure_lesson(lesson_id).await?;
        let mut record = self.get_progress(user_id, lesson_id).await?;
        record.set_flag(flag, value, self.clock.now());
        self.progress.upsert_progress(&record).await?;
        tracing::debug!(%user_id, %lesson_id, %flag, value, "progress flag stored");
        Ok(record)
    }

    /// Mark the lesson completed for the learner, keeping existing flags.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLesson` if the lesson does not exist.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn mark_complete(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<LessonProgress, ProgressServiceError> {
        self.ensure_lesson(lesson_id).await?;
        let mut record = self.get_progress(user_id, lesson_id).await?;
        record.mark_complete(self.clock.now());
        self.progress.upsert_progress(&record).await?;
        tracing::info!(%user_id, %lesson_id, "lesson completed");
        Ok(record)
    }

    /// Completed lessons over total lessons for one course.
    ///
    /// A course without lessons reports 0%.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownCourse` if the course does not exist.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn compute_course_progress(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, ProgressServiceError> {
        if self.catalog.get_course(course_id).await?.is_none() {
            return Err(ProgressServiceError::UnknownCourse(course_id));
        }
        self.course_progress_unchecked(user_id, course_id).await
    }

    /// Progress for every course in the catalog, ordered by course id.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn course_overview(
        &self,
        user_id: UserId,
    ) -> Result<Vec<CourseProgress>, ProgressServiceError> {
        let courses = self.catalog.list_courses().await?;
        let mut overview = Vec::with_capacity(courses.len());
        for course in courses {
            overview.push(self.course_progress_unchecked(user_id, course.id()).await?);
        }
        Ok(overview)
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn learner_level(&self, user_id: UserId) -> Result<u32, ProgressServiceError> {
        let overview = self.course_overview(user_id).await?;
        Ok(metrics::learner_level(metrics::completed_courses(&overview)))
    }

    /// How all learners interacted with one lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::UnknownLesson` if the lesson does not exist.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn lesson_engagement(
        &self,
        lesson_id: LessonId,
    ) -> Result<LessonEngagement, ProgressServiceError> {
        self.ensure_lesson(lesson_id).await?;
        let records = self.progress.progress_for_lesson(lesson_id).await?;
        Ok(LessonEngagement::from_records(lesson_id, &records))
    }

    async fn course_progress_unchecked(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<CourseProgress, ProgressServiceError> {
        let total = self.catalog.count_lessons(course_id).await?;
        let records = self.progress.progress_for_course(user_id, course_id).await?;
        let completed = records.iter().filter(|r| r.is_completed()).count();
        let completed = u32::try_from(completed).unwrap_or(u32::MAX);
        Ok(CourseProgress::new(course_id, completed, total))
    }

    async fn ensure_lesson(&self, lesson_id: LessonId) -> Result<(), ProgressServiceError> {
        match self.catalog.get_lesson(lesson_id).await? {
            Some(_) => Ok(()),
            None => Err(ProgressServiceError::UnknownLesson(lesson_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::Duration;
    use lingua_core::model::{Course, Lesson, LessonStatus};
    use lingua_core::time::fixed_now;
    use storage::repository::InMemoryRepository;

    async fn service_with_course(lessons: u64) -> (ProgressService, InMemoryRepository) {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let course = Course::new(CourseId::new(1), "Numbers", now).unwrap();
        repo.upsert_course(&course).await.unwrap();
        for id in 1..=lessons {
            let lesson = Lesson::new(
                LessonId::new(id),
                course.id(),
                format!("Lesson {id}"),
                u32::try_from(id).unwrap(),
                now,
            )
            .unwrap();
            repo.upsert_lesson(&lesson).await.unwrap();
        }
        let service = ProgressService::new(
            Clock::fixed(now),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        );
        (service, repo)
    }

    #[tokio::test]
    async fn missing_record_reads_as_untouched() {
        let (service, _) = service_with_course(1).await;
        let user = UserId::random();
        let progress = service.get_progress(user, LessonId::new(1)).await.unwrap();
        assert!(progress.is_untouched());
        assert_eq!(progress.status(), LessonStatus::InProgress);
    }

    #[tokio::test]
    async fn set_flag_merges_with_existing_flags() {
        let (service, _) = service_with_course(1).await;
        let user = UserId::random();
        let lesson = LessonId::new(1);

        service
            .set_flag(user, lesson, ProgressFlag::WatchedVideo, true)
            .await
            .unwrap();
        service
            .set_flag(user, lesson, ProgressFlag::ReadTranscript, true)
            .await
            .unwrap();

        let progress = service.get_progress(user, lesson).await.unwrap();
        assert!(progress.flag(ProgressFlag::WatchedVideo));
        assert!(progress.flag(ProgressFlag::ReadTranscript));
        assert_eq!(progress.status(), LessonStatus::InProgress);
        assert_eq!(progress.last_viewed_at(), Some(fixed_now()));
    }

    #[tokio::test]
    async fn set_flag_is_idempotent() {
        let (service, _) = service_with_course(1).await;
        let user = UserId::random();
        let lesson = LessonId::new(1);
        let first = service
            .set_flag(user, lesson, ProgressFlag::PracticedOpen, true)
            .await
            .unwrap();
        let second = service
            .set_flag(user, lesson, ProgressFlag::PracticedOpen, true)
            .await
            .unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn flags_do_not_complete_a_lesson() {
        let (service, _) = service_with_course(1).await;
        let user = UserId::random();
        for flag in ProgressFlag::ALL {
            service
                .set_flag(user, LessonId::new(1), flag, true)
                .await
                .unwrap();
        }
        let course = service
            .compute_course_progress(user, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(course.percent, 0);
    }

    #[tokio::test]
    async fn mark_complete_keeps_flags() {
        let (service, _) = service_with_course(1).await;
        let user = UserId::random();
        let lesson = LessonId::new(1);
        service
            .set_flag(user, lesson, ProgressFlag::ViewedMaterials, true)
            .await
            .unwrap();
        service.mark_complete(user, lesson).await.unwrap();

        let progress = service.get_progress(user, lesson).await.unwrap();
        assert!(progress.is_completed());
        assert!(progress.flag(ProgressFlag::ViewedMaterials));
    }

    #[tokio::test]
    async fn unknown_lesson_is_rejected_before_writing() {
        let (service, repo) = service_with_course(1).await;
        let user = UserId::random();
        let err = service
            .set_flag(user, LessonId::new(99), ProgressFlag::WatchedVideo, true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::UnknownLesson(id) if id == LessonId::new(99)));
        assert!(repo.progress_for_user(user).await.unwrap().is_empty());

        let err = service.mark_complete(user, LessonId::new(99)).await.unwrap_err();
        assert!(matches!(err, ProgressServiceError::UnknownLesson(_)));
    }

    #[tokio::test]
    async fn course_progress_rounds_thirds() {
        let (service, _) = service_with_course(3).await;
        let user = UserId::random();
        service.mark_complete(user, LessonId::new(1)).await.unwrap();
        let course = service
            .compute_course_progress(user, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(course.completed_lessons, 1);
        assert_eq!(course.total_lessons, 3);
        assert_eq!(course.percent, 33);

        service.mark_complete(user, LessonId::new(2)).await.unwrap();
        let course = service
            .compute_course_progress(user, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(course.percent, 67);
    }

    #[tokio::test]
    async fn empty_course_reports_zero_and_unknown_course_errors() {
        let (service, _) = service_with_course(0).await;
        let user = UserId::random();
        let course = service
            .compute_course_progress(user, CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(course.percent, 0);
        assert!(!course.is_complete());

        let err = service
            .compute_course_progress(user, CourseId::new(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressServiceError::UnknownCourse(_)));
    }

    #[tokio::test]
    async fn level_counts_completed_courses() {
        let (service, repo) = service_with_course(1).await;
        let user = UserId::random();
        let later = fixed_now() + Duration::days(1);
        let empty = Course::new(CourseId::new(2), "Colors", later).unwrap();
        repo.upsert_course(&empty).await.unwrap();

        assert_eq!(service.learner_level(user).await.unwrap(), 0);
        service.mark_complete(user, LessonId::new(1)).await.unwrap();
        assert_eq!(service.learner_level(user).await.unwrap(), 1);

        let overview = service.course_overview(user).await.unwrap();
        assert_eq!(overview.len(), 2);
        assert_eq!(overview[0].percent, 100);
        assert_eq!(overview[1].percent, 0);
    }

    #[tokio::test]
    async fn engagement_aggregates_all_learners() {
        let (service, _) = service_with_course(1).await;
        let lesson = LessonId::new(1);
        let (ana, ben) = (UserId::random(), UserId::random());
        service
            .set_flag(ana, lesson, ProgressFlag::WatchedVideo, true)
            .await
            .unwrap();
        service
            .set_flag(ben, lesson, ProgressFlag::WatchedVideo, true)
            .await
            .unwrap();
        service.mark_complete(ben, lesson).await.unwrap();

        let engagement = service.lesson_engagement(lesson).await.unwrap();
        assert_eq!(engagement.learners, 2);
        assert_eq!(engagement.completed, 1);
        assert_eq!(engagement.learners_with(ProgressFlag::WatchedVideo), 2);
        assert_eq!(engagement.learners_with(ProgressFlag::PracticedScript), 0);
        assert_eq!(engagement.completion_percent(), 50);
    }
}
