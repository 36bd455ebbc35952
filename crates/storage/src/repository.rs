use async_trait::async_trait;
use lingua_core::model::{
    Conversation, Course, CourseId, Lesson, LessonId, LessonProgress, Material, NewConversation,
    Profile, ProfileId, Subscription, UserId, sort_lessons,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Courses, lessons and their materials.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Persist or update a course.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the course cannot be stored.
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError>;

    /// Fetch a course by ID; `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError>;

    /// List courses ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn list_courses(&self) -> Result<Vec<Course>, StorageError>;

    /// Persist or update a lesson. The owning course must exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the course is missing, or other storage errors.
    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError>;

    /// Lessons of a course in display order (position, then id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_lessons(&self, course_id: CourseId) -> Result<u32, StorageError>;

    /// Persist or update a material. The owning lesson must exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the lesson is missing, or other storage errors.
    async fn upsert_material(&self, material: &Material) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn materials_for_lesson(&self, lesson_id: LessonId)
    -> Result<Vec<Material>, StorageError>;
}

/// Per-learner lesson progress records, unique per `(user, lesson)`.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError>;

    /// Insert the record or overwrite the stored one for the same pair.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be stored.
    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError>;

    /// Every record the learner has, across all courses.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<LessonProgress>, StorageError>;

    /// The learner's records for lessons belonging to `course_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn progress_for_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError>;

    /// Every learner's record for one lesson.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn progress_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonProgress>, StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_profile_by_user(&self, user_id: UserId) -> Result<Option<Profile>, StorageError>;

    /// Insert or update the profile for `profile.user_id`, returning its row id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn upsert_profile(&self, profile: &Profile) -> Result<ProfileId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn get_subscription(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Subscription>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the profile is missing, or other storage errors.
    async fn upsert_subscription(
        &self,
        profile_id: ProfileId,
        subscription: &Subscription,
    ) -> Result<(), StorageError>;
}

/// Append-only log of AI coach exchanges.
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` if the row cannot be stored.
    async fn append_conversation(&self, conversation: NewConversation)
    -> Result<i64, StorageError>;

    /// Newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn recent_conversations(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Conversation>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn count_conversations(&self, user_id: UserId) -> Result<u32, StorageError>;
}

#[derive(Default)]
struct InMemoryState {
    courses: HashMap<CourseId, Course>,
    lessons: HashMap<LessonId, Lesson>,
    materials: Vec<Material>,
    progress: HashMap<(UserId, LessonId), LessonProgress>,
    profiles: HashMap<UserId, Profile>,
    subscriptions: HashMap<ProfileId, Subscription>,
    conversations: Vec<Conversation>,
    next_profile_id: u64,
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<InMemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, InMemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

#[async_trait]
impl CatalogRepository for InMemoryRepository {
    async fn upsert_course(&self, course: &Course) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.courses.insert(course.id(), course.clone());
        Ok(())
    }

    async fn get_course(&self, id: CourseId) -> Result<Option<Course>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.courses.get(&id).cloned())
    }

    async fn list_courses(&self) -> Result<Vec<Course>, StorageError> {
        let guard = self.lock()?;
        let mut courses: Vec<Course> = guard.courses.values().cloned().collect();
        courses.sort_by_key(Course::id);
        Ok(courses)
    }

    async fn upsert_lesson(&self, lesson: &Lesson) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.courses.contains_key(&lesson.course_id()) {
            return Err(StorageError::NotFound);
        }
        guard.lessons.insert(lesson.id(), lesson.clone());
        Ok(())
    }

    async fn get_lesson(&self, id: LessonId) -> Result<Option<Lesson>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.lessons.get(&id).cloned())
    }

    async fn lessons_for_course(&self, course_id: CourseId) -> Result<Vec<Lesson>, StorageError> {
        let guard = self.lock()?;
        let mut lessons: Vec<Lesson> = guard
            .lessons
            .values()
            .filter(|l| l.course_id() == course_id)
            .cloned()
            .collect();
        sort_lessons(&mut lessons);
        Ok(lessons)
    }

    async fn count_lessons(&self, course_id: CourseId) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        Ok(to_u32(
            guard
                .lessons
                .values()
                .filter(|l| l.course_id() == course_id)
                .count(),
        ))
    }

    async fn upsert_material(&self, material: &Material) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&material.lesson_id()) {
            return Err(StorageError::NotFound);
        }
        guard.materials.retain(|m| m.id() != material.id());
        guard.materials.push(material.clone());
        Ok(())
    }

    async fn materials_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<Material>, StorageError> {
        let guard = self.lock()?;
        let mut materials: Vec<Material> = guard
            .materials
            .iter()
            .filter(|m| m.lesson_id() == lesson_id)
            .cloned()
            .collect();
        materials.sort_by_key(Material::id);
        Ok(materials)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_progress(
        &self,
        user_id: UserId,
        lesson_id: LessonId,
    ) -> Result<Option<LessonProgress>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.progress.get(&(user_id, lesson_id)).cloned())
    }

    async fn upsert_progress(&self, progress: &LessonProgress) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.lessons.contains_key(&progress.lesson_id()) {
            return Err(StorageError::NotFound);
        }
        guard
            .progress
            .insert((progress.user_id(), progress.lesson_id()), progress.clone());
        Ok(())
    }

    async fn progress_for_user(&self, user_id: UserId) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self.lock()?;
        let mut records: Vec<LessonProgress> = guard
            .progress
            .values()
            .filter(|p| p.user_id() == user_id)
            .cloned()
            .collect();
        records.sort_by_key(LessonProgress::lesson_id);
        Ok(records)
    }

    async fn progress_for_course(
        &self,
        user_id: UserId,
        course_id: CourseId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self.lock()?;
        let mut records: Vec<LessonProgress> = guard
            .progress
            .values()
            .filter(|p| p.user_id() == user_id)
            .filter(|p| {
                guard
                    .lessons
                    .get(&p.lesson_id())
                    .is_some_and(|l| l.course_id() == course_id)
            })
            .cloned()
            .collect();
        records.sort_by_key(LessonProgress::lesson_id);
        Ok(records)
    }

    async fn progress_for_lesson(
        &self,
        lesson_id: LessonId,
    ) -> Result<Vec<LessonProgress>, StorageError> {
        let guard = self.lock()?;
        let mut records: Vec<LessonProgress> = guard
            .progress
            .values()
            .filter(|p| p.lesson_id() == lesson_id)
            .cloned()
            .collect();
        records.sort_by_key(LessonProgress::user_id);
        Ok(records)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile_by_user(&self, user_id: UserId) -> Result<Option<Profile>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.profiles.get(&user_id).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<ProfileId, StorageError> {
        let mut guard = self.lock()?;
        let id = match guard.profiles.get(&profile.user_id).and_then(|p| p.id) {
            Some(existing) => existing,
            None => {
                guard.next_profile_id += 1;
                ProfileId::new(guard.next_profile_id)
            }
        };
        let mut stored = profile.clone();
        stored.id = Some(id);
        guard.profiles.insert(profile.user_id, stored);
        Ok(id)
    }

    async fn get_subscription(
        &self,
        profile_id: ProfileId,
    ) -> Result<Option<Subscription>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.subscriptions.get(&profile_id).cloned())
    }

    async fn upsert_subscription(
        &self,
        profile_id: ProfileId,
        subscription: &Subscription,
    ) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.profiles.values().any(|p| p.id == Some(profile_id)) {
            return Err(StorageError::NotFound);
        }
        guard.subscriptions.insert(profile_id, subscription.clone());
        Ok(())
    }
}

#[async_trait]
impl ConversationRepository for InMemoryRepository {
    async fn append_conversation(
        &self,
        conversation: NewConversation,
    ) -> Result<i64, StorageError> {
        let mut guard = self.lock()?;
        if let Some(lesson_id) = conversation.lesson_id {
            if !guard.lessons.contains_key(&lesson_id) {
                return Err(StorageError::NotFound);
            }
        }
        let id = i64::try_from(guard.conversations.len())
            .map_err(|_| StorageError::Serialization("conversation id overflow".into()))?
            + 1;
        guard.conversations.push(conversation.with_id(id));
        Ok(id)
    }

    async fn recent_conversations(
        &self,
        user_id: UserId,
        limit: u32,
    ) -> Result<Vec<Conversation>, StorageError> {
        let guard = self.lock()?;
        let limit = usize::try_from(limit).unwrap_or(usize::MAX);
        let mut rows: Vec<Conversation> = guard
            .conversations
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        rows.truncate(limit);
        Ok(rows)
    }

    async fn count_conversations(&self, user_id: UserId) -> Result<u32, StorageError> {
        let guard = self.lock()?;
        Ok(to_u32(
            guard
                .conversations
                .iter()
                .filter(|c| c.user_id == user_id)
                .count(),
        ))
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub catalog: Arc<dyn CatalogRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
    pub conversations: Arc<dyn ConversationRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            catalog: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            profiles: Arc::new(repo.clone()),
            conversations: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lingua_core::model::{MaterialId, MaterialKind, ProgressFlag};
    use lingua_core::time::fixed_now;

    async fn seeded() -> InMemoryRepository {
        let repo = InMemoryRepository::new();
        let now = fixed_now();
        let course = Course::new(CourseId::new(1), "Numbers", now).unwrap();
        repo.upsert_course(&course).await.unwrap();
        for (id, pos) in [(11, 2), (10, 1), (12, 3)] {
            let lesson =
                Lesson::new(LessonId::new(id), course.id(), format!("L{id}"), pos, now).unwrap();
            repo.upsert_lesson(&lesson).await.unwrap();
        }
        repo
    }

    #[tokio::test]
    async fn lessons_come_back_in_position_order() {
        let repo = seeded().await;
        let lessons = repo.lessons_for_course(CourseId::new(1)).await.unwrap();
        let ids: Vec<u64> = lessons.iter().map(|l| l.id().value()).collect();
        assert_eq!(ids, vec![10, 11, 12]);
        assert_eq!(repo.count_lessons(CourseId::new(1)).await.unwrap(), 3);
        assert_eq!(repo.count_lessons(CourseId::new(2)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lesson_requires_existing_course() {
        let repo = InMemoryRepository::new();
        let orphan = Lesson::new(LessonId::new(1), CourseId::new(99), "x", 0, fixed_now()).unwrap();
        let err = repo.upsert_lesson(&orphan).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn material_upsert_replaces_by_id() {
        let repo = seeded().await;
        let lesson = LessonId::new(10);
        let first = Material::new(MaterialId::new(1), lesson, None, MaterialKind::Pdf, "a.pdf")
            .unwrap();
        let second = Material::new(
            MaterialId::new(1),
            lesson,
            Some("Worksheet".into()),
            MaterialKind::Worksheet,
            "b.pdf",
        )
        .unwrap();
        repo.upsert_material(&first).await.unwrap();
        repo.upsert_material(&second).await.unwrap();
        let materials = repo.materials_for_lesson(lesson).await.unwrap();
        assert_eq!(materials, vec![second]);
    }

    #[tokio::test]
    async fn progress_upsert_is_keyed_by_user_and_lesson() {
        let repo = seeded().await;
        let user = UserId::random();
        let mut progress = LessonProgress::untouched(user, LessonId::new(10));
        progress.set_flag(ProgressFlag::WatchedVideo, true, fixed_now());
        repo.upsert_progress(&progress).await.unwrap();
        progress.mark_complete(fixed_now());
        repo.upsert_progress(&progress).await.unwrap();

        let stored = repo.progress_for_user(user).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].is_completed());
        assert!(stored[0].flag(ProgressFlag::WatchedVideo));

        let other = repo.progress_for_course(user, CourseId::new(2)).await.unwrap();
        assert!(other.is_empty());
        let same = repo.progress_for_course(user, CourseId::new(1)).await.unwrap();
        assert_eq!(same.len(), 1);
    }

    #[tokio::test]
    async fn progress_and_conversations_require_existing_lesson() {
        let repo = seeded().await;
        let user = UserId::random();
        let stray = LessonProgress::untouched(user, LessonId::new(777));
        let err = repo.upsert_progress(&stray).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));

        let err = repo
            .append_conversation(NewConversation {
                user_id: user,
                lesson_id: Some(LessonId::new(777)),
                user_input: Some("seven".into()),
                model_response: None,
                created_at: fixed_now(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert_eq!(repo.count_conversations(user).await.unwrap(), 0);
        assert!(repo.progress_for_user(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn profile_ids_are_stable_across_upserts() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        let mut profile = Profile::new(user, "Ana", "ana@example.com", fixed_now().date_naive())
            .unwrap();
        let first = repo.upsert_profile(&profile).await.unwrap();
        profile.streak = 4;
        let second = repo.upsert_profile(&profile).await.unwrap();
        assert_eq!(first, second);

        let stored = repo.get_profile_by_user(user).await.unwrap().unwrap();
        assert_eq!(stored.streak, 4);
        assert_eq!(stored.id, Some(first));
    }

    #[tokio::test]
    async fn recent_conversations_are_newest_first() {
        let repo = InMemoryRepository::new();
        let user = UserId::random();
        for minutes in [1, 3, 2] {
            repo.append_conversation(NewConversation {
                user_id: user,
                lesson_id: None,
                user_input: Some(format!("m{minutes}")),
                model_response: None,
                created_at: fixed_now() + chrono::Duration::minutes(minutes),
            })
            .await
            .unwrap();
        }
        let rows = repo.recent_conversations(user, 2).await.unwrap();
        let inputs: Vec<_> = rows.iter().filter_map(|c| c.user_input.clone()).collect();
        assert_eq!(inputs, vec!["m3".to_string(), "m2".to_string()]);
        assert_eq!(repo.count_conversations(user).await.unwrap(), 3);
    }
}
