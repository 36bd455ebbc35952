use std::sync::Arc;

use serde::Serialize;

use lingua_core::metrics::{self, CourseProgress};
use lingua_core::model::{Conversation, Profile, Subscription, UserId};
use storage::repository::{ConversationRepository, ProfileRepository};

use crate::Clock;
use crate::error::DashboardError;
use crate::progress_service::ProgressService;

/// How many conversations the dashboard lists.
pub const RECENT_CONVERSATION_LIMIT: u32 = 20;

/// Everything the learner dashboard renders in one payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LearnerDashboard {
    pub profile: Profile,
    pub subscription: Subscription,
    pub courses: Vec<CourseProgress>,
    pub completed_courses: u32,
    pub level: u32,
    pub recent_conversations: Vec<Conversation>,
}

#[derive(Clone)]
pub struct DashboardService {
    clock: Clock,
    progress: Arc<ProgressService>,
    profiles: Arc<dyn ProfileRepository>,
    conversations: Arc<dyn ConversationRepository>,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<ProgressService>,
        profiles: Arc<dyn ProfileRepository>,
        conversations: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            clock,
            progress,
            profiles,
            conversations,
        }
    }

    /// Assemble the dashboard for `user_id`.
    ///
    /// Profile, subscription and conversation lookups degrade to defaults when
    /// they fail; the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns `DashboardError::Progress` if the course overview cannot be computed.
    pub async fn load(&self, user_id: UserId) -> Result<LearnerDashboard, DashboardError> {
        let profile = match self.profiles.get_profile_by_user(user_id).await {
            Ok(Some(profile)) => profile,
            Ok(None) => Profile::placeholder(user_id, self.clock.today()),
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "profile lookup failed, using placeholder");
                Profile::placeholder(user_id, self.clock.today())
            }
        };

        let subscription = match profile.id {
            Some(profile_id) => match self.profiles.get_subscription(profile_id).await {
                Ok(found) => found.unwrap_or_default(),
                Err(err) => {
                    tracing::warn!(%user_id, error = %err, "subscription lookup failed");
                    Subscription::free()
                }
            },
            None => Subscription::free(),
        };

        let courses = self.progress.course_overview(user_id).await?;
        let completed_courses = metrics::completed_courses(&courses);

        let recent_conversations = self
            .conversations
            .recent_conversations(user_id, RECENT_CONVERSATION_LIMIT)
            .await
            .unwrap_or_else(|err| {
                tracing::warn!(%user_id, error = %err, "conversation lookup failed");
                Vec::new()
            });

        Ok(LearnerDashboard {
            profile,
            subscription,
            level: metrics::learner_level(completed_courses),
            courses,
            completed_courses,
            recent_conversations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::Duration;
    use lingua_core::model::{Course, CourseId, Lesson, LessonId, NewConversation, ProfileId};
    use lingua_core::time::fixed_now;
    use storage::repository::{CatalogRepository, InMemoryRepository, StorageError};

    struct BrokenProfiles;

    #[async_trait]
    impl ProfileRepository for BrokenProfiles {
        async fn get_profile_by_user(&self, _: UserId) -> Result<Option<Profile>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn upsert_profile(&self, _: &Profile) -> Result<ProfileId, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn get_subscription(&self, _: ProfileId) -> Result<Option<Subscription>, StorageError> {
            Err(StorageError::Connection("offline".into()))
        }

        async fn upsert_subscription(
            &self,
            _: ProfileId,
            _: &Subscription,
        ) -> Result<(), StorageError> {
            Err(StorageError::Connection("offline".into()))
        }
    }

    fn dashboard(repo: &InMemoryRepository, profiles: Arc<dyn ProfileRepository>) -> DashboardService {
        let clock = Clock::fixed(fixed_now());
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
        ));
        DashboardService::new(clock, progress, profiles, Arc::new(repo.clone()))
    }

    async fn seed_catalog(repo: &InMemoryRepository) {
        let now = fixed_now();
        let course = Course::new(CourseId::new(1), "Numbers", now).unwrap();
        repo.upsert_course(&course).await.unwrap();
        let lesson = Lesson::new(LessonId::new(1), course.id(), "One to ten", 1, now).unwrap();
        repo.upsert_lesson(&lesson).await.unwrap();
    }

    #[tokio::test]
    async fn new_learner_gets_placeholder_and_free_plan() {
        let repo = InMemoryRepository::new();
        seed_catalog(&repo).await;
        let service = dashboard(&repo, Arc::new(repo.clone()));
        let user = UserId::random();

        let view = service.load(user).await.unwrap();
        assert_eq!(view.profile.name, "Learner");
        assert!(!view.profile.is_persisted());
        assert_eq!(view.subscription, Subscription::free());
        assert_eq!(view.courses.len(), 1);
        assert_eq!(view.level, 0);
        assert!(view.recent_conversations.is_empty());
    }

    #[tokio::test]
    async fn stored_profile_subscription_and_history_are_returned() {
        let repo = InMemoryRepository::new();
        seed_catalog(&repo).await;
        let service = dashboard(&repo, Arc::new(repo.clone()));
        let user = UserId::random();

        let profile = Profile::new(user, "Ana", "ana@example.com", fixed_now().date_naive()).unwrap();
        let profile_id = repo.upsert_profile(&profile).await.unwrap();
        let premium = Subscription {
            plan: "Premium".into(),
            status: "Active".into(),
            ..Subscription::free()
        };
        repo.upsert_subscription(profile_id, &premium).await.unwrap();
        for minutes in 0..3 {
            repo.append_conversation(NewConversation {
                user_id: user,
                lesson_id: Some(LessonId::new(1)),
                user_input: Some(format!("take {minutes}")),
                model_response: None,
                created_at: fixed_now() + Duration::minutes(minutes),
            })
            .await
            .unwrap();
        }

        let view = service.load(user).await.unwrap();
        assert_eq!(view.profile.name, "Ana");
        assert!(view.subscription.is_active());
        assert_eq!(view.recent_conversations.len(), 3);
        assert_eq!(
            view.recent_conversations[0].user_input.as_deref(),
            Some("take 2")
        );
    }

    #[tokio::test]
    async fn profile_failures_fall_back_to_defaults() {
        let repo = InMemoryRepository::new();
        seed_catalog(&repo).await;
        let service = dashboard(&repo, Arc::new(BrokenProfiles));

        let view = service.load(UserId::random()).await.unwrap();
        assert_eq!(view.profile.name, "Learner");
        assert_eq!(view.profile.join_date, fixed_now().date_naive());
        assert_eq!(view.subscription.plan, "Free Plan");
    }
}
