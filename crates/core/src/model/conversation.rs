use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{LessonId, UserId};

/// One exchange between a learner and the AI coach.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub user_id: UserId,
    pub lesson_id: Option<LessonId>,
    pub user_input: Option<String>,
    pub model_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert shape for a conversation log row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewConversation {
    pub user_id: UserId,
    pub lesson_id: Option<LessonId>,
    pub user_input: Option<String>,
    pub model_response: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl NewConversation {
    #[must_use]
    pub fn with_id(self, id: i64) -> Conversation {
        Conversation {
            id,
            user_id: self.user_id,
            lesson_id: self.lesson_id,
            user_input: self.user_input,
            model_response: self.model_response,
            created_at: self.created_at,
        }
    }
}
