mod catalog;
mod conversation;
mod ids;
mod profile;
mod progress;

pub use ids::{CourseId, LessonId, MaterialId, ParseIdError, ProfileId, UserId};

pub use catalog::{
    CatalogError, Course, CourseOutline, Lesson, LessonOutline, Material, MaterialKind,
    sort_lessons,
};
pub use conversation::{Conversation, NewConversation};
pub use profile::{CefrLevel, Profile, ProfileError, Subscription, avatar_url};
pub use progress::{LessonProgress, LessonStatus, ProgressError, ProgressFlag, ProgressFlags};
