#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod dashboard_service;
pub mod error;
pub mod feedback_service;
pub mod progress_service;

pub use lingua_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CatalogService, CourseDraft, LessonDraft};
pub use dashboard_service::{DashboardService, LearnerDashboard};
pub use error::{
    AppServicesError, CatalogServiceError, DashboardError, FeedbackError, ProgressServiceError,
};
pub use feedback_service::{FeedbackConfig, FeedbackReply, FeedbackRequest, FeedbackService};
pub use progress_service::ProgressService;
