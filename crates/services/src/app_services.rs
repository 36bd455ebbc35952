use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog_service::CatalogService;
use crate::dashboard_service::DashboardService;
use crate::error::AppServicesError;
use crate::feedback_service::{FeedbackConfig, FeedbackService};
use crate::progress_service::ProgressService;

/// Assembles the services the HTTP layer and CLI share.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<CatalogService>,
    progress: Arc<ProgressService>,
    dashboard: Arc<DashboardService>,
    feedback: Arc<FeedbackService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage, running migrations first.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        feedback: Option<FeedbackConfig>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        tracing::info!(db_url, "storage ready");
        Ok(Self::from_storage(&storage, clock, feedback))
    }

    #[must_use]
    pub fn in_memory(clock: Clock) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, None)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, feedback: Option<FeedbackConfig>) -> Self {
        let catalog = Arc::new(CatalogService::new(clock, Arc::clone(&storage.catalog)));
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.catalog),
            Arc::clone(&storage.progress),
        ));
        let dashboard = Arc::new(DashboardService::new(
            clock,
            Arc::clone(&progress),
            Arc::clone(&storage.profiles),
            Arc::clone(&storage.conversations),
        ));
        let feedback = Arc::new(FeedbackService::new(
            clock,
            feedback,
            Arc::clone(&storage.conversations),
        ));

        Self {
            catalog,
            progress,
            dashboard,
            feedback,
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<CatalogService> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn dashboard(&self) -> Arc<DashboardService> {
        Arc::clone(&self.dashboard)
    }

    #[must_use]
    pub fn feedback(&self) -> Arc<FeedbackService> {
        Arc::clone(&self.feedback)
    }
}
