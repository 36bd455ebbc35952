//! JSON HTTP surface over the learning services.

use std::net::SocketAddr;
use std::str::FromStr;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use lingua_core::metrics::{CourseProgress, LessonEngagement};
use lingua_core::model::{
    Course, CourseId, CourseOutline, LessonId, LessonProgress, ProgressFlag, UserId,
};
use services::{
    AppServices, CatalogServiceError, DashboardError, FeedbackReply,
    FeedbackRequest, LearnerDashboard, ProgressServiceError,
};
use storage::repository::StorageError;

/// Error body shared by every endpoint: `{ "error": message }`.
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(ErrorBody { error })).into_response()
    }
}

fn from_storage(err: &StorageError) -> ApiError {
    match err {
        StorageError::NotFound => ApiError::NotFound(err.to_string()),
        _ => ApiError::Internal(err.to_string()),
    }
}

impl From<ProgressServiceError> for ApiError {
    fn from(err: ProgressServiceError) -> Self {
        match &err {
            ProgressServiceError::UnknownLesson(_) | ProgressServiceError::UnknownCourse(_) => {
                ApiError::NotFound(err.to_string())
            }
            ProgressServiceError::Storage(inner) => from_storage(inner),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<CatalogServiceError> for ApiError {
    fn from(err: CatalogServiceError) -> Self {
        match &err {
            CatalogServiceError::UnknownCourse(_) | CatalogServiceError::UnknownLesson(_) => {
                ApiError::NotFound(err.to_string())
            }
            CatalogServiceError::Catalog(_) => ApiError::BadRequest(err.to_string()),
            CatalogServiceError::Storage(inner) => from_storage(inner),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<DashboardError> for ApiError {
    fn from(err: DashboardError) -> Self {
        match err {
            DashboardError::Progress(inner) => inner.into(),
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

fn parse<T>(raw: &str, what: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|err| ApiError::BadRequest(format!("invalid {what} `{raw}`: {err}")))
}

pub fn router(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/courses", get(list_courses))
        .route("/courses/:course", get(course_outline))
        .route("/users/:user/lessons/:lesson/progress", get(lesson_progress))
        .route("/users/:user/lessons/:lesson/flags/:flag", put(set_flag))
        .route("/users/:user/lessons/:lesson/complete", post(mark_complete))
        .route("/users/:user/courses/:course/progress", get(course_progress))
        .route("/users/:user/dashboard", get(dashboard))
        .route("/admin/lessons/:lesson/engagement", get(lesson_engagement))
        .route("/functions/chat", post(chat))
        .with_state(services)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Bind `addr` and serve until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(services: AppServices, addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");
    axum::serve(listener, router(services))
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!(error = %err, "failed to install Ctrl-C handler");
            }
        })
        .await?;
    Ok(())
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

async fn list_courses(State(services): State<AppServices>) -> Result<Json<Vec<Course>>, ApiError> {
    Ok(Json(services.catalog().list_courses().await?))
}

async fn course_outline(
    State(services): State<AppServices>,
    Path(course): Path<String>,
) -> Result<Json<CourseOutline>, ApiError> {
    let course: CourseId = parse(&course, "course id")?;
    Ok(Json(services.catalog().course_outline(course).await?))
}

async fn lesson_progress(
    State(services): State<AppServices>,
    Path((user, lesson)): Path<(String, String)>,
) -> Result<Json<LessonProgress>, ApiError> {
    let user: UserId = parse(&user, "user id")?;
    let lesson: LessonId = parse(&lesson, "lesson id")?;
    Ok(Json(services.progress().get_progress(user, lesson).await?))
}

#[derive(Debug, Deserialize)]
struct FlagBody {
    value: bool,
}

async fn set_flag(
    State(services): State<AppServices>,
    Path((user, lesson, flag)): Path<(String, String, String)>,
    body: Result<Json<FlagBody>, JsonRejection>,
) -> Result<Json<LessonProgress>, ApiError> {
    let user: UserId = parse(&user, "user id")?;
    let lesson: LessonId = parse(&lesson, "lesson id")?;
    let flag: ProgressFlag = parse(&flag, "flag")?;
    let Json(body) = body?;
    let record = services
        .progress()
        .set_flag(user, lesson, flag, body.value)
        .await?;
    Ok(Json(record))
}

async fn mark_complete(
    State(services): State<AppServices>,
    Path((user, lesson)): Path<(String, String)>,
) -> Result<Json<LessonProgress>, ApiError> {
    let user: UserId = parse(&user, "user id")?;
    let lesson: LessonId = parse(&lesson, "lesson id")?;
    Ok(Json(services.progress().mark_complete(user, lesson).await?))
}

async fn course_progress(
    State(services): State<AppServices>,
    Path((user, course)): Path<(String, String)>,
) -> Result<Json<CourseProgress>, ApiError> {
    let user: UserId = parse(&user, "user id")?;
    let course: CourseId = parse(&course, "course id")?;
    Ok(Json(
        services
            .progress()
            .compute_course_progress(user, course)
            .await?,
    ))
}

async fn dashboard(
    State(services): State<AppServices>,
    Path(user): Path<String>,
) -> Result<Json<LearnerDashboard>, ApiError> {
    let user: UserId = parse(&user, "user id")?;
    Ok(Json(services.dashboard().load(user).await?))
}

async fn lesson_engagement(
    State(services): State<AppServices>,
    Path(lesson): Path<String>,
) -> Result<Json<LessonEngagement>, ApiError> {
    let lesson: LessonId = parse(&lesson, "lesson id")?;
    Ok(Json(services.progress().lesson_engagement(lesson).await?))
}

async fn chat(
    State(services): State<AppServices>,
    body: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackReply>, ApiError> {
    let Json(request) = body?;
    Ok(Json(services.feedback().feedback(request).await))
}
