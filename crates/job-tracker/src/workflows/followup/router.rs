use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::dispatch::FollowUpDispatcher;
use super::domain::ApplicationId;
use super::repository::{FollowUpRepository, RepositoryError};
use super::service::{FollowUpService, FollowUpServiceError};
use crate::timestamps::deserialize_optional_timestamp;

/// Router builder exposing HTTP endpoints for follow-up review and bookkeeping.
pub fn followup_router<R, D>(service: Arc<FollowUpService<R, D>>) -> Router
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    Router::new()
        .route(
            "/api/v1/follow-ups/candidates",
            get(candidates_handler::<R, D>),
        )
        .route("/api/v1/follow-ups/dispatch", post(dispatch_handler::<R, D>))
        .route(
            "/api/v1/applications/:application_id/next-follow-up",
            get(next_followup_handler::<R, D>),
        )
        .route(
            "/api/v1/applications/:application_id/follow-up-sent",
            post(mark_sent_handler::<R, D>),
        )
        .route(
            "/api/v1/applications/:application_id/response",
            post(response_handler::<R, D>),
        )
        .with_state(service)
}

/// Optional reference time; handlers fall back to the local clock.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct AtQuery {
    #[serde(default, deserialize_with = "deserialize_optional_timestamp")]
    pub(crate) at: Option<NaiveDateTime>,
}

impl AtQuery {
    fn resolve(&self) -> NaiveDateTime {
        self.at.unwrap_or_else(|| Local::now().naive_local())
    }
}

pub(crate) async fn candidates_handler<R, D>(
    State(service): State<Arc<FollowUpService<R, D>>>,
    Query(query): Query<AtQuery>,
) -> Response
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    let now = query.resolve();
    run_blocking(move || service.review(now)).await
}

pub(crate) async fn dispatch_handler<R, D>(
    State(service): State<Arc<FollowUpService<R, D>>>,
    Query(query): Query<AtQuery>,
) -> Response
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    let now = query.resolve();
    run_blocking(move || service.dispatch(now)).await
}

pub(crate) async fn next_followup_handler<R, D>(
    State(service): State<Arc<FollowUpService<R, D>>>,
    Path(application_id): Path<i64>,
    Query(query): Query<AtQuery>,
) -> Response
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    let now = query.resolve();
    run_blocking(move || service.status(ApplicationId(application_id), now)).await
}

pub(crate) async fn mark_sent_handler<R, D>(
    State(service): State<Arc<FollowUpService<R, D>>>,
    Path(application_id): Path<i64>,
    Query(query): Query<AtQuery>,
) -> Response
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    let at = query.resolve();
    run_blocking(move || service.mark_sent(ApplicationId(application_id), at)).await
}

pub(crate) async fn response_handler<R, D>(
    State(service): State<Arc<FollowUpService<R, D>>>,
    Path(application_id): Path<i64>,
    Query(query): Query<AtQuery>,
) -> Response
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    let at = query.resolve();
    run_blocking(move || service.record_response(ApplicationId(application_id), at)).await
}

/// Store access is synchronous; keep it off the async workers.
async fn run_blocking<T, F>(task: F) -> Response
where
    F: FnOnce() -> Result<T, FollowUpServiceError> + Send + 'static,
    T: Serialize + Send + 'static,
{
    match tokio::task::spawn_blocking(task).await {
        Ok(Ok(value)) => (StatusCode::OK, axum::Json(value)).into_response(),
        Ok(Err(err)) => error_response(err),
        Err(join_error) => {
            error!(error = %join_error, "follow-up task did not complete");
            let payload = json!({ "error": "follow-up task did not complete" });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

fn error_response(err: FollowUpServiceError) -> Response {
    let status = match &err {
        FollowUpServiceError::Repository(RepositoryError::NotFound(_)) => StatusCode::NOT_FOUND,
        FollowUpServiceError::Repository(repository) if repository.is_conflict() => {
            StatusCode::CONFLICT
        }
        FollowUpServiceError::InvalidRecord { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        FollowUpServiceError::Repository(_) | FollowUpServiceError::MissingRecipient => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, axum::Json(payload)).into_response()
}
