use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use job_tracker::workflows::followup::{
    followup_router, FollowUpDispatcher, FollowUpRepository, FollowUpService,
};
use serde_json::json;
use std::sync::Arc;

pub(crate) fn with_followup_routes<R, D>(service: Arc<FollowUpService<R, D>>) -> axum::Router
where
    R: FollowUpRepository + 'static,
    D: FollowUpDispatcher + 'static,
{
    followup_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{Duration, Local};
    use job_tracker::store::{NewApplication, NewJob, SqliteStore};
    use job_tracker::workflows::followup::{
        ApplicationStatus, DispatchSettings, EvaluationConfig, LoggingDispatcher,
    };
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use tower::ServiceExt;

    fn app(ready: bool) -> axum::Router {
        let store = SqliteStore::memory().expect("store");
        store.init_schema().expect("schema");
        let company_id = store.upsert_company("Humana", None).expect("company");
        let job_id = store
            .insert_job(&NewJob::new(company_id, "Business Analyst"))
            .expect("job");
        store
            .insert_application(&NewApplication {
                job_id,
                status: ApplicationStatus::Applied,
                applied_at: Some(Local::now().naive_local() - Duration::days(10)),
                notes: None,
            })
            .expect("application");

        let service = FollowUpService::new(
            Arc::new(store),
            Arc::new(LoggingDispatcher),
            EvaluationConfig::default(),
            DispatchSettings::default(),
        );
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        with_followup_routes(Arc::new(service)).layer(Extension(state))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .expect("read body");
        serde_json::from_slice(&bytes).expect("json payload")
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let response = app(true)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reflects_startup_state() {
        let response = app(false)
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json_body(response).await["status"], "initializing");
    }

    #[tokio::test]
    async fn metrics_use_prometheus_text_format() {
        let response = app(true)
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn candidates_are_served_from_sqlite() {
        let response = app(true)
            .oneshot(
                Request::get("/api/v1/follow-ups/candidates")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        let payload = json_body(response).await;
        assert_eq!(payload["candidates"][0]["application"]["company_name"], "Humana");
    }

    #[tokio::test]
    async fn unknown_applications_return_404() {
        let response = app(true)
            .oneshot(
                Request::post("/api/v1/applications/99/response")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
