use super::common::*;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::followup::{
    followup_router, DispatchSettings, EvaluationConfig, FollowUpService,
};

#[tokio::test]
async fn candidates_route_returns_sorted_selection() {
    let (service, _, _) = build_service(
        vec![applied(1, 9), applied(2, 20), applied(3, 1)],
        DispatchSettings::default(),
    );
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/follow-ups/candidates?at=2025-10-20T09:00:00")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    let ids: Vec<i64> = payload["candidates"]
        .as_array()
        .expect("candidates array")
        .iter()
        .map(|candidate| candidate["application"]["id"].as_i64().expect("id"))
        .collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(payload["upcoming"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn candidates_route_rejects_unparseable_time() {
    let (service, _, _) = build_service(vec![applied(1, 9)], DispatchSettings::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/follow-ups/candidates?at=yesterday")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn dispatch_route_reports_dry_run() {
    let (service, repository, _) =
        build_service(vec![applied(1, 9)], DispatchSettings::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/follow-ups/dispatch?at=2025-10-20")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["dry_run"], true);
    assert_eq!(payload["outcomes"][0]["status"], "dry_run");
    assert!(!repository.get(1).followup_sent);
}

#[tokio::test]
async fn mark_sent_route_conflicts_on_second_call() {
    let (service, _, _) = build_service(vec![applied(1, 9)], DispatchSettings::default());
    let router = router_with_service(service);

    let first = router
        .clone()
        .oneshot(
            Request::post("/api/v1/applications/1/follow-up-sent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(first.status(), StatusCode::OK);
    let payload = read_json_body(first).await;
    assert_eq!(payload["view"]["state"], "followed_up");

    let second = router
        .oneshot(
            Request::post("/api/v1/applications/1/follow-up-sent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn response_route_marks_application_responded() {
    let (service, repository, _) =
        build_service(vec![applied(1, 9)], DispatchSettings::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/applications/1/response?at=2025-10-20%2010:00:00")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["view"]["state"], "responded");
    assert_eq!(payload["recorded_at"], "2025-10-20T10:00:00");
    assert!(repository.get(1).response_received);
}

#[tokio::test]
async fn response_route_succeeds_for_undated_drafts() {
    let mut draft = snapshot(5, "DRAFT", 0);
    draft.applied_at = None;
    let (service, repository, _) = build_service(vec![draft], DispatchSettings::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/applications/5/response")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert!(payload.get("view").is_none());
    assert_eq!(payload["issues"][0]["kind"], "missing_applied_at");
    assert!(repository.get(5).response_received);
}

#[tokio::test]
async fn mark_sent_route_conflicts_for_closed_applications() {
    let (service, repository, _) = build_service(
        vec![snapshot(6, "REJECTED", 30)],
        DispatchSettings::default(),
    );
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::post("/api/v1/applications/6/follow-up-sent")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert!(!repository.get(6).followup_sent);
}

#[tokio::test]
async fn next_follow_up_route_rejects_unevaluable_records() {
    let mut undated = applied(8, 0);
    undated.applied_at = None;
    let (service, _, _) = build_service(vec![undated], DispatchSettings::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/applications/8/next-follow-up")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .expect("error message")
        .contains("no applied_at"));
}

#[tokio::test]
async fn next_follow_up_route_returns_not_found_for_unknown_ids() {
    let (service, _, _) = build_service(Vec::new(), DispatchSettings::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/applications/77/next-follow-up")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn next_follow_up_route_returns_due_time() {
    let (service, _, _) = build_service(vec![applied(4, 2)], DispatchSettings::default());
    let router = router_with_service(service);

    let response = router
        .oneshot(
            Request::get("/api/v1/applications/4/next-follow-up?at=2025-10-20T09:00:00")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["state"], "not_due");
    assert_eq!(payload["next_followup_at"], "2025-10-25T09:00:00");
}

#[tokio::test]
async fn repository_failures_map_to_internal_error() {
    let service = FollowUpService::new(
        Arc::new(UnavailableRepository),
        Arc::new(MemoryDispatcher::default()),
        EvaluationConfig::default(),
        DispatchSettings::default(),
    );
    let router = followup_router(Arc::new(service));

    let response = router
        .oneshot(
            Request::get("/api/v1/follow-ups/candidates")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
