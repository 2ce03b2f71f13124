//! Router assembly: HTTP endpoints, WebSocket upgrade, static files, CORS, and HTTP tracing.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::state::AppState;

pub mod http;
pub mod ws;

/// Build the application router with:
/// - WebSocket at `/ws`
/// - REST-ish API under `/api/v1/...`
/// - Static front end from `./static` with index fallback
/// - CORS (allow any origin/method/headers); tighten for production
/// - HTTP trace layer (per-request spans w/ method, path, status, latency)
pub fn build_router(state: Arc<AppState>) -> Router {
    let static_service = ServeDir::new("./static")
        .append_index_html_on_directories(true)
        .not_found_service(ServeFile::new("./static/index.html"));

    Router::new()
        .route("/ws", get(ws::ws_upgrade))
        .route("/api/v1/health", get(http::http_health))
        .route("/api/v1/curriculum", get(http::http_get_curriculum))
        .route("/api/v1/challenge", get(http::http_get_challenge))
        .route("/api/v1/answer", post(http::http_post_answer))
        .route("/api/v1/hint", post(http::http_post_hint))
        .route("/api/v1/progress", get(http::http_get_progress))
        .route("/api/v1/progress/reset", post(http::http_post_reset))
        .route("/api/v1/progress/path", post(http::http_post_path))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .fallback_service(static_service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::state::tests::test_state;

    async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::post(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_req(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_reports_gateway_state() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(Arc::new(test_state(&dir)));
        let (status, body) = call(&app, get_req("/api/v1/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "ok": true, "ai_enabled": false }));
    }

    #[tokio::test]
    async fn submit_flow_over_http() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(Arc::new(test_state(&dir)));

        let (status, body) = call(&app, post_json("/api/v1/answer", json!({ "challengeId": "b1", "answer": "print(Hello World)" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["feedback"]["status"], "incorrect");
        assert_eq!(body["feedback"]["message"], "You're missing quotes!");
        assert_eq!(body["awarded"], false);

        let (_, body) = call(&app, post_json("/api/v1/answer", json!({ "challengeId": "b1", "answer": "print(\"Hello World\")" }))).await;
        assert_eq!(body["feedback"]["status"], "correct");
        assert_eq!(body["awarded"], true);
        assert_eq!(body["next_challenge_id"], "b2");
        assert_eq!(body["progress"]["xp"], 50);

        let (_, body) = call(&app, get_req("/api/v1/progress")).await;
        assert_eq!(body["completed_ids"], json!(["b1"]));
        assert_eq!(body["rank"], "Curious Beginner");

        let (_, body) = call(&app, get_req("/api/v1/curriculum")).await;
        assert_eq!(body["completed"], 1);
        assert_eq!(body["tiers"][0]["challenges"][0]["completed"], true);
    }

    #[tokio::test]
    async fn unknown_challenge_is_404() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(Arc::new(test_state(&dir)));
        let (status, body) = call(&app, post_json("/api/v1/answer", json!({ "challengeId": "nope", "answer": "" }))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Unknown challengeId: nope");

        let (status, _) = call(&app, get_req("/api/v1/challenge?id=nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn busy_submission_is_409() {
        let dir = tempfile::tempdir().unwrap();
        let state = Arc::new(test_state(&dir));
        let app = build_router(state.clone());
        let _held = state.http_session.try_begin().unwrap();
        let (status, _) = call(&app, post_json("/api/v1/answer", json!({ "challengeId": "b1", "answer": "x" }))).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn challenge_hint_path_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let app = build_router(Arc::new(test_state(&dir)));

        let (_, body) = call(&app, get_req("/api/v1/challenge")).await;
        assert_eq!(body["id"], "b1");
        assert!(body.get("solution").is_none());
        let (_, body) = call(&app, get_req("/api/v1/challenge?id=a1")).await;
        assert_eq!(body["position"], 7);
        assert_eq!(body["concepts"], json!(["OOP", "Classes"]));

        let (_, body) = call(&app, post_json("/api/v1/hint", json!({ "challengeId": "a1", "code": "" }))).await;
        assert_eq!(body["text"], "class Robot:\n    pass");

        let (_, body) = call(&app, post_json("/api/v1/progress/path", json!({ "path": "Web Architect" }))).await;
        assert_eq!(body["chosen_path"], "Web Architect");

        let (status, body) = call(&app, Request::post("/api/v1/progress/reset").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["chosen_path"], "None");
        assert_eq!(body["level"], 1);
    }
}
