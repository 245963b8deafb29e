use std::sync::Arc;

use axum::{routing::get, Router};

use crate::AppState;

pub mod activities;
pub mod availabilities;
pub mod calendar;
pub mod competencies;
pub mod games;
pub mod gms;
pub mod health;
pub mod notifications;
pub mod reports;

/// API router without the outer middleware layers (CORS, tracing, rate
/// limiting); `main` adds those around it.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/activities", activities::router())
        .nest("/api/gms", gms::router())
        .nest("/api/games", games::router())
        .nest("/api/availabilities", availabilities::router())
        .nest("/api/competencies", competencies::router())
        .nest("/api/notifications", notifications::router())
        .nest("/api/reports", reports::router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_endpoint_responds() {
        let state = crate::services::testing::state().await;
        let app = api_router().with_state(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/health")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "healthy");
    }

    #[tokio::test]
    async fn unknown_activity_returns_not_found() {
        let state = crate::services::testing::state().await;
        let app = api_router().with_state(state);

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/api/activities/nope")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
