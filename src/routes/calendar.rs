use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use sqlx::Row;

use crate::error::AppResult;
use crate::i18n;
use crate::services::calendar::CalendarSyncManager;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync", post(sync_now))
        .route("/status", get(get_status))
}

/// Trigger a manual planner sync.
async fn sync_now(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let applied = CalendarSyncManager::sync_all(&state).await?;
    let count = applied.to_string();

    Ok(Json(serde_json::json!({
        "synced": applied,
        "message": i18n::t_with("planner.sync_done", &[("count", count.as_str())]),
    })))
}

/// Sync status: whether a feed is configured, last sync touch and how many
/// activities came from the planner.
async fn get_status(State(state): State<Arc<AppState>>) -> AppResult<Json<serde_json::Value>> {
    let configured = state.config.planner.feed_url.is_some();

    let row = sqlx::query(
        r#"
        SELECT MAX(updated_at) AS last_sync, COUNT(*) AS events_count
        FROM activities
        WHERE source = 'external-sync'
        "#,
    )
    .fetch_one(&state.db)
    .await
    .map_err(crate::error::AppError::Database)?;

    let last_sync: Option<chrono::NaiveDateTime> = row.get("last_sync");
    let events_count: i64 = row.get("events_count");

    Ok(Json(serde_json::json!({
        "configured": configured,
        "enabled": state.config.planner.enabled,
        "last_sync": last_sync.map(|dt| {
            chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(dt, chrono::Utc).to_rfc3339()
        }),
        "events_count": events_count,
    })))
}
