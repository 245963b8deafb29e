use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::db::NotificationRepository;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/stats", get(get_notification_stats))
        .route("/read-all", post(mark_all_read))
        .route("/:id/read", post(mark_read))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListNotificationsQuery {
    pub gm_id: String,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    #[serde(default)]
    pub unread_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct GmQuery {
    pub gm_id: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationsListResponse {
    pub items: Vec<NotificationResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: String,
    pub gm_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub event_data: Option<String>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct NotificationStatsResponse {
    pub total: i64,
    pub unread: i64,
    pub by_type: std::collections::HashMap<String, i64>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List notification history for one GM
async fn list_notifications(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListNotificationsQuery>,
) -> AppResult<Json<NotificationsListResponse>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = (page - 1) * per_page;

    let notifications = NotificationRepository::find_by_gm(
        &state.db,
        &query.gm_id,
        per_page,
        offset,
        query.unread_only,
    )
    .await?;

    let total =
        NotificationRepository::count_by_gm(&state.db, &query.gm_id, query.unread_only).await?;
    let total_pages = (total as f64 / per_page as f64).ceil() as i64;

    let items: Vec<NotificationResponse> = notifications
        .into_iter()
        .map(|n| NotificationResponse {
            id: n.id,
            gm_id: n.gm_id,
            notification_type: n.notification_type,
            title: n.title,
            message: n.message,
            event_data: n.event_data,
            is_read: n.is_read,
            created_at: n.created_at,
        })
        .collect();

    Ok(Json(NotificationsListResponse {
        items,
        total,
        page,
        per_page,
        total_pages,
    }))
}

/// Notification statistics for one GM
async fn get_notification_stats(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GmQuery>,
) -> AppResult<Json<NotificationStatsResponse>> {
    let (total, unread, by_type) = tokio::try_join!(
        NotificationRepository::count_by_gm(&state.db, &query.gm_id, false),
        NotificationRepository::count_by_gm(&state.db, &query.gm_id, true),
        NotificationRepository::counts_by_type(&state.db, &query.gm_id),
    )?;

    Ok(Json(NotificationStatsResponse {
        total,
        unread,
        by_type,
    }))
}

async fn mark_read(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<NotificationResponse>> {
    let n = NotificationRepository::mark_read(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.notification")))?;

    Ok(Json(NotificationResponse {
        id: n.id,
        gm_id: n.gm_id,
        notification_type: n.notification_type,
        title: n.title,
        message: n.message,
        event_data: n.event_data,
        is_read: n.is_read,
        created_at: n.created_at,
    }))
}

async fn mark_all_read(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GmQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let updated = NotificationRepository::mark_all_read(&state.db, &query.gm_id).await?;
    Ok(Json(serde_json::json!({ "updated": updated })))
}
