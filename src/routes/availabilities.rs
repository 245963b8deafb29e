use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::db::models::{GmAvailability, UpsertAvailability};
use crate::db::{AvailabilityRepository, GameMasterRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:gm_id", get(list_availabilities))
        .route(
            "/:gm_id/:date",
            get(get_availability)
                .put(upsert_availability)
                .delete(delete_availability),
        )
}

#[derive(Debug, Deserialize)]
pub struct ListAvailabilitiesQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

async fn list_availabilities(
    State(state): State<Arc<AppState>>,
    Path(gm_id): Path<String>,
    Query(query): Query<ListAvailabilitiesQuery>,
) -> AppResult<Json<Vec<GmAvailability>>> {
    require_gm(&state, &gm_id).await?;
    let rows =
        AvailabilityRepository::list_for_gm(&state.db, &gm_id, query.from, query.to).await?;
    Ok(Json(rows))
}

async fn get_availability(
    State(state): State<Arc<AppState>>,
    Path((gm_id, date)): Path<(String, NaiveDate)>,
) -> AppResult<Json<Option<GmAvailability>>> {
    require_gm(&state, &gm_id).await?;
    let row = AvailabilityRepository::find_for_date(&state.db, &gm_id, date).await?;
    Ok(Json(row))
}

/// Declare slots for a date. Re-declaring overwrites the previous
/// declaration; there is never more than one row per (gm, date).
async fn upsert_availability(
    State(state): State<Arc<AppState>>,
    Path((gm_id, date)): Path<(String, NaiveDate)>,
    Json(payload): Json<UpsertAvailability>,
) -> AppResult<Json<GmAvailability>> {
    require_gm(&state, &gm_id).await?;
    if payload.time_slots.is_empty() {
        return Err(AppError::Validation(
            "time_slots must not be empty".to_string(),
        ));
    }

    let row =
        AvailabilityRepository::upsert(&state.db, &gm_id, date, &payload.time_slots).await?;
    Ok(Json(row))
}

async fn delete_availability(
    State(state): State<Arc<AppState>>,
    Path((gm_id, date)): Path<(String, NaiveDate)>,
) -> AppResult<Json<serde_json::Value>> {
    require_gm(&state, &gm_id).await?;
    let removed = AvailabilityRepository::delete(&state.db, &gm_id, date).await?;
    Ok(Json(serde_json::json!({ "deleted": removed })))
}

async fn require_gm(state: &Arc<AppState>, gm_id: &str) -> AppResult<()> {
    GameMasterRepository::find_by_id(&state.db, gm_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.gm")))?;
    Ok(())
}
