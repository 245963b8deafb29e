use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::{CreateGameMaster, GameMaster, UpdateGameMaster};
use crate::db::GameMasterRepository;
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_gms).post(create_gm))
        .route("/:id", get(get_gm).put(update_gm))
        .route("/:id/deactivate", put(deactivate_gm))
}

#[derive(Debug, Deserialize)]
pub struct ListGmsQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

async fn list_gms(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListGmsQuery>,
) -> AppResult<Json<Vec<GameMaster>>> {
    let gms = GameMasterRepository::list(&state.db, query.include_inactive).await?;
    Ok(Json(gms))
}

async fn create_gm(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateGameMaster>,
) -> AppResult<Json<GameMaster>> {
    if payload.name.trim().is_empty() || payload.email.trim().is_empty() {
        return Err(AppError::Validation(
            "name and email are required".to_string(),
        ));
    }

    let gm = GameMasterRepository::create(&state.db, payload).await?;
    Ok(Json(gm))
}

async fn get_gm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<GameMaster>> {
    let gm = GameMasterRepository::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.gm")))?;
    Ok(Json(gm))
}

async fn update_gm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateGameMaster>,
) -> AppResult<Json<GameMaster>> {
    let gm = GameMasterRepository::update(&state.db, &id, payload).await?;
    Ok(Json(gm))
}

/// GMs are deactivated, never deleted; their assignment history keeps
/// referencing them.
async fn deactivate_gm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<GameMaster>> {
    let gm = GameMasterRepository::update(
        &state.db,
        &id,
        UpdateGameMaster {
            is_active: Some(false),
            ..Default::default()
        },
    )
    .await?;
    Ok(Json(gm))
}
