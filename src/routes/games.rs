use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get},
    Json, Router,
};
use serde::Deserialize;

use crate::db::models::{CreateGame, CreateGameMapping, Game, GameMapping, UpdateGame};
use crate::db::{GameMappingRepository, GameRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::matcher::{self, GameMatch};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_games).post(create_game))
        .route("/match", get(match_game))
        .route("/mappings", get(list_mappings).post(create_mapping))
        .route("/mappings/:id", delete(delete_mapping))
        .route("/:id", get(get_game).put(update_game))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListGamesQuery {
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize)]
pub struct MatchQuery {
    pub title: String,
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_games(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListGamesQuery>,
) -> AppResult<Json<Vec<Game>>> {
    let games = GameRepository::list(&state.db, query.include_inactive).await?;
    Ok(Json(games))
}

async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateGame>,
) -> AppResult<Json<Game>> {
    if payload.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let game = GameRepository::create(&state.db, payload).await?;
    state.mappings.invalidate().await;
    Ok(Json(game))
}

async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Game>> {
    let game = GameRepository::find_by_id(&state.db, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.game")))?;
    Ok(Json(game))
}

async fn update_game(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateGame>,
) -> AppResult<Json<Game>> {
    let game = GameRepository::update(&state.db, &id, payload).await?;
    state.mappings.invalidate().await;
    Ok(Json(game))
}

/// Resolve a free-text title against the mapping catalog.
async fn match_game(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MatchQuery>,
) -> AppResult<Json<GameMatch>> {
    let result = matcher::match_title(&state.db, &state.mappings, &query.title).await?;
    Ok(Json(result))
}

async fn list_mappings(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<Vec<GameMapping>>> {
    let mappings = GameMappingRepository::list(&state.db).await?;
    Ok(Json(mappings))
}

async fn create_mapping(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateGameMapping>,
) -> AppResult<Json<GameMapping>> {
    if payload.event_name_pattern.trim().is_empty() {
        return Err(AppError::Validation(
            "event_name_pattern is required".to_string(),
        ));
    }
    GameRepository::find_by_id(&state.db, &payload.game_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.game")))?;

    let mapping = GameMappingRepository::create(&state.db, payload).await?;
    state.mappings.invalidate().await;
    Ok(Json(mapping))
}

async fn delete_mapping(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let removed = GameMappingRepository::delete(&state.db, &id).await?;
    if removed == 0 {
        return Err(AppError::NotFound("Mapping not found".to_string()));
    }
    state.mappings.invalidate().await;
    Ok(Json(serde_json::json!({ "deleted": removed })))
}
