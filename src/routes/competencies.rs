use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};

use crate::db::models::{GmCompetency, UpsertCompetency};
use crate::db::{CompetencyRepository, GameMasterRepository, GameRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/gm/:gm_id", get(list_for_gm))
        .route("/game/:game_id", get(list_for_game))
        .route("/:gm_id/:game_id", put(upsert_competency))
}

async fn list_for_gm(
    State(state): State<Arc<AppState>>,
    Path(gm_id): Path<String>,
) -> AppResult<Json<Vec<GmCompetency>>> {
    GameMasterRepository::find_by_id(&state.db, &gm_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.gm")))?;

    let rows = CompetencyRepository::list_for_gm(&state.db, &gm_id).await?;
    Ok(Json(rows))
}

/// GMs declared competent on a game (level > 0), strongest first.
async fn list_for_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<String>,
) -> AppResult<Json<Vec<GmCompetency>>> {
    GameRepository::find_by_id(&state.db, &game_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.game")))?;

    let rows = CompetencyRepository::list_competent_for_game(&state.db, &game_id).await?;
    Ok(Json(rows))
}

async fn upsert_competency(
    State(state): State<Arc<AppState>>,
    Path((gm_id, game_id)): Path<(String, String)>,
    Json(payload): Json<UpsertCompetency>,
) -> AppResult<Json<GmCompetency>> {
    GameMasterRepository::find_by_id(&state.db, &gm_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.gm")))?;
    GameRepository::find_by_id(&state.db, &game_id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.game")))?;

    if payload.competency_level < 0 {
        return Err(AppError::Validation(
            "competency_level must be >= 0".to_string(),
        ));
    }

    let row = CompetencyRepository::upsert(&state.db, &gm_id, &game_id, payload).await?;
    Ok(Json(row))
}
