use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{
    CreateGame, CreateGameMapping, Game, GameMapping, MappingCatalogEntry, UpdateGame,
};
use crate::error::{AppError, AppResult};

/// Repository for the `games` table.
pub struct GameRepository;

impl GameRepository {
    pub async fn create(pool: &SqlitePool, data: CreateGame) -> AppResult<Game> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Game>(
            r#"
            INSERT INTO games (
                id, name, category, location, average_duration,
                minimum_break_minutes, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 1, ?, ?)
            RETURNING id, name, category, location, average_duration,
                      minimum_break_minutes, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.category)
        .bind(data.location)
        .bind(data.average_duration.unwrap_or(60))
        .bind(data.minimum_break_minutes.unwrap_or(0))
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Game>> {
        let row = sqlx::query_as::<_, Game>(
            r#"
            SELECT id, name, category, location, average_duration,
                   minimum_break_minutes, is_active, created_at, updated_at
            FROM games
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list(pool: &SqlitePool, include_inactive: bool) -> AppResult<Vec<Game>> {
        let rows = sqlx::query_as::<_, Game>(
            r#"
            SELECT id, name, category, location, average_duration,
                   minimum_break_minutes, is_active, created_at, updated_at
            FROM games
            WHERE is_active = 1 OR ? = 1
            ORDER BY name ASC
            "#,
        )
        .bind(include_inactive)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn update(pool: &SqlitePool, id: &str, data: UpdateGame) -> AppResult<Game> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Game>(
            r#"
            UPDATE games SET
                name = COALESCE(?, name),
                category = COALESCE(?, category),
                location = COALESCE(?, location),
                average_duration = COALESCE(?, average_duration),
                minimum_break_minutes = COALESCE(?, minimum_break_minutes),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            RETURNING id, name, category, location, average_duration,
                      minimum_break_minutes, is_active, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.category)
        .bind(data.location)
        .bind(data.average_duration)
        .bind(data.minimum_break_minutes)
        .bind(data.is_active)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}

/// Repository for the `event_game_mappings` table.
pub struct GameMappingRepository;

impl GameMappingRepository {
    pub async fn create(pool: &SqlitePool, data: CreateGameMapping) -> AppResult<GameMapping> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, GameMapping>(
            r#"
            INSERT INTO event_game_mappings (
                id, event_name_pattern, game_id, is_active, created_at
            ) VALUES (?, ?, ?, 1, ?)
            RETURNING id, event_name_pattern, game_id, is_active, created_at
            "#,
        )
        .bind(id)
        .bind(data.event_name_pattern)
        .bind(data.game_id)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list(pool: &SqlitePool) -> AppResult<Vec<GameMapping>> {
        let rows = sqlx::query_as::<_, GameMapping>(
            r#"
            SELECT id, event_name_pattern, game_id, is_active, created_at
            FROM event_game_mappings
            ORDER BY event_name_pattern ASC
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Active mappings joined with their (active) games — the matcher's
    /// catalog, loaded into the mapping cache.
    pub async fn list_catalog(pool: &SqlitePool) -> AppResult<Vec<MappingCatalogEntry>> {
        let rows = sqlx::query_as::<_, MappingCatalogEntry>(
            r#"
            SELECT m.event_name_pattern, m.game_id, g.name AS game_name,
                   g.average_duration, g.minimum_break_minutes
            FROM event_game_mappings m
            INNER JOIN games g ON g.id = m.game_id
            WHERE m.is_active = 1 AND g.is_active = 1
            "#,
        )
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn delete(pool: &SqlitePool, id: &str) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM event_game_mappings WHERE id = ?")
            .bind(id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }
}
