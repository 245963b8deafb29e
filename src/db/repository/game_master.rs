use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateGameMaster, GameMaster, UpdateGameMaster};
use crate::error::{AppError, AppResult};

/// Repository for the `game_masters` table.
pub struct GameMasterRepository;

impl GameMasterRepository {
    pub async fn create(pool: &SqlitePool, data: CreateGameMaster) -> AppResult<GameMaster> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, GameMaster>(
            r#"
            INSERT INTO game_masters (
                id, name, email, phone, is_active, created_at, updated_at
            ) VALUES (?, ?, ?, ?, 1, ?, ?)
            RETURNING id, name, email, phone, is_active, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<GameMaster>> {
        let row = sqlx::query_as::<_, GameMaster>(
            r#"
            SELECT id, name, email, phone, is_active, created_at, updated_at
            FROM game_masters
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list(pool: &SqlitePool, include_inactive: bool) -> AppResult<Vec<GameMaster>> {
        let rows = sqlx::query_as::<_, GameMaster>(
            r#"
            SELECT id, name, email, phone, is_active, created_at, updated_at
            FROM game_masters
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

    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        data: UpdateGameMaster,
    ) -> AppResult<GameMaster> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, GameMaster>(
            r#"
            UPDATE game_masters SET
                name = COALESCE(?, name),
                email = COALESCE(?, email),
                phone = COALESCE(?, phone),
                is_active = COALESCE(?, is_active),
                updated_at = ?
            WHERE id = ?
            RETURNING id, name, email, phone, is_active, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(data.email)
        .bind(data.phone)
        .bind(data.is_active)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
