use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{GmCompetency, UpsertCompetency};
use crate::error::{AppError, AppResult};

/// Repository for the `gm_competencies` table (one row per (gm, game) pair).
pub struct CompetencyRepository;

impl CompetencyRepository {
    pub async fn upsert(
        pool: &SqlitePool,
        gm_id: &str,
        game_id: &str,
        data: UpsertCompetency,
    ) -> AppResult<GmCompetency> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, GmCompetency>(
            r#"
            INSERT INTO gm_competencies (
                id, gm_id, game_id, competency_level, training_date, notes,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(gm_id, game_id) DO UPDATE SET
                competency_level = excluded.competency_level,
                training_date = excluded.training_date,
                notes = excluded.notes,
                updated_at = excluded.updated_at
            RETURNING
                id, gm_id, game_id, competency_level, training_date, notes,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(gm_id)
        .bind(game_id)
        .bind(data.competency_level)
        .bind(data.training_date)
        .bind(data.notes)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find(
        pool: &SqlitePool,
        gm_id: &str,
        game_id: &str,
    ) -> AppResult<Option<GmCompetency>> {
        let row = sqlx::query_as::<_, GmCompetency>(
            r#"
            SELECT id, gm_id, game_id, competency_level, training_date, notes,
                   created_at, updated_at
            FROM gm_competencies
            WHERE gm_id = ? AND game_id = ?
            "#,
        )
        .bind(gm_id)
        .bind(game_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_for_gm(pool: &SqlitePool, gm_id: &str) -> AppResult<Vec<GmCompetency>> {
        let rows = sqlx::query_as::<_, GmCompetency>(
            r#"
            SELECT id, gm_id, game_id, competency_level, training_date, notes,
                   created_at, updated_at
            FROM gm_competencies
            WHERE gm_id = ?
            ORDER BY game_id ASC
            "#,
        )
        .bind(gm_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Declared competencies for a game (level > 0), strongest first.
    /// Candidate pool for auto-assignment.
    pub async fn list_competent_for_game(
        pool: &SqlitePool,
        game_id: &str,
    ) -> AppResult<Vec<GmCompetency>> {
        let rows = sqlx::query_as::<_, GmCompetency>(
            r#"
            SELECT c.id, c.gm_id, c.game_id, c.competency_level, c.training_date, c.notes,
                   c.created_at, c.updated_at
            FROM gm_competencies c
            INNER JOIN game_masters gm ON gm.id = c.gm_id
            WHERE c.game_id = ? AND c.competency_level > 0 AND gm.is_active = 1
            ORDER BY c.competency_level DESC
            "#,
        )
        .bind(game_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }
}
