use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::GmAvailability;
use crate::error::{AppError, AppResult};

/// Repository for the `gm_availabilities` table (one row per GM per date).
pub struct AvailabilityRepository;

impl AvailabilityRepository {
    /// Declare (or re-declare) a GM's slots for a date. Re-declaring updates
    /// the existing row rather than inserting a duplicate.
    pub async fn upsert(
        pool: &SqlitePool,
        gm_id: &str,
        date: NaiveDate,
        time_slots: &[String],
    ) -> AppResult<GmAvailability> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let slots_json = serde_json::to_string(time_slots)
            .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;

        let row = sqlx::query_as::<_, GmAvailability>(
            r#"
            INSERT INTO gm_availabilities (
                id, gm_id, date, time_slots, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(gm_id, date) DO UPDATE SET
                time_slots = excluded.time_slots,
                updated_at = excluded.updated_at
            RETURNING id, gm_id, date, time_slots, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(gm_id)
        .bind(date)
        .bind(slots_json)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_for_date(
        pool: &SqlitePool,
        gm_id: &str,
        date: NaiveDate,
    ) -> AppResult<Option<GmAvailability>> {
        let row = sqlx::query_as::<_, GmAvailability>(
            r#"
            SELECT id, gm_id, date, time_slots, created_at, updated_at
            FROM gm_availabilities
            WHERE gm_id = ? AND date = ?
            "#,
        )
        .bind(gm_id)
        .bind(date)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn list_for_gm(
        pool: &SqlitePool,
        gm_id: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<GmAvailability>> {
        let rows = sqlx::query_as::<_, GmAvailability>(
            r#"
            SELECT id, gm_id, date, time_slots, created_at, updated_at
            FROM gm_availabilities
            WHERE gm_id = ?
              AND (? IS NULL OR date >= ?)
              AND (? IS NULL OR date <= ?)
            ORDER BY date ASC
            "#,
        )
        .bind(gm_id)
        .bind(from)
        .bind(from)
        .bind(to)
        .bind(to)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn delete(pool: &SqlitePool, gm_id: &str, date: NaiveDate) -> AppResult<u64> {
        let res = sqlx::query("DELETE FROM gm_availabilities WHERE gm_id = ? AND date = ?")
            .bind(gm_id)
            .bind(date)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }
}
