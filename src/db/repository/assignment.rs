use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::EventAssignment;
use crate::error::{AppError, AppResult};

/// Repository for the `event_assignments` table.
///
/// The UNIQUE(activity_id, gm_id) constraint is the storage-layer guard
/// against assigning the same GM twice to one event under concurrent writers;
/// the engine only pre-checks to produce a friendly error.
pub struct AssignmentRepository;

impl AssignmentRepository {
    pub async fn insert<'e, E>(
        executor: E,
        activity_id: &str,
        gm_id: &str,
        assignment_order: i64,
    ) -> AppResult<EventAssignment>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, EventAssignment>(
            r#"
            INSERT INTO event_assignments (
                id, activity_id, gm_id, assignment_order, status, created_at
            ) VALUES (?, ?, ?, ?, 'assigned', ?)
            RETURNING id, activity_id, gm_id, assignment_order, status, created_at
            "#,
        )
        .bind(id)
        .bind(activity_id)
        .bind(gm_id)
        .bind(assignment_order)
        .bind(now)
        .fetch_one(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// All assignments of an activity, lowest order (primary) first.
    pub async fn find_by_activity(
        pool: &SqlitePool,
        activity_id: &str,
    ) -> AppResult<Vec<EventAssignment>> {
        let rows = sqlx::query_as::<_, EventAssignment>(
            r#"
            SELECT id, activity_id, gm_id, assignment_order, status, created_at
            FROM event_assignments
            WHERE activity_id = ?
            ORDER BY assignment_order ASC
            "#,
        )
        .bind(activity_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn find_one(
        pool: &SqlitePool,
        activity_id: &str,
        gm_id: &str,
    ) -> AppResult<Option<EventAssignment>> {
        let row = sqlx::query_as::<_, EventAssignment>(
            r#"
            SELECT id, activity_id, gm_id, assignment_order, status, created_at
            FROM event_assignments
            WHERE activity_id = ? AND gm_id = ?
            "#,
        )
        .bind(activity_id)
        .bind(gm_id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Delete one (activity, gm) pair; returns the number of rows removed.
    pub async fn delete_one<'e, E>(executor: E, activity_id: &str, gm_id: &str) -> AppResult<u64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let res = sqlx::query("DELETE FROM event_assignments WHERE activity_id = ? AND gm_id = ?")
            .bind(activity_id)
            .bind(gm_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }

    pub async fn delete_all<'e, E>(executor: E, activity_id: &str) -> AppResult<u64>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let res = sqlx::query("DELETE FROM event_assignments WHERE activity_id = ?")
            .bind(activity_id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }
}
