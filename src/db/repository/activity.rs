use chrono::{NaiveDate, NaiveDateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{Activity, NewActivity, UpdateActivity};
use crate::error::{AppError, AppResult};

const ACTIVITY_COLUMNS: &str = r#"
    id, title, date, start_time, end_time, duration,
    activity_type, status, is_assigned, assigned_gm_id, game_id,
    admin_notes, description, source, external_ref, assignment_date,
    created_at, updated_at
"#;

/// Repository for the `activities` table.
pub struct ActivityRepository;

impl ActivityRepository {
    pub async fn create(pool: &SqlitePool, new: NewActivity) -> AppResult<Activity> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Activity>(
            r#"
            INSERT INTO activities (
                id, title, date, start_time, end_time, duration,
                activity_type, status, is_assigned, assigned_gm_id, game_id,
                admin_notes, description, source, external_ref, assignment_date,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, 'pending', 0, NULL, ?, ?, ?, ?, ?, NULL, ?, ?)
            RETURNING
                id, title, date, start_time, end_time, duration,
                activity_type, status, is_assigned, assigned_gm_id, game_id,
                admin_notes, description, source, external_ref, assignment_date,
                created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(new.title)
        .bind(new.date)
        .bind(new.start_time)
        .bind(new.end_time)
        .bind(new.duration)
        .bind(new.activity_type)
        .bind(new.game_id)
        .bind(new.admin_notes)
        .bind(new.description)
        .bind(new.source)
        .bind(new.external_ref)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<Option<Activity>> {
        let row = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_external_ref(
        pool: &SqlitePool,
        external_ref: &str,
    ) -> AppResult<Option<Activity>> {
        let row = sqlx::query_as::<_, Activity>(&format!(
            "SELECT {ACTIVITY_COLUMNS} FROM activities WHERE external_ref = ?"
        ))
        .bind(external_ref)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// List activities, optionally bounded by date and filtered by status.
    pub async fn list(
        pool: &SqlitePool,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        status: Option<&str>,
    ) -> AppResult<Vec<Activity>> {
        let rows = sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS} FROM activities
            WHERE status != 'deleted'
              AND (? IS NULL OR date >= ?)
              AND (? IS NULL OR date <= ?)
              AND (? IS NULL OR status = ?)
            ORDER BY date ASC, start_time ASC
            "#
        ))
        .bind(from)
        .bind(from)
        .bind(to)
        .bind(to)
        .bind(status)
        .bind(status)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Pending activities with no assignment row, soonest first.
    pub async fn list_unassigned(pool: &SqlitePool) -> AppResult<Vec<Activity>> {
        let rows = sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS} FROM activities
            WHERE is_assigned = 0 AND status = 'pending'
            ORDER BY date ASC, start_time ASC
            "#
        ))
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Activities synced from the planner feed that are still live (used to
    /// detect events that disappeared from the feed).
    pub async fn list_live_synced(pool: &SqlitePool) -> AppResult<Vec<Activity>> {
        let rows = sqlx::query_as::<_, Activity>(&format!(
            r#"
            SELECT {ACTIVITY_COLUMNS} FROM activities
            WHERE source = 'external-sync'
              AND status NOT IN ('cancelled', 'deleted', 'completed')
            "#
        ))
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Other activities the GM is assigned to on the given date, excluding
    /// cancelled/deleted ones and optionally one activity id. Input of the
    /// conflict checker.
    pub async fn find_assigned_for_gm_on_date(
        pool: &SqlitePool,
        gm_id: &str,
        date: NaiveDate,
        exclude_activity_id: Option<&str>,
    ) -> AppResult<Vec<Activity>> {
        let rows = sqlx::query_as::<_, Activity>(
            r#"
            SELECT
                a.id, a.title, a.date, a.start_time, a.end_time, a.duration,
                a.activity_type, a.status, a.is_assigned, a.assigned_gm_id, a.game_id,
                a.admin_notes, a.description, a.source, a.external_ref, a.assignment_date,
                a.created_at, a.updated_at
            FROM activities a
            INNER JOIN event_assignments ea ON ea.activity_id = a.id
            WHERE ea.gm_id = ?
              AND a.date = ?
              AND a.status NOT IN ('cancelled', 'deleted')
              AND (? IS NULL OR a.id != ?)
            ORDER BY a.start_time ASC
            "#,
        )
        .bind(gm_id)
        .bind(date)
        .bind(exclude_activity_id)
        .bind(exclude_activity_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    /// Partial update; absent fields keep their current value.
    pub async fn update(
        pool: &SqlitePool,
        id: &str,
        update: UpdateActivity,
    ) -> AppResult<Activity> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Activity>(
            r#"
            UPDATE activities SET
                title = COALESCE(?, title),
                date = COALESCE(?, date),
                start_time = COALESCE(?, start_time),
                end_time = COALESCE(?, end_time),
                duration = COALESCE(?, duration),
                activity_type = COALESCE(?, activity_type),
                game_id = COALESCE(?, game_id),
                admin_notes = COALESCE(?, admin_notes),
                description = COALESCE(?, description),
                updated_at = ?
            WHERE id = ?
            RETURNING
                id, title, date, start_time, end_time, duration,
                activity_type, status, is_assigned, assigned_gm_id, game_id,
                admin_notes, description, source, external_ref, assignment_date,
                created_at, updated_at
            "#,
        )
        .bind(update.title)
        .bind(update.date)
        .bind(update.start_time)
        .bind(update.end_time)
        .bind(update.duration)
        .bind(update.activity_type)
        .bind(update.game_id)
        .bind(update.admin_notes)
        .bind(update.description)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn set_status(pool: &SqlitePool, id: &str, status: &str) -> AppResult<Activity> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Activity>(
            r#"
            UPDATE activities SET status = ?, updated_at = ?
            WHERE id = ?
            RETURNING
                id, title, date, start_time, end_time, duration,
                activity_type, status, is_assigned, assigned_gm_id, game_id,
                admin_notes, description, source, external_ref, assignment_date,
                created_at, updated_at
            "#,
        )
        .bind(status)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Update the denormalized assignment fields. Runs on a pool or inside
    /// the assignment engine's transaction.
    pub async fn set_assignment_state<'e, E>(
        executor: E,
        id: &str,
        is_assigned: bool,
        status: &str,
        assigned_gm_id: Option<&str>,
        assignment_date: Option<NaiveDateTime>,
    ) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            UPDATE activities SET
                is_assigned = ?,
                status = ?,
                assigned_gm_id = ?,
                assignment_date = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(is_assigned)
        .bind(status)
        .bind(assigned_gm_id)
        .bind(assignment_date)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await
        .map_err(AppError::Database)?;

        Ok(())
    }

    /// Promote a new primary GM without touching the other assignment fields.
    pub async fn set_primary_gm<'e, E>(executor: E, id: &str, gm_id: &str) -> AppResult<()>
    where
        E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
    {
        let now = Utc::now().naive_utc();

        sqlx::query("UPDATE activities SET assigned_gm_id = ?, updated_at = ? WHERE id = ?")
            .bind(gm_id)
            .bind(now)
            .bind(id)
            .execute(executor)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    /// Reschedule a synced activity from the planner feed.
    pub async fn update_schedule(
        pool: &SqlitePool,
        id: &str,
        title: &str,
        date: NaiveDate,
        start_time: chrono::NaiveTime,
        end_time: chrono::NaiveTime,
        duration: i64,
        description: Option<&str>,
    ) -> AppResult<Activity> {
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Activity>(
            r#"
            UPDATE activities SET
                title = ?,
                date = ?,
                start_time = ?,
                end_time = ?,
                duration = ?,
                description = ?,
                updated_at = ?
            WHERE id = ?
            RETURNING
                id, title, date, start_time, end_time, duration,
                activity_type, status, is_assigned, assigned_gm_id, game_id,
                admin_notes, description, source, external_ref, assignment_date,
                created_at, updated_at
            "#,
        )
        .bind(title)
        .bind(date)
        .bind(start_time)
        .bind(end_time)
        .bind(duration)
        .bind(description)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
