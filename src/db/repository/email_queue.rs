use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::models::{CreateEmailTask, EmailTask};
use crate::error::{AppError, AppResult};

/// Repository for the persistent email retry queue.
///
/// Implementation notes:
/// - Claiming uses an atomic single-statement UPDATE with a subselect:
///   `UPDATE ... WHERE id = (SELECT id FROM ... LIMIT 1) RETURNING ...`
///   This avoids a long-lived transaction and reduces contention on SQLite.
/// - Queries filter out expired tasks (where `expires_at` IS NOT NULL AND <= CURRENT_TIMESTAMP).
pub struct EmailQueueRepository;

impl EmailQueueRepository {
    /// Enqueue a new email task.
    ///
    /// `task.max_attempts` and `task.next_attempt_at` may be omitted and will
    /// be defaulted here. `expires_at` bounds how long delivery is attempted
    /// (assignment mails go stale once the event has passed).
    pub async fn create(pool: &SqlitePool, task: CreateEmailTask) -> AppResult<EmailTask> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();
        let next_attempt_at = task.next_attempt_at.unwrap_or(now);
        let max_attempts = task.max_attempts.unwrap_or(5);

        let row = sqlx::query_as::<_, EmailTask>(
            r#"
            INSERT INTO email_queue (
                id, notification_id, gm_id, recipient, subject, body, event_data,
                attempts, max_attempts, next_attempt_at, last_error, status,
                expires_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING
                id, notification_id, gm_id, recipient, subject, body, event_data,
                attempts, max_attempts, next_attempt_at, last_error, status,
                expires_at, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(task.notification_id)
        .bind(task.gm_id)
        .bind(task.recipient)
        .bind(task.subject)
        .bind(task.body)
        .bind(task.event_data)
        .bind(0i64) // attempts
        .bind(max_attempts)
        .bind(next_attempt_at)
        .bind::<Option<String>>(None) // last_error
        .bind("pending")
        .bind(task.expires_at)
        .bind(now)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Claim up to `limit` due (non-expired) tasks and return them.
    ///
    /// Atomically claims a single task per statement with an
    /// `UPDATE ... WHERE id = (SELECT id ... LIMIT 1) RETURNING ...` pattern
    /// in a loop, so other writers are never blocked by a long transaction.
    pub async fn fetch_and_claim_due(pool: &SqlitePool, limit: i64) -> AppResult<Vec<EmailTask>> {
        let mut tasks: Vec<EmailTask> = Vec::new();
        if limit <= 0 {
            return Ok(tasks);
        }

        for _ in 0..(limit as usize) {
            let now = Utc::now().naive_utc();

            let opt = sqlx::query_as::<_, EmailTask>(
                r#"
                UPDATE email_queue
                SET status = 'processing', updated_at = ?
                WHERE id = (
                    SELECT id FROM email_queue
                    WHERE status = 'pending'
                      AND next_attempt_at <= ?
                      AND (expires_at IS NULL OR expires_at > ?)
                    ORDER BY next_attempt_at ASC
                    LIMIT 1
                )
                RETURNING
                    id, notification_id, gm_id, recipient, subject, body, event_data,
                    attempts, max_attempts, next_attempt_at, last_error, status,
                    expires_at, created_at, updated_at
                "#,
            )
            .bind(now)
            .bind(now)
            .bind(now)
            .fetch_optional(pool)
            .await
            .map_err(AppError::Database)?;

            if let Some(task) = opt {
                tasks.push(task);
            } else {
                break;
            }
        }

        Ok(tasks)
    }

    /// Mark a task as succeeded. Returns the updated task row.
    pub async fn mark_succeeded(pool: &SqlitePool, id: &str) -> AppResult<EmailTask> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, EmailTask>(
            r#"
            UPDATE email_queue
            SET status = 'succeeded', updated_at = ?
            WHERE id = ?
            RETURNING
                id, notification_id, gm_id, recipient, subject, body, event_data,
                attempts, max_attempts, next_attempt_at, last_error, status,
                expires_at, created_at, updated_at
            "#,
        )
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Increment attempts, set `next_attempt_at` and `last_error`. If the new
    /// attempt count reaches `max_attempts`, the task moves to 'dead'.
    ///
    /// Returns the updated task row.
    pub async fn register_attempt_and_schedule(
        pool: &SqlitePool,
        id: &str,
        next_attempt_at: chrono::NaiveDateTime,
        last_error: Option<String>,
    ) -> AppResult<EmailTask> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, EmailTask>(
            r#"
            UPDATE email_queue
            SET
                attempts = attempts + 1,
                next_attempt_at = ?,
                last_error = ?,
                status = CASE WHEN attempts + 1 >= max_attempts THEN 'dead' ELSE 'pending' END,
                updated_at = ?
            WHERE id = ?
            RETURNING
                id, notification_id, gm_id, recipient, subject, body, event_data,
                attempts, max_attempts, next_attempt_at, last_error, status,
                expires_at, created_at, updated_at
            "#,
        )
        .bind(next_attempt_at)
        .bind(last_error)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Fetch a task by id.
    #[allow(dead_code)]
    pub async fn find_by_id(pool: &SqlitePool, id: &str) -> AppResult<EmailTask> {
        let row = sqlx::query_as::<_, EmailTask>(
            r#"
            SELECT
                id, notification_id, gm_id, recipient, subject, body, event_data,
                attempts, max_attempts, next_attempt_at, last_error, status,
                expires_at, created_at, updated_at
            FROM email_queue
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    /// Mark the task as dead (moved to DLQ) and set the last error.
    pub async fn mark_dead(
        pool: &SqlitePool,
        id: &str,
        last_error: Option<String>,
    ) -> AppResult<EmailTask> {
        let now = Utc::now().naive_utc();
        let row = sqlx::query_as::<_, EmailTask>(
            r#"
            UPDATE email_queue
            SET status = 'dead', last_error = ?, updated_at = ?
            WHERE id = ?
            RETURNING
                id, notification_id, gm_id, recipient, subject, body, event_data,
                attempts, max_attempts, next_attempt_at, last_error, status,
                expires_at, created_at, updated_at
            "#,
        )
        .bind(last_error)
        .bind(now)
        .bind(id)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }
}
