use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::db::models::{CreateNotification, Notification};
use crate::error::{AppError, AppResult};

/// Repository for in-app notifications (`notifications` table).
pub struct NotificationRepository;

impl NotificationRepository {
    pub async fn create(pool: &SqlitePool, data: CreateNotification) -> AppResult<Notification> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now().naive_utc();

        let row = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (
                id, gm_id, notification_type, title, message, event_data,
                is_read, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            RETURNING id, gm_id, notification_type, title, message, event_data,
                      is_read, created_at
            "#,
        )
        .bind(id)
        .bind(data.gm_id)
        .bind(data.notification_type)
        .bind(data.title)
        .bind(data.message)
        .bind(data.event_data)
        .bind(now)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn find_by_gm(
        pool: &SqlitePool,
        gm_id: &str,
        limit: i64,
        offset: i64,
        unread_only: bool,
    ) -> AppResult<Vec<Notification>> {
        let rows = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, gm_id, notification_type, title, message, event_data,
                   is_read, created_at
            FROM notifications
            WHERE gm_id = ? AND (? = 0 OR is_read = 0)
            ORDER BY created_at DESC
            LIMIT ? OFFSET ?
            "#,
        )
        .bind(gm_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(rows)
    }

    pub async fn count_by_gm(
        pool: &SqlitePool,
        gm_id: &str,
        unread_only: bool,
    ) -> AppResult<i64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS count FROM notifications WHERE gm_id = ? AND (? = 0 OR is_read = 0)",
        )
        .bind(gm_id)
        .bind(unread_only)
        .fetch_one(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row.get("count"))
    }

    pub async fn mark_read(pool: &SqlitePool, id: &str) -> AppResult<Option<Notification>> {
        let row = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET is_read = 1
            WHERE id = ?
            RETURNING id, gm_id, notification_type, title, message, event_data,
                      is_read, created_at
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(AppError::Database)?;

        Ok(row)
    }

    pub async fn mark_all_read(pool: &SqlitePool, gm_id: &str) -> AppResult<u64> {
        let res = sqlx::query("UPDATE notifications SET is_read = 1 WHERE gm_id = ? AND is_read = 0")
            .bind(gm_id)
            .execute(pool)
            .await
            .map_err(AppError::Database)?;

        Ok(res.rows_affected())
    }

    /// Counts per notification type for one GM (stats endpoint).
    pub async fn counts_by_type(
        pool: &SqlitePool,
        gm_id: &str,
    ) -> AppResult<HashMap<String, i64>> {
        let rows = sqlx::query(
            r#"
            SELECT notification_type, COUNT(*) AS count
            FROM notifications
            WHERE gm_id = ?
            GROUP BY notification_type
            "#,
        )
        .bind(gm_id)
        .fetch_all(pool)
        .await
        .map_err(AppError::Database)?;

        let mut counts = HashMap::new();
        for row in rows {
            counts.insert(row.get("notification_type"), row.get("count"));
        }

        Ok(counts)
    }
}
