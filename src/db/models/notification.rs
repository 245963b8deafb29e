use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// In-app notification for a GM. Created as a side effect of assignment
/// state changes and planner sync; never mutated afterwards except `is_read`.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub gm_id: String,
    /// 'assignment', 'modified', 'cancelled' or 'unassigned'.
    pub notification_type: String,
    pub title: String,
    pub message: String,
    /// JSON snapshot of the activity at dispatch time.
    pub event_data: Option<String>,
    pub is_read: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotification {
    pub gm_id: String,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub event_data: Option<String>,
}

/// Represents a queued email delivery task.
///
/// Each record corresponds to an email that should be sent (or retried) by
/// the background worker using exponential backoff. The rendered subject and
/// body are stored so retransmits stay consistent even if catalogs or
/// templates change later.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EmailTask {
    /// Primary key (UUID)
    pub id: String,

    /// Optional reference to the in-app notification this email mirrors.
    pub notification_id: Option<String>,

    /// Recipient GM id (references `game_masters.id`)
    pub gm_id: String,

    /// Recipient email address, captured at enqueue time.
    pub recipient: String,

    pub subject: String,
    pub body: String,

    /// JSON snapshot of the activity, forwarded to the mail function.
    pub event_data: Option<String>,

    /// Number of attempts already made.
    pub attempts: i64,

    /// Maximum attempts permitted before moving the task to DLQ.
    pub max_attempts: i64,

    /// Timestamp when the task becomes eligible for the next attempt.
    pub next_attempt_at: NaiveDateTime,

    /// Last error message observed when an attempt failed (if any).
    pub last_error: Option<String>,

    /// Task status: 'pending', 'processing', 'succeeded', 'dead' (DLQ)
    pub status: String,

    /// Optional expiration timestamp (TTL). If present and <= now, the worker
    /// treats the task as expired.
    pub expires_at: Option<NaiveDateTime>,

    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Data required to enqueue a new email task. `max_attempts`,
/// `next_attempt_at` and `expires_at` are optional and defaulted by the
/// repository when omitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateEmailTask {
    pub notification_id: Option<String>,
    pub gm_id: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub event_data: Option<String>,
    pub max_attempts: Option<i64>,
    pub next_attempt_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
}
