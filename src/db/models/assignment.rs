use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One GM assigned to one activity.
///
/// `assignment_order` is a 1-based rank in order of addition; order 1 is the
/// primary GM. Orders are never renumbered: when an earlier entry is removed,
/// the engine promotes the surviving row with the lowest order instead.
/// (activity_id, gm_id) is unique at the storage layer.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventAssignment {
    pub id: String,
    pub activity_id: String,
    pub gm_id: String,
    pub assignment_order: i64,
    pub status: String,
    pub created_at: NaiveDateTime,
}
