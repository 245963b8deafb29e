use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// An event on the center's planning board (a game session, a training slot,
/// a maintenance window, ...).
///
/// `is_assigned` and `assigned_gm_id` are denormalized from the
/// `event_assignments` table and kept in sync by the assignment service:
/// `is_assigned` is true iff at least one assignment row exists, and
/// `assigned_gm_id` always carries the GM with the lowest assignment order.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Duration in minutes.
    pub duration: i64,
    pub activity_type: String,
    pub status: String,
    pub is_assigned: bool,
    pub assigned_gm_id: Option<String>,
    pub game_id: Option<String>,
    pub admin_notes: Option<String>,
    pub description: Option<String>,
    /// 'manual' or 'external-sync'.
    pub source: String,
    /// Identifier of the event in the external planner feed, when synced.
    pub external_ref: Option<String>,
    pub assignment_date: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityStatus {
    Pending,
    Assigned,
    Confirmed,
    Cancelled,
    Deleted,
    Completed,
}

impl ActivityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Pending => "pending",
            ActivityStatus::Assigned => "assigned",
            ActivityStatus::Confirmed => "confirmed",
            ActivityStatus::Cancelled => "cancelled",
            ActivityStatus::Deleted => "deleted",
            ActivityStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityType {
    Gaming,
    Formation,
    Maintenance,
    Admin,
    ItWork,
    Cleaning,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Gaming => "gaming",
            ActivityType::Formation => "formation",
            ActivityType::Maintenance => "maintenance",
            ActivityType::Admin => "admin",
            ActivityType::ItWork => "it-work",
            ActivityType::Cleaning => "cleaning",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gaming" => Some(ActivityType::Gaming),
            "formation" => Some(ActivityType::Formation),
            "maintenance" => Some(ActivityType::Maintenance),
            "admin" => Some(ActivityType::Admin),
            "it-work" => Some(ActivityType::ItWork),
            "cleaning" => Some(ActivityType::Cleaning),
            _ => None,
        }
    }
}

/// Data required to create a new activity. `duration` may be omitted: the
/// caller defaults it to the matched game's average duration, falling back to
/// the start/end span.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateActivity {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration: Option<i64>,
    pub activity_type: Option<String>,
    pub game_id: Option<String>,
    pub admin_notes: Option<String>,
    pub description: Option<String>,
}

/// Fully resolved insert payload, built by the service layer once the game
/// match and the duration default have been applied.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub duration: i64,
    pub activity_type: String,
    pub game_id: Option<String>,
    pub admin_notes: Option<String>,
    pub description: Option<String>,
    pub source: String,
    pub external_ref: Option<String>,
}

/// Partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateActivity {
    pub title: Option<String>,
    pub date: Option<NaiveDate>,
    pub start_time: Option<NaiveTime>,
    pub end_time: Option<NaiveTime>,
    pub duration: Option<i64>,
    pub activity_type: Option<String>,
    pub game_id: Option<String>,
    pub admin_notes: Option<String>,
    pub description: Option<String>,
}

/// Best-effort extraction of booked options out of the free-text description.
///
/// The booking widget embeds selected add-ons as a text block:
///
/// ```text
/// Options:
/// - Casque supplémentaire
/// - Photo souvenir
/// ```
///
/// Display-only; no data integrity depends on this.
pub fn parse_description_options(description: &str) -> Vec<String> {
    let mut options = Vec::new();
    let mut in_block = false;

    for line in description.lines() {
        let trimmed = line.trim();
        if trimmed.to_lowercase().starts_with("options") && trimmed.ends_with(':') {
            in_block = true;
            continue;
        }
        if in_block {
            if let Some(rest) = trimmed.strip_prefix("- ").or_else(|| trimmed.strip_prefix("* ")) {
                if !rest.is_empty() {
                    options.push(rest.to_string());
                }
                continue;
            }
            // First non-bullet line ends the block.
            in_block = false;
        }
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_option_block() {
        let desc = "Anniversaire de Léo\n\nOptions:\n- Casque supplémentaire\n- Photo souvenir\n\nMerci d'avance";
        assert_eq!(
            parse_description_options(desc),
            vec![
                "Casque supplémentaire".to_string(),
                "Photo souvenir".to_string()
            ]
        );
    }

    #[test]
    fn no_options_block_yields_empty() {
        assert!(parse_description_options("Session classique, 4 joueurs").is_empty());
    }

    #[test]
    fn block_ends_at_first_non_bullet_line() {
        let desc = "Options:\n- A\nnote libre\n- B";
        assert_eq!(parse_description_options(desc), vec!["A".to_string()]);
    }
}
