use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Proficiency of a GM on one game. Level 0 means "not declared"; anything
/// above zero makes the GM a candidate for auto-assignment on that game.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GmCompetency {
    pub id: String,
    pub gm_id: String,
    pub game_id: String,
    pub competency_level: i64,
    pub training_date: Option<NaiveDate>,
    pub notes: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertCompetency {
    pub competency_level: i64,
    pub training_date: Option<NaiveDate>,
    pub notes: Option<String>,
}
