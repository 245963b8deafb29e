use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A catalog game.
///
/// `average_duration` (minutes) pre-fills the duration of events matched to
/// this game. `minimum_break_minutes` is the minimum gap required between two
/// assignments of this game for the same GM.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Game {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub average_duration: i64,
    pub minimum_break_minutes: i64,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGame {
    pub name: String,
    pub category: Option<String>,
    pub location: Option<String>,
    pub average_duration: Option<i64>,
    pub minimum_break_minutes: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateGame {
    pub name: Option<String>,
    pub category: Option<String>,
    pub location: Option<String>,
    pub average_duration: Option<i64>,
    pub minimum_break_minutes: Option<i64>,
    pub is_active: Option<bool>,
}

/// Maps a booking-title pattern to a catalog game. Patterns are matched as
/// case-insensitive substrings of event titles; among several matches the
/// longest pattern wins.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GameMapping {
    pub id: String,
    pub event_name_pattern: String,
    pub game_id: String,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameMapping {
    pub event_name_pattern: String,
    pub game_id: String,
}

/// Row of the matcher catalog: an active mapping joined with its game.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MappingCatalogEntry {
    pub event_name_pattern: String,
    pub game_id: String,
    pub game_name: String,
    pub average_duration: i64,
    pub minimum_break_minutes: i64,
}
