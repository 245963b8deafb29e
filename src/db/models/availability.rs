use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Declared availability of a GM for one date. At most one row per
/// (gm_id, date); re-declaring a date overwrites the previous row.
///
/// `time_slots` is a JSON array of slot tokens: `"toute-la-journee"`,
/// `"indisponible-toute-la-journee"`, a fixed label like `"09:00-12:00"`,
/// or a free-form `"HH:MM-HH:MM"` range.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct GmAvailability {
    pub id: String,
    pub gm_id: String,
    pub date: NaiveDate,
    pub time_slots: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl GmAvailability {
    /// Decode the stored JSON array. Malformed rows decode to an empty list
    /// rather than failing the caller.
    pub fn slots(&self) -> Vec<String> {
        serde_json::from_str(&self.time_slots).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpsertAvailability {
    pub time_slots: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn slots_decodes_json_array() {
        let now = Utc::now().naive_utc();
        let row = GmAvailability {
            id: "a".into(),
            gm_id: "gm".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            time_slots: r#"["09:00-12:00","14:00-18:00"]"#.into(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(row.slots(), vec!["09:00-12:00", "14:00-18:00"]);
    }

    #[test]
    fn malformed_slots_decode_to_empty() {
        let now = Utc::now().naive_utc();
        let row = GmAvailability {
            id: "a".into(),
            gm_id: "gm".into(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            time_slots: "not-json".into(),
            created_at: now,
            updated_at: now,
        };
        assert!(row.slots().is_empty());
    }
}
