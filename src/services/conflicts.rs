use chrono::{NaiveDate, NaiveTime};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::{ActivityRepository, AvailabilityRepository, GameRepository};
use crate::error::AppResult;

/// Slot token meaning "available all day".
pub const FULL_DAY_SLOT: &str = "toute-la-journee";
/// Any slot token containing this marker means "unavailable".
pub const UNAVAILABLE_TAG: &str = "indisponible";

/// Outcome of the declared-availability test. Advisory: only overlaps and
/// break violations set `has_conflict`; a GM without declared availability
/// can still be force-assigned with a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AvailabilityStatus {
    /// Declared available all day.
    Full,
    /// A declared slot covers the event window.
    Compatible,
    /// No availability row for that date.
    NotDeclared,
    /// Declared unavailable.
    Unavailable,
    /// Declared slots do not cover the event window.
    Incompatible,
}

impl AvailabilityStatus {
    pub fn is_compatible(&self) -> bool {
        matches!(self, AvailabilityStatus::Full | AvailabilityStatus::Compatible)
    }
}

/// Another same-day assignment whose time window intersects the candidate's.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleConflict {
    pub activity_id: String,
    pub title: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// A same-day assignment closer than the game's minimum break.
#[derive(Debug, Clone, Serialize)]
pub struct BreakViolation {
    pub activity_id: String,
    pub title: String,
    pub gap_minutes: i64,
    pub required_minutes: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConflictReport {
    pub has_conflict: bool,
    pub availability: AvailabilityStatus,
    pub conflicts: Vec<ScheduleConflict>,
    pub minimum_break_violations: Vec<BreakViolation>,
}

/// Parse a `"HH:MM-HH:MM"` slot token. Tokens that are not a time range
/// (`"toute-la-journee"`, `"indisponible-..."`) parse to None.
pub fn parse_slot(token: &str) -> Option<(NaiveTime, NaiveTime)> {
    let (start, end) = token.split_once('-')?;
    let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
    let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
    Some((start, end))
}

/// Half-open interval intersection: [a_start, a_end) ∩ [b_start, b_end) ≠ ∅.
pub fn intervals_overlap(
    a_start: NaiveTime,
    a_end: NaiveTime,
    b_start: NaiveTime,
    b_end: NaiveTime,
) -> bool {
    a_start < b_end && b_start < a_end
}

/// Classify declared slots against an event window.
pub fn availability_status(
    slots: &[String],
    start: NaiveTime,
    end: NaiveTime,
) -> AvailabilityStatus {
    if slots
        .iter()
        .any(|s| s.to_lowercase().contains(UNAVAILABLE_TAG))
    {
        return AvailabilityStatus::Unavailable;
    }

    if slots.iter().any(|s| s == FULL_DAY_SLOT) {
        return AvailabilityStatus::Full;
    }

    for slot in slots {
        if let Some((slot_start, slot_end)) = parse_slot(slot) {
            // Exact slot label or full containment of the event window.
            if start >= slot_start && end <= slot_end {
                return AvailabilityStatus::Compatible;
            }
        }
    }

    AvailabilityStatus::Incompatible
}

/// Check a candidate (GM, event window) for availability, schedule overlaps
/// and minimum-break violations.
///
/// `game_id` enables the break test when it resolves to a game with
/// `minimum_break_minutes > 0`; `exclude_activity_id` removes the event being
/// edited from the comparison set.
pub async fn check_gm_availability_conflicts(
    pool: &SqlitePool,
    gm_id: &str,
    date: NaiveDate,
    start: NaiveTime,
    end: NaiveTime,
    game_id: Option<&str>,
    exclude_activity_id: Option<&str>,
) -> AppResult<ConflictReport> {
    let availability = match AvailabilityRepository::find_for_date(pool, gm_id, date).await? {
        Some(row) => availability_status(&row.slots(), start, end),
        None => AvailabilityStatus::NotDeclared,
    };

    let others =
        ActivityRepository::find_assigned_for_gm_on_date(pool, gm_id, date, exclude_activity_id)
            .await?;

    let mut conflicts = Vec::new();
    for other in &others {
        if intervals_overlap(start, end, other.start_time, other.end_time) {
            conflicts.push(ScheduleConflict {
                activity_id: other.id.clone(),
                title: other.title.clone(),
                start_time: other.start_time,
                end_time: other.end_time,
            });
        }
    }

    let mut minimum_break_violations = Vec::new();
    if let Some(game_id) = game_id {
        if let Some(game) = GameRepository::find_by_id(pool, game_id).await? {
            if game.minimum_break_minutes > 0 {
                for other in &others {
                    // Overlapping pairs are already reported as conflicts.
                    if intervals_overlap(start, end, other.start_time, other.end_time) {
                        continue;
                    }
                    let gap = if other.end_time <= start {
                        (start - other.end_time).num_minutes()
                    } else {
                        (other.start_time - end).num_minutes()
                    };
                    if gap < game.minimum_break_minutes {
                        minimum_break_violations.push(BreakViolation {
                            activity_id: other.id.clone(),
                            title: other.title.clone(),
                            gap_minutes: gap,
                            required_minutes: game.minimum_break_minutes,
                        });
                    }
                }
            }
        }
    }

    let has_conflict = !conflicts.is_empty() || !minimum_break_violations.is_empty();

    Ok(ConflictReport {
        has_conflict,
        availability,
        conflicts,
        minimum_break_violations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CreateGame, CreateGameMaster, NewActivity};
    use crate::db::{
        AssignmentRepository, AvailabilityRepository, GameMasterRepository, GameRepository,
    };
    use sqlx::SqlitePool;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn seed_gm(pool: &SqlitePool, name: &str) -> String {
        GameMasterRepository::create(
            pool,
            CreateGameMaster {
                name: name.to_string(),
                email: format!("{name}@center.test"),
                phone: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    async fn seed_activity(
        pool: &SqlitePool,
        title: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        game_id: Option<&str>,
    ) -> String {
        ActivityRepository::create(
            pool,
            NewActivity {
                title: title.to_string(),
                date,
                start_time: start,
                end_time: end,
                duration: (end - start).num_minutes(),
                activity_type: "gaming".to_string(),
                game_id: game_id.map(str::to_string),
                admin_notes: None,
                description: None,
                source: "manual".to_string(),
                external_ref: None,
            },
        )
        .await
        .unwrap()
        .id
    }

    #[test]
    fn parses_free_form_slots() {
        assert_eq!(parse_slot("09:00-12:00"), Some((t(9, 0), t(12, 0))));
        assert_eq!(parse_slot("18:00-21:00"), Some((t(18, 0), t(21, 0))));
        assert_eq!(parse_slot(FULL_DAY_SLOT), None);
        assert_eq!(parse_slot("indisponible-toute-la-journee"), None);
    }

    #[test]
    fn overlap_predicate_is_half_open() {
        // Back-to-back events do not overlap.
        assert!(!intervals_overlap(t(10, 0), t(12, 0), t(12, 0), t(13, 0)));
        assert!(intervals_overlap(t(10, 0), t(12, 0), t(11, 0), t(13, 0)));
        assert!(intervals_overlap(t(10, 0), t(12, 0), t(9, 0), t(13, 0)));
        assert!(!intervals_overlap(t(10, 0), t(11, 0), t(12, 0), t(13, 0)));
    }

    #[test]
    fn full_day_declaration_is_always_compatible() {
        let slots = vec![FULL_DAY_SLOT.to_string()];
        assert_eq!(
            availability_status(&slots, t(9, 0), t(23, 0)),
            AvailabilityStatus::Full
        );
    }

    #[test]
    fn unavailable_tag_wins_over_other_slots() {
        let slots = vec![
            "09:00-12:00".to_string(),
            "indisponible-toute-la-journee".to_string(),
        ];
        assert_eq!(
            availability_status(&slots, t(9, 0), t(10, 0)),
            AvailabilityStatus::Unavailable
        );
    }

    #[test]
    fn contained_window_is_compatible() {
        let slots = vec!["14:00-18:00".to_string()];
        assert_eq!(
            availability_status(&slots, t(15, 0), t(16, 30)),
            AvailabilityStatus::Compatible
        );
        // Exact label match.
        assert_eq!(
            availability_status(&slots, t(14, 0), t(18, 0)),
            AvailabilityStatus::Compatible
        );
        // Sticking out on either side is not.
        assert_eq!(
            availability_status(&slots, t(13, 0), t(15, 0)),
            AvailabilityStatus::Incompatible
        );
    }

    #[tokio::test]
    async fn overlapping_assignment_is_reported() {
        let pool = crate::db::testing::pool().await;
        let gm = seed_gm(&pool, "alex").await;
        let date = d(2025, 1, 10);

        let event_a = seed_activity(&pool, "Event A", date, t(10, 0), t(12, 0), None).await;
        AssignmentRepository::insert(&pool, &event_a, &gm, 1)
            .await
            .unwrap();

        let report =
            check_gm_availability_conflicts(&pool, &gm, date, t(11, 0), t(13, 0), None, None)
                .await
                .unwrap();

        assert!(report.has_conflict);
        assert_eq!(report.conflicts.len(), 1);
        assert_eq!(report.conflicts[0].title, "Event A");
        assert_eq!(report.availability, AvailabilityStatus::NotDeclared);
    }

    #[tokio::test]
    async fn minimum_break_violation_is_reported() {
        let pool = crate::db::testing::pool().await;
        let gm = seed_gm(&pool, "sam").await;
        let date = d(2025, 1, 10);

        let game = GameRepository::create(
            &pool,
            CreateGame {
                name: "Zero Gravity".into(),
                category: None,
                location: None,
                average_duration: Some(60),
                minimum_break_minutes: Some(30),
            },
        )
        .await
        .unwrap();

        let earlier =
            seed_activity(&pool, "Morning run", date, t(11, 0), t(12, 0), Some(&game.id)).await;
        AssignmentRepository::insert(&pool, &earlier, &gm, 1)
            .await
            .unwrap();

        // Candidate starts 15 minutes after the earlier event ends.
        let report = check_gm_availability_conflicts(
            &pool,
            &gm,
            date,
            t(12, 15),
            t(13, 15),
            Some(&game.id),
            None,
        )
        .await
        .unwrap();

        assert!(report.has_conflict);
        assert!(report.conflicts.is_empty());
        assert_eq!(report.minimum_break_violations.len(), 1);
        assert_eq!(report.minimum_break_violations[0].gap_minutes, 15);
        assert_eq!(report.minimum_break_violations[0].required_minutes, 30);
    }

    #[tokio::test]
    async fn sufficient_break_passes() {
        let pool = crate::db::testing::pool().await;
        let gm = seed_gm(&pool, "lea").await;
        let date = d(2025, 1, 10);

        let game = GameRepository::create(
            &pool,
            CreateGame {
                name: "Zero Gravity".into(),
                category: None,
                location: None,
                average_duration: Some(60),
                minimum_break_minutes: Some(30),
            },
        )
        .await
        .unwrap();

        let earlier =
            seed_activity(&pool, "Morning run", date, t(9, 0), t(10, 0), Some(&game.id)).await;
        AssignmentRepository::insert(&pool, &earlier, &gm, 1)
            .await
            .unwrap();

        let report = check_gm_availability_conflicts(
            &pool,
            &gm,
            date,
            t(11, 0),
            t(12, 0),
            Some(&game.id),
            None,
        )
        .await
        .unwrap();

        assert!(!report.has_conflict);
        assert!(report.minimum_break_violations.is_empty());
    }

    #[tokio::test]
    async fn excluded_activity_is_ignored() {
        let pool = crate::db::testing::pool().await;
        let gm = seed_gm(&pool, "nina").await;
        let date = d(2025, 1, 10);

        let event = seed_activity(&pool, "Self", date, t(10, 0), t(12, 0), None).await;
        AssignmentRepository::insert(&pool, &event, &gm, 1)
            .await
            .unwrap();

        // Re-checking the event against itself must not self-conflict.
        let report = check_gm_availability_conflicts(
            &pool,
            &gm,
            date,
            t(10, 0),
            t(12, 0),
            None,
            Some(event.as_str()),
        )
        .await
        .unwrap();

        assert!(!report.has_conflict);
    }

    #[tokio::test]
    async fn declared_full_day_reports_full_status() {
        let pool = crate::db::testing::pool().await;
        let gm = seed_gm(&pool, "theo").await;
        let date = d(2025, 1, 10);

        AvailabilityRepository::upsert(&pool, &gm, date, &[FULL_DAY_SLOT.to_string()])
            .await
            .unwrap();

        let report =
            check_gm_availability_conflicts(&pool, &gm, date, t(9, 0), t(21, 0), None, None)
                .await
                .unwrap();

        assert_eq!(report.availability, AvailabilityStatus::Full);
        assert!(!report.has_conflict);
    }
}
