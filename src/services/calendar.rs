use std::collections::HashSet;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use serde::Deserialize;
use tracing::{info, warn};

use crate::db::models::{ActivityStatus, ActivityType, NewActivity};
use crate::db::ActivityRepository;
use crate::error::{AppError, AppResult};
use crate::services::assignments::AssignmentService;
use crate::services::cache::ViewKey;
use crate::services::matcher;
use crate::AppState;

/// One event of the external planner feed (calendar/automation service).
#[derive(Debug, Clone, Deserialize)]
pub struct PlannerEvent {
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cancelled: bool,
}

/// Planner sync manager:
///
/// - Pulls the JSON feed of the external calendar/automation service.
/// - Upserts activities keyed by `external_ref` with `source='external-sync'`,
///   resolving the game (and duration default) through the matcher.
/// - Emits `modified` notifications to assigned GMs when a synced event's
///   schedule changes, and cancels events that disappeared from the feed
///   (with `cancelled` notifications).
pub struct CalendarSyncManager;

impl CalendarSyncManager {
    /// Run one full sync cycle. Returns the number of feed events applied.
    pub async fn sync_all(state: &Arc<AppState>) -> AppResult<usize> {
        let Some(feed_url) = state.config.planner.feed_url.clone() else {
            info!("Planner feed not configured; skipping sync");
            return Ok(0);
        };

        let events = Self::fetch_feed(state, &feed_url).await?;
        info!("Planner feed returned {} event(s)", events.len());

        let mut seen_refs: HashSet<String> = HashSet::new();
        let mut applied = 0usize;

        for event in &events {
            seen_refs.insert(event.id.clone());
            match Self::apply_event(state, event).await {
                Ok(_) => applied += 1,
                Err(e) => warn!("Failed to apply planner event {}: {:?}", event.id, e),
            }
        }

        // Events that vanished from the feed are cancelled, with
        // notifications to their assigned GMs.
        let live = ActivityRepository::list_live_synced(&state.db).await?;
        for activity in live {
            let Some(external_ref) = activity.external_ref.as_ref() else {
                continue;
            };
            if seen_refs.contains(external_ref) {
                continue;
            }

            let assignments = AssignmentService::new(state);
            if let Err(e) = assignments
                .cancel(&activity.id, ActivityStatus::Cancelled)
                .await
            {
                warn!(
                    "Failed to cancel vanished planner event {}: {:?}",
                    activity.id, e
                );
            } else {
                info!("Cancelled activity {} (gone from planner feed)", activity.id);
            }
        }

        state
            .views
            .invalidate(&[ViewKey::ActivityList, ViewKey::UnassignedActivities])
            .await;

        Ok(applied)
    }

    async fn fetch_feed(state: &Arc<AppState>, feed_url: &str) -> AppResult<Vec<PlannerEvent>> {
        let client = reqwest::Client::new();
        let mut request = client.get(feed_url);
        if let Some(api_key) = &state.config.planner.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(AppError::PlannerSync(format!(
                "Feed request failed with status {}",
                response.status()
            )));
        }

        let events = response.json::<Vec<PlannerEvent>>().await?;
        Ok(events)
    }

    /// Upsert one feed event into the activities table.
    async fn apply_event(state: &Arc<AppState>, event: &PlannerEvent) -> AppResult<()> {
        let existing = ActivityRepository::find_by_external_ref(&state.db, &event.id).await?;

        if event.cancelled {
            if let Some(activity) = existing {
                if activity.status != ActivityStatus::Cancelled.as_str() {
                    AssignmentService::new(state)
                        .cancel(&activity.id, ActivityStatus::Cancelled)
                        .await?;
                }
            }
            return Ok(());
        }

        let start_time = parse_feed_time(&event.start_time).ok_or_else(|| {
            AppError::PlannerSync(format!("Unparsable start_time '{}'", event.start_time))
        })?;
        let end_time = parse_feed_time(&event.end_time).ok_or_else(|| {
            AppError::PlannerSync(format!("Unparsable end_time '{}'", event.end_time))
        })?;

        match existing {
            None => {
                let game_match =
                    matcher::match_title(&state.db, &state.mappings, &event.title).await?;
                let duration = game_match
                    .average_duration
                    .unwrap_or_else(|| (end_time - start_time).num_minutes());

                ActivityRepository::create(
                    &state.db,
                    NewActivity {
                        title: event.title.clone(),
                        date: event.date,
                        start_time,
                        end_time,
                        duration,
                        activity_type: ActivityType::Gaming.as_str().to_string(),
                        game_id: game_match.game_id,
                        admin_notes: None,
                        description: event.description.clone(),
                        source: "external-sync".to_string(),
                        external_ref: Some(event.id.clone()),
                    },
                )
                .await?;
            }
            Some(activity) => {
                let changed = activity.title != event.title
                    || activity.date != event.date
                    || activity.start_time != start_time
                    || activity.end_time != end_time
                    || activity.description != event.description;
                if !changed {
                    return Ok(());
                }

                let duration = (end_time - start_time).num_minutes();
                let updated = ActivityRepository::update_schedule(
                    &state.db,
                    &activity.id,
                    &event.title,
                    event.date,
                    start_time,
                    end_time,
                    duration,
                    event.description.as_deref(),
                )
                .await?;

                if updated.is_assigned {
                    AssignmentService::new(state).notify_modified(&updated).await?;
                }
            }
        }

        Ok(())
    }
}

/// Parse a feed time of day, tolerating both "HH:MM" and "HH:MM:SS".
fn parse_feed_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CreateGameMaster, EventAssignment};
    use crate::db::{AssignmentRepository, GameMasterRepository, NotificationRepository};

    fn feed_event(id: &str, title: &str, start: &str, end: &str) -> PlannerEvent {
        PlannerEvent {
            id: id.to_string(),
            title: title.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 10).unwrap(),
            start_time: start.to_string(),
            end_time: end.to_string(),
            description: None,
            cancelled: false,
        }
    }

    #[test]
    fn feed_times_parse_both_shapes() {
        assert_eq!(
            parse_feed_time("09:30"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(
            parse_feed_time("09:30:00"),
            NaiveTime::from_hms_opt(9, 30, 0)
        );
        assert_eq!(parse_feed_time("journée"), None);
    }

    #[tokio::test]
    async fn new_feed_event_creates_synced_activity() {
        let state = crate::services::testing::state().await;

        CalendarSyncManager::apply_event(
            &state,
            &feed_event("ext-1", "Session découverte", "14:00", "15:00"),
        )
        .await
        .unwrap();

        let activity = ActivityRepository::find_by_external_ref(&state.db, "ext-1")
            .await
            .unwrap()
            .expect("activity created");
        assert_eq!(activity.source, "external-sync");
        assert_eq!(activity.status, "pending");
        assert_eq!(activity.duration, 60);
    }

    #[tokio::test]
    async fn reschedule_notifies_assigned_gms() {
        let state = crate::services::testing::state().await;

        CalendarSyncManager::apply_event(
            &state,
            &feed_event("ext-1", "Session découverte", "14:00", "15:00"),
        )
        .await
        .unwrap();
        let activity = ActivityRepository::find_by_external_ref(&state.db, "ext-1")
            .await
            .unwrap()
            .unwrap();

        let gm = GameMasterRepository::create(
            &state.db,
            CreateGameMaster {
                name: "Alex".into(),
                email: "alex@center.test".into(),
                phone: None,
            },
        )
        .await
        .unwrap();
        crate::services::assignments::AssignmentService::new(&state)
            .assign_primary(&activity.id, &gm.id)
            .await
            .unwrap();

        // Feed moves the event by one hour.
        CalendarSyncManager::apply_event(
            &state,
            &feed_event("ext-1", "Session découverte", "15:00", "16:00"),
        )
        .await
        .unwrap();

        let updated = ActivityRepository::find_by_external_ref(&state.db, "ext-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            updated.start_time,
            NaiveTime::from_hms_opt(15, 0, 0).unwrap()
        );
        // Assignments survive a reschedule.
        let assignments: Vec<EventAssignment> =
            AssignmentRepository::find_by_activity(&state.db, &updated.id)
                .await
                .unwrap();
        assert_eq!(assignments.len(), 1);

        let notifications = NotificationRepository::find_by_gm(&state.db, &gm.id, 10, 0, false)
            .await
            .unwrap();
        assert!(notifications.iter().any(|n| n.notification_type == "modified"));
    }

    #[tokio::test]
    async fn cancelled_feed_event_cancels_activity() {
        let state = crate::services::testing::state().await;

        CalendarSyncManager::apply_event(
            &state,
            &feed_event("ext-1", "Session découverte", "14:00", "15:00"),
        )
        .await
        .unwrap();

        let mut cancelled = feed_event("ext-1", "Session découverte", "14:00", "15:00");
        cancelled.cancelled = true;
        CalendarSyncManager::apply_event(&state, &cancelled)
            .await
            .unwrap();

        let activity = ActivityRepository::find_by_external_ref(&state.db, "ext-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(activity.status, "cancelled");
    }
}
