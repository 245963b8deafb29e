use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;

use crate::db::models::{Activity, ActivityStatus, GameMaster};
use crate::db::{
    ActivityRepository, AssignmentRepository, CompetencyRepository, GameMasterRepository,
};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::conflicts::{self, ConflictReport};
use crate::services::matcher;
use crate::services::notifications::{
    GmNotificationType, NotificationRequest, NotificationService,
};
use crate::AppState;

/// Result of a successful assignment mutation: the refreshed activity and a
/// human-readable summary for the console.
#[derive(Debug)]
pub struct AssignmentOutcome {
    pub activity: Activity,
    pub message: String,
}

/// A ranked auto-assignment candidate with its conflict report.
#[derive(Debug)]
pub struct Candidate {
    pub gm: GameMaster,
    pub competency_level: i64,
    pub same_day_assignments: usize,
    pub report: ConflictReport,
}

impl Candidate {
    pub fn is_eligible(&self) -> bool {
        !self.report.has_conflict && self.report.availability.is_compatible()
    }
}

/// The assignment engine.
///
/// Keeps the denormalized activity fields consistent with the assignment
/// rows: `is_assigned` is true iff at least one row exists, and
/// `assigned_gm_id` always carries the GM with the lowest order. Both writes
/// of every operation run in one transaction; conflict checking stays
/// advisory and is the route layer's concern.
pub struct AssignmentService {
    pool: SqlitePool,
    state: Arc<AppState>,
}

impl AssignmentService {
    pub fn new(state: &Arc<AppState>) -> Self {
        Self {
            pool: state.db.clone(),
            state: state.clone(),
        }
    }

    /// Assign the first GM to an unassigned event (order 1, primary).
    pub async fn assign_primary(
        &self,
        activity_id: &str,
        gm_id: &str,
    ) -> AppResult<AssignmentOutcome> {
        let activity = self.require_activity(activity_id).await?;
        let gm = self.require_gm(gm_id).await?;

        let existing = AssignmentRepository::find_by_activity(&self.pool, activity_id).await?;
        if !existing.is_empty() {
            return Err(AppError::Validation(i18n::t("assignment.has_assignments")));
        }

        let now = Utc::now().naive_utc();
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        AssignmentRepository::insert(&mut *tx, activity_id, gm_id, 1).await?;
        ActivityRepository::set_assignment_state(
            &mut *tx,
            activity_id,
            true,
            ActivityStatus::Assigned.as_str(),
            Some(gm_id),
            Some(now),
        )
        .await?;
        tx.commit().await.map_err(AppError::Database)?;

        self.state.views.invalidate_activity_views(activity_id).await;

        let activity = self.require_activity(activity_id).await?;
        self.notify(&gm, &activity, GmNotificationType::Assignment)
            .await;

        tracing::info!(
            "Assigned GM {} as primary on activity {}",
            gm.id,
            activity.id
        );

        Ok(AssignmentOutcome {
            activity,
            message: i18n::t_with("assignment.assigned_to", &[("name", gm.name.as_str())]),
        })
    }

    /// Add another GM to an already-assigned event (next order).
    pub async fn add_secondary(
        &self,
        activity_id: &str,
        gm_id: &str,
    ) -> AppResult<AssignmentOutcome> {
        let activity = self.require_activity(activity_id).await?;
        let gm = self.require_gm(gm_id).await?;

        let existing = AssignmentRepository::find_by_activity(&self.pool, activity_id).await?;
        if existing.iter().any(|a| a.gm_id == gm_id) {
            return Err(AppError::Validation(i18n::t("assignment.already_assigned")));
        }

        let next_order = existing.iter().map(|a| a.assignment_order).max().unwrap_or(0) + 1;

        // Defensive: if the table was actually empty this IS the primary.
        let primary_gm_id = if existing.is_empty() {
            gm_id.to_string()
        } else {
            activity
                .assigned_gm_id
                .clone()
                .unwrap_or_else(|| existing[0].gm_id.clone())
        };
        let assignment_date = if existing.is_empty() {
            Some(Utc::now().naive_utc())
        } else {
            activity.assignment_date
        };

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        AssignmentRepository::insert(&mut *tx, activity_id, gm_id, next_order).await?;
        ActivityRepository::set_assignment_state(
            &mut *tx,
            activity_id,
            true,
            ActivityStatus::Assigned.as_str(),
            Some(primary_gm_id.as_str()),
            assignment_date,
        )
        .await?;
        tx.commit().await.map_err(AppError::Database)?;

        self.state.views.invalidate_activity_views(activity_id).await;

        let activity = self.require_activity(activity_id).await?;
        self.notify(&gm, &activity, GmNotificationType::Assignment)
            .await;

        tracing::info!(
            "Added GM {} on activity {} with order {}",
            gm.id,
            activity.id,
            next_order
        );

        Ok(AssignmentOutcome {
            activity,
            message: i18n::t_with("assignment.secondary_added", &[("name", gm.name.as_str())]),
        })
    }

    /// Remove one GM from an event. Removing the last GM resets the event to
    /// pending; removing the recorded primary promotes the survivor with the
    /// lowest order (orders are never renumbered).
    pub async fn unassign_one(
        &self,
        activity_id: &str,
        gm_id: &str,
    ) -> AppResult<AssignmentOutcome> {
        let activity = self.require_activity(activity_id).await?;
        let gm = self.require_gm(gm_id).await?;

        let existing = AssignmentRepository::find_by_activity(&self.pool, activity_id).await?;
        if !existing.iter().any(|a| a.gm_id == gm_id) {
            return Err(AppError::NotFound(i18n::t("assignment.not_assigned")));
        }

        let survivors: Vec<_> = existing.iter().filter(|a| a.gm_id != gm_id).collect();

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        AssignmentRepository::delete_one(&mut *tx, activity_id, gm_id).await?;
        if survivors.is_empty() {
            ActivityRepository::set_assignment_state(
                &mut *tx,
                activity_id,
                false,
                ActivityStatus::Pending.as_str(),
                None,
                None,
            )
            .await?;
        } else if activity.assigned_gm_id.as_deref() == Some(gm_id) {
            // `existing` is ordered by assignment_order, so the first
            // survivor is the promotion target.
            ActivityRepository::set_primary_gm(&mut *tx, activity_id, &survivors[0].gm_id).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;

        self.state.views.invalidate_activity_views(activity_id).await;

        let activity = self.require_activity(activity_id).await?;
        self.notify(&gm, &activity, GmNotificationType::Unassigned)
            .await;

        tracing::info!("Removed GM {} from activity {}", gm.id, activity.id);

        Ok(AssignmentOutcome {
            activity,
            message: i18n::t_with("assignment.removed", &[("name", gm.name.as_str())]),
        })
    }

    /// Remove every GM from an event and reset it to pending. Idempotent:
    /// calling it on an unassigned event leaves the same terminal state.
    pub async fn unassign_all(&self, activity_id: &str) -> AppResult<AssignmentOutcome> {
        let _ = self.require_activity(activity_id).await?;

        let existing = AssignmentRepository::find_by_activity(&self.pool, activity_id).await?;
        let removed_gms = self.resolve_gms(&existing).await?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        AssignmentRepository::delete_all(&mut *tx, activity_id).await?;
        ActivityRepository::set_assignment_state(
            &mut *tx,
            activity_id,
            false,
            ActivityStatus::Pending.as_str(),
            None,
            None,
        )
        .await?;
        tx.commit().await.map_err(AppError::Database)?;

        self.state.views.invalidate_activity_views(activity_id).await;

        let activity = self.require_activity(activity_id).await?;

        // Best-effort, independent per GM: one failure must not block the rest.
        let notifications = removed_gms
            .iter()
            .map(|gm| self.notify(gm, &activity, GmNotificationType::Unassigned));
        futures::future::join_all(notifications).await;

        tracing::info!(
            "Removed all {} assignment(s) from activity {}",
            removed_gms.len(),
            activity.id
        );

        Ok(AssignmentOutcome {
            activity,
            message: i18n::t("assignment.all_removed"),
        })
    }

    /// Cancel or delete an event: drop its assignments, set the final
    /// status and tell every previously assigned GM.
    pub async fn cancel(
        &self,
        activity_id: &str,
        final_status: ActivityStatus,
    ) -> AppResult<Activity> {
        let _ = self.require_activity(activity_id).await?;

        let existing = AssignmentRepository::find_by_activity(&self.pool, activity_id).await?;
        let removed_gms = self.resolve_gms(&existing).await?;

        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        AssignmentRepository::delete_all(&mut *tx, activity_id).await?;
        ActivityRepository::set_assignment_state(
            &mut *tx,
            activity_id,
            false,
            final_status.as_str(),
            None,
            None,
        )
        .await?;
        tx.commit().await.map_err(AppError::Database)?;

        self.state.views.invalidate_activity_views(activity_id).await;

        let activity = self.require_activity(activity_id).await?;

        let notifications = removed_gms
            .iter()
            .map(|gm| self.notify(gm, &activity, GmNotificationType::Cancelled));
        futures::future::join_all(notifications).await;

        Ok(activity)
    }

    /// Tell every assigned GM that the event's schedule changed.
    pub async fn notify_modified(&self, activity: &Activity) -> AppResult<()> {
        let assignments = AssignmentRepository::find_by_activity(&self.pool, &activity.id).await?;
        let gms = self.resolve_gms(&assignments).await?;

        let notifications = gms
            .iter()
            .map(|gm| self.notify(gm, activity, GmNotificationType::Modified));
        futures::future::join_all(notifications).await;

        Ok(())
    }

    /// Ranked candidates for an event: GMs competent on the matched game,
    /// each with their conflict report. Strongest competency first, same-day
    /// load as tie-breaker.
    pub async fn candidates(&self, activity_id: &str) -> AppResult<Vec<Candidate>> {
        let activity = self.require_activity(activity_id).await?;

        let game_id = match &activity.game_id {
            Some(id) => Some(id.clone()),
            None => {
                matcher::match_title(&self.pool, &self.state.mappings, &activity.title)
                    .await?
                    .game_id
            }
        };
        let Some(game_id) = game_id else {
            return Ok(Vec::new());
        };

        let competencies =
            CompetencyRepository::list_competent_for_game(&self.pool, &game_id).await?;

        let mut candidates = Vec::with_capacity(competencies.len());
        for competency in competencies {
            let Some(gm) = GameMasterRepository::find_by_id(&self.pool, &competency.gm_id).await?
            else {
                continue;
            };

            let report = conflicts::check_gm_availability_conflicts(
                &self.pool,
                &gm.id,
                activity.date,
                activity.start_time,
                activity.end_time,
                Some(game_id.as_str()),
                Some(activity.id.as_str()),
            )
            .await?;

            let same_day_assignments = ActivityRepository::find_assigned_for_gm_on_date(
                &self.pool,
                &gm.id,
                activity.date,
                Some(activity.id.as_str()),
            )
            .await?
            .len();

            candidates.push(Candidate {
                gm,
                competency_level: competency.competency_level,
                same_day_assignments,
                report,
            });
        }

        candidates.sort_by(|a, b| {
            b.competency_level
                .cmp(&a.competency_level)
                .then(a.same_day_assignments.cmp(&b.same_day_assignments))
        });

        Ok(candidates)
    }

    /// Pick the best eligible candidate and assign them as primary.
    pub async fn auto_assign(&self, activity_id: &str) -> AppResult<AssignmentOutcome> {
        let existing = AssignmentRepository::find_by_activity(&self.pool, activity_id).await?;
        if !existing.is_empty() {
            return Err(AppError::Validation(i18n::t("assignment.has_assignments")));
        }

        let candidates = self.candidates(activity_id).await?;
        let winner = candidates
            .into_iter()
            .find(Candidate::is_eligible)
            .ok_or_else(|| AppError::Validation(i18n::t("assignment.no_candidate")))?;

        let level = winner.competency_level.to_string();
        let outcome = self.assign_primary(activity_id, &winner.gm.id).await?;

        Ok(AssignmentOutcome {
            message: i18n::t_with(
                "assignment.auto_assigned",
                &[("name", winner.gm.name.as_str()), ("level", level.as_str())],
            ),
            ..outcome
        })
    }

    async fn require_activity(&self, activity_id: &str) -> AppResult<Activity> {
        ActivityRepository::find_by_id(&self.pool, activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.activity")))
    }

    async fn require_gm(&self, gm_id: &str) -> AppResult<GameMaster> {
        GameMasterRepository::find_by_id(&self.pool, gm_id)
            .await?
            .ok_or_else(|| AppError::NotFound(i18n::t("not_found.gm")))
    }

    async fn resolve_gms(
        &self,
        assignments: &[crate::db::models::EventAssignment],
    ) -> AppResult<Vec<GameMaster>> {
        let mut gms = Vec::with_capacity(assignments.len());
        for assignment in assignments {
            if let Some(gm) = GameMasterRepository::find_by_id(&self.pool, &assignment.gm_id).await?
            {
                gms.push(gm);
            }
        }
        Ok(gms)
    }

    /// Notification dispatch is fire-and-forget: the mutation has already
    /// committed, so failures are logged and swallowed.
    async fn notify(&self, gm: &GameMaster, activity: &Activity, ntype: GmNotificationType) {
        let service = NotificationService::new(&self.state);
        let result = service
            .dispatch(NotificationRequest::for_activity(gm, activity, ntype))
            .await;
        if !result.success {
            tracing::warn!(
                "Notification dispatch failed for GM {} on activity {}: {:?}",
                gm.id,
                activity.id,
                result.error
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{
        CreateGame, CreateGameMaster, NewActivity, UpsertCompetency,
    };
    use crate::db::{AvailabilityRepository, GameRepository, NotificationRepository};
    use chrono::{NaiveDate, NaiveTime};
    use sqlx::SqlitePool;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    async fn seed_gm(pool: &SqlitePool, name: &str) -> GameMaster {
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
    }

    async fn seed_activity(
        pool: &SqlitePool,
        title: &str,
        date: NaiveDate,
        start: NaiveTime,
        end: NaiveTime,
        game_id: Option<&str>,
    ) -> Activity {
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
    }

    /// is_assigned must equal "at least one assignment row exists", and the
    /// recorded primary must be the lowest-order row.
    async fn assert_invariants(pool: &SqlitePool, activity_id: &str) {
        let activity = ActivityRepository::find_by_id(pool, activity_id)
            .await
            .unwrap()
            .unwrap();
        let assignments = AssignmentRepository::find_by_activity(pool, activity_id)
            .await
            .unwrap();

        assert_eq!(activity.is_assigned, !assignments.is_empty());
        match assignments.first() {
            Some(first) => assert_eq!(activity.assigned_gm_id.as_deref(), Some(first.gm_id.as_str())),
            None => assert!(activity.assigned_gm_id.is_none()),
        }
    }

    #[tokio::test]
    async fn assign_primary_end_to_end() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm = seed_gm(&state.db, "alex").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        let outcome = service.assign_primary(&activity.id, &gm.id).await.unwrap();

        assert!(outcome.activity.is_assigned);
        assert_eq!(outcome.activity.status, "assigned");
        assert_eq!(outcome.activity.assigned_gm_id.as_deref(), Some(gm.id.as_str()));
        assert!(outcome.activity.assignment_date.is_some());
        assert!(outcome.message.contains("alex"));

        let assignments = AssignmentRepository::find_by_activity(&state.db, &activity.id)
            .await
            .unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].assignment_order, 1);

        // Exactly one 'assignment' notification queued for the GM.
        let notifications = NotificationRepository::find_by_gm(&state.db, &gm.id, 10, 0, false)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].notification_type, "assignment");

        assert_invariants(&state.db, &activity.id).await;
    }

    #[tokio::test]
    async fn assign_primary_rejected_when_assignments_exist() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm_a = seed_gm(&state.db, "alex").await;
        let gm_b = seed_gm(&state.db, "sam").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        service.assign_primary(&activity.id, &gm_a.id).await.unwrap();
        let err = service.assign_primary(&activity.id, &gm_b.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn add_secondary_rejects_duplicate_gm() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm = seed_gm(&state.db, "alex").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        service.assign_primary(&activity.id, &gm.id).await.unwrap();
        let err = service.add_secondary(&activity.id, &gm.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        assert_invariants(&state.db, &activity.id).await;
    }

    #[tokio::test]
    async fn secondary_orders_increment() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm_a = seed_gm(&state.db, "alex").await;
        let gm_b = seed_gm(&state.db, "sam").await;
        let gm_c = seed_gm(&state.db, "lea").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        service.assign_primary(&activity.id, &gm_a.id).await.unwrap();
        service.add_secondary(&activity.id, &gm_b.id).await.unwrap();
        service.add_secondary(&activity.id, &gm_c.id).await.unwrap();

        let assignments = AssignmentRepository::find_by_activity(&state.db, &activity.id)
            .await
            .unwrap();
        let orders: Vec<i64> = assignments.iter().map(|a| a.assignment_order).collect();
        assert_eq!(orders, vec![1, 2, 3]);

        assert_invariants(&state.db, &activity.id).await;
    }

    #[tokio::test]
    async fn add_secondary_on_empty_event_becomes_primary() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm = seed_gm(&state.db, "alex").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        // Defensive path: the UI normally routes first assignments through
        // assign_primary, but the engine must stay consistent either way.
        let outcome = service.add_secondary(&activity.id, &gm.id).await.unwrap();
        assert!(outcome.activity.is_assigned);
        assert_eq!(outcome.activity.assigned_gm_id.as_deref(), Some(gm.id.as_str()));
        assert!(outcome.activity.assignment_date.is_some());

        assert_invariants(&state.db, &activity.id).await;
    }

    #[tokio::test]
    async fn unassign_promotes_lowest_order_survivor() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm_a = seed_gm(&state.db, "alex").await;
        let gm_b = seed_gm(&state.db, "sam").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        service.assign_primary(&activity.id, &gm_a.id).await.unwrap();
        service.add_secondary(&activity.id, &gm_b.id).await.unwrap();

        let outcome = service.unassign_one(&activity.id, &gm_a.id).await.unwrap();

        assert!(outcome.activity.is_assigned);
        assert_eq!(outcome.activity.assigned_gm_id.as_deref(), Some(gm_b.id.as_str()));

        // Survivors keep their original order numbers.
        let assignments = AssignmentRepository::find_by_activity(&state.db, &activity.id)
            .await
            .unwrap();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].assignment_order, 2);

        // The removed GM got an 'unassigned' notification.
        let notifications = NotificationRepository::find_by_gm(&state.db, &gm_a.id, 10, 0, false)
            .await
            .unwrap();
        assert!(notifications
            .iter()
            .any(|n| n.notification_type == "unassigned"));

        assert_invariants(&state.db, &activity.id).await;
    }

    #[tokio::test]
    async fn unassign_last_gm_resets_event() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm = seed_gm(&state.db, "alex").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        service.assign_primary(&activity.id, &gm.id).await.unwrap();
        let outcome = service.unassign_one(&activity.id, &gm.id).await.unwrap();

        assert!(!outcome.activity.is_assigned);
        assert_eq!(outcome.activity.status, "pending");
        assert!(outcome.activity.assigned_gm_id.is_none());
        assert!(outcome.activity.assignment_date.is_none());

        assert_invariants(&state.db, &activity.id).await;
    }

    #[tokio::test]
    async fn unassign_all_is_idempotent() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm_a = seed_gm(&state.db, "alex").await;
        let gm_b = seed_gm(&state.db, "sam").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        service.assign_primary(&activity.id, &gm_a.id).await.unwrap();
        service.add_secondary(&activity.id, &gm_b.id).await.unwrap();

        let first = service.unassign_all(&activity.id).await.unwrap();
        assert!(!first.activity.is_assigned);
        assert_eq!(first.activity.status, "pending");

        let second = service.unassign_all(&activity.id).await.unwrap();
        assert!(!second.activity.is_assigned);
        assert_eq!(second.activity.status, "pending");

        // Both removed GMs were told, exactly once each.
        for gm in [&gm_a, &gm_b] {
            let notifications = NotificationRepository::find_by_gm(&state.db, &gm.id, 10, 0, false)
                .await
                .unwrap();
            let unassigned = notifications
                .iter()
                .filter(|n| n.notification_type == "unassigned")
                .count();
            assert_eq!(unassigned, 1);
        }

        assert_invariants(&state.db, &activity.id).await;
    }

    #[tokio::test]
    async fn duplicate_pair_is_rejected_by_the_store() {
        let state = crate::services::testing::state().await;

        let gm = seed_gm(&state.db, "alex").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        AssignmentRepository::insert(&state.db, &activity.id, &gm.id, 1)
            .await
            .unwrap();
        // Bypassing the engine's pre-check still hits the UNIQUE constraint.
        let err = AssignmentRepository::insert(&state.db, &activity.id, &gm.id, 2).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn cancel_notifies_and_clears_assignments() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let gm = seed_gm(&state.db, "alex").await;
        let activity =
            seed_activity(&state.db, "Session VR", d(2025, 1, 10), t(10, 0), t(11, 0), None).await;

        service.assign_primary(&activity.id, &gm.id).await.unwrap();
        let cancelled = service
            .cancel(&activity.id, ActivityStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.status, "cancelled");
        assert!(!cancelled.is_assigned);

        let notifications = NotificationRepository::find_by_gm(&state.db, &gm.id, 10, 0, false)
            .await
            .unwrap();
        assert!(notifications
            .iter()
            .any(|n| n.notification_type == "cancelled"));
    }

    #[tokio::test]
    async fn auto_assign_prefers_competency_and_skips_conflicted() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);
        let date = d(2025, 1, 10);

        let game = GameRepository::create(
            &state.db,
            CreateGame {
                name: "Cosmos".into(),
                category: None,
                location: None,
                average_duration: Some(60),
                minimum_break_minutes: Some(0),
            },
        )
        .await
        .unwrap();

        let expert = seed_gm(&state.db, "expert").await;
        let junior = seed_gm(&state.db, "junior").await;
        for (gm, level) in [(&expert, 5i64), (&junior, 2i64)] {
            CompetencyRepository::upsert(
                &state.db,
                &gm.id,
                &game.id,
                UpsertCompetency {
                    competency_level: level,
                    training_date: None,
                    notes: None,
                },
            )
            .await
            .unwrap();
            AvailabilityRepository::upsert(
                &state.db,
                &gm.id,
                date,
                &[crate::services::conflicts::FULL_DAY_SLOT.to_string()],
            )
            .await
            .unwrap();
        }

        // The expert already runs an overlapping session.
        let other =
            seed_activity(&state.db, "Other run", date, t(10, 30), t(11, 30), Some(&game.id)).await;
        service.assign_primary(&other.id, &expert.id).await.unwrap();

        let target =
            seed_activity(&state.db, "Cosmos run", date, t(10, 0), t(11, 0), Some(&game.id)).await;
        let outcome = service.auto_assign(&target.id).await.unwrap();

        assert_eq!(outcome.activity.assigned_gm_id.as_deref(), Some(junior.id.as_str()));
        assert!(outcome.message.contains("junior"));

        assert_invariants(&state.db, &target.id).await;
    }

    #[tokio::test]
    async fn auto_assign_without_candidates_fails_cleanly() {
        let state = crate::services::testing::state().await;
        let service = AssignmentService::new(&state);

        let activity =
            seed_activity(&state.db, "Unknown game", d(2025, 1, 10), t(10, 0), t(11, 0), None)
                .await;

        let err = service.auto_assign(&activity.id).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        // No partial writes happened.
        assert_invariants(&state.db, &activity.id).await;
    }
}
