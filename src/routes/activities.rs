use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::db::models::{
    Activity, ActivityStatus, CreateActivity, EventAssignment, NewActivity, UpdateActivity,
};
use crate::db::{ActivityRepository, AssignmentRepository, GameMasterRepository};
use crate::error::{AppError, AppResult};
use crate::i18n;
use crate::services::assignments::AssignmentService;
use crate::services::cache::ViewKey;
use crate::services::conflicts::{self, ConflictReport};
use crate::services::matcher;
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_activities).post(create_activity))
        .route("/unassigned", get(list_unassigned))
        .route(
            "/:id",
            get(get_activity).put(update_activity).delete(delete_activity),
        )
        .route(
            "/:id/assignments",
            get(list_assignments)
                .post(assign_gm)
                .delete(unassign_all),
        )
        .route("/:id/assignments/auto", post(auto_assign))
        .route("/:id/assignments/:gm_id", delete(unassign_gm))
        .route("/:id/candidates", get(list_candidates))
        .route("/:id/conflicts", get(check_conflicts))
}

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ListActivitiesQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ActivityDetailResponse {
    pub activity: Activity,
    pub assignments: Vec<AssignmentView>,
    /// Best-effort extraction of booked options from the description.
    pub options: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AssignmentView {
    pub gm_id: String,
    pub gm_name: Option<String>,
    pub assignment_order: i64,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    pub gm_id: String,
    /// Set after the operator reviewed the conflict warnings.
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub assigned: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_confirmation: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<ConflictReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity: Option<Activity>,
}

#[derive(Debug, Deserialize)]
pub struct ConflictQuery {
    pub gm_id: String,
}

#[derive(Debug, Serialize)]
pub struct CandidateResponse {
    pub gm_id: String,
    pub gm_name: String,
    pub competency_level: i64,
    pub same_day_assignments: usize,
    pub eligible: bool,
    pub report: ConflictReport,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List activities. The unfiltered listing is served through the view cache.
async fn list_activities(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListActivitiesQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let unfiltered = query.from.is_none() && query.to.is_none() && query.status.is_none();

    if unfiltered {
        if let Some(cached) = state.views.get(&ViewKey::ActivityList).await {
            return Ok(Json(cached));
        }
    }

    let activities = ActivityRepository::list(
        &state.db,
        query.from,
        query.to,
        query.status.as_deref(),
    )
    .await?;
    let value = serde_json::to_value(&activities).map_err(|e| AppError::Internal(e.into()))?;

    if unfiltered {
        state.views.put(ViewKey::ActivityList, value.clone()).await;
    }

    Ok(Json(value))
}

/// Create an activity. The game is resolved from the title when not given
/// explicitly, and the matched game's average duration pre-fills a missing
/// duration.
async fn create_activity(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateActivity>,
) -> AppResult<Json<Activity>> {
    if payload.end_time <= payload.start_time {
        return Err(AppError::Validation(
            "end_time must be after start_time".to_string(),
        ));
    }

    let (game_id, matched_duration) = match &payload.game_id {
        Some(id) => (Some(id.clone()), None),
        None => {
            let game_match =
                matcher::match_title(&state.db, &state.mappings, &payload.title).await?;
            (game_match.game_id, game_match.average_duration)
        }
    };

    let duration = payload
        .duration
        .or(matched_duration)
        .unwrap_or_else(|| (payload.end_time - payload.start_time).num_minutes());

    let activity = ActivityRepository::create(
        &state.db,
        NewActivity {
            title: payload.title,
            date: payload.date,
            start_time: payload.start_time,
            end_time: payload.end_time,
            duration,
            activity_type: payload
                .activity_type
                .unwrap_or_else(|| "gaming".to_string()),
            game_id,
            admin_notes: payload.admin_notes,
            description: payload.description,
            source: "manual".to_string(),
            external_ref: None,
        },
    )
    .await?;

    state
        .views
        .invalidate(&[ViewKey::ActivityList, ViewKey::UnassignedActivities])
        .await;

    Ok(Json(activity))
}

/// Pending activities nobody is assigned to yet (cached view).
async fn list_unassigned(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<serde_json::Value>> {
    if let Some(cached) = state.views.get(&ViewKey::UnassignedActivities).await {
        return Ok(Json(cached));
    }

    let activities = ActivityRepository::list_unassigned(&state.db).await?;
    let value = serde_json::to_value(&activities).map_err(|e| AppError::Internal(e.into()))?;
    state
        .views
        .put(ViewKey::UnassignedActivities, value.clone())
        .await;

    Ok(Json(value))
}

async fn get_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ActivityDetailResponse>> {
    let activity = require_activity(&state, &id).await?;
    let assignments = assignment_views(&state, &id).await?;
    let options = activity
        .description
        .as_deref()
        .map(crate::db::models::parse_description_options)
        .unwrap_or_default();

    Ok(Json(ActivityDetailResponse {
        activity,
        assignments,
        options,
    }))
}

/// Update an activity. A schedule change on an assigned event notifies the
/// assigned GMs.
async fn update_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateActivity>,
) -> AppResult<Json<Activity>> {
    let before = require_activity(&state, &id).await?;

    let updated = ActivityRepository::update(&state.db, &id, payload).await?;

    let schedule_changed = before.date != updated.date
        || before.start_time != updated.start_time
        || before.end_time != updated.end_time;
    if schedule_changed && updated.is_assigned {
        AssignmentService::new(&state).notify_modified(&updated).await?;
    }

    state.views.invalidate_activity_views(&id).await;

    Ok(Json(updated))
}

/// Soft delete: assignments are dropped, the status becomes 'deleted' and
/// previously assigned GMs are told the event is gone.
async fn delete_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<MessageResponse>> {
    AssignmentService::new(&state)
        .cancel(&id, ActivityStatus::Deleted)
        .await?;

    Ok(Json(MessageResponse {
        message: i18n::t("activity.deleted"),
    }))
}

/// Per-activity assignment list (cached view).
async fn list_assignments(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let key = ViewKey::ActivityAssignments(id.clone());
    if let Some(cached) = state.views.get(&key).await {
        return Ok(Json(cached));
    }

    require_activity(&state, &id).await?;
    let views = assignment_views(&state, &id).await?;
    let value = serde_json::to_value(&views).map_err(|e| AppError::Internal(e.into()))?;
    state.views.put(key, value.clone()).await;

    Ok(Json(value))
}

/// Assign a GM. Routes to "assign primary" on an empty event and to "add
/// secondary" otherwise. Conflicts never block silently: without
/// `confirmed`, a conflicted request comes back as a warning for the
/// operator to confirm.
async fn assign_gm(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<AssignRequest>,
) -> AppResult<Json<AssignResponse>> {
    if payload.gm_id.trim().is_empty() {
        return Err(AppError::Validation("gm_id is required".to_string()));
    }

    let activity = require_activity(&state, &id).await?;

    if !payload.confirmed {
        let report = conflict_report(&state, &activity, &payload.gm_id).await?;
        if report.has_conflict {
            return Ok(Json(AssignResponse {
                assigned: false,
                message: i18n::t("assignment.requires_confirmation"),
                requires_confirmation: Some(true),
                report: Some(report),
                activity: None,
            }));
        }
    }

    let service = AssignmentService::new(&state);
    let existing = AssignmentRepository::find_by_activity(&state.db, &id).await?;
    let outcome = if existing.is_empty() {
        service.assign_primary(&id, &payload.gm_id).await?
    } else {
        service.add_secondary(&id, &payload.gm_id).await?
    };

    Ok(Json(AssignResponse {
        assigned: true,
        message: outcome.message,
        requires_confirmation: None,
        report: None,
        activity: Some(outcome.activity),
    }))
}

async fn auto_assign(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<AssignResponse>> {
    let outcome = AssignmentService::new(&state).auto_assign(&id).await?;

    Ok(Json(AssignResponse {
        assigned: true,
        message: outcome.message,
        requires_confirmation: None,
        report: None,
        activity: Some(outcome.activity),
    }))
}

async fn unassign_gm(
    State(state): State<Arc<AppState>>,
    Path((id, gm_id)): Path<(String, String)>,
) -> AppResult<Json<AssignResponse>> {
    let outcome = AssignmentService::new(&state).unassign_one(&id, &gm_id).await?;

    Ok(Json(AssignResponse {
        assigned: outcome.activity.is_assigned,
        message: outcome.message,
        requires_confirmation: None,
        report: None,
        activity: Some(outcome.activity),
    }))
}

async fn unassign_all(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<AssignResponse>> {
    let outcome = AssignmentService::new(&state).unassign_all(&id).await?;

    Ok(Json(AssignResponse {
        assigned: false,
        message: outcome.message,
        requires_confirmation: None,
        report: None,
        activity: Some(outcome.activity),
    }))
}

/// Ranked candidates with their conflict reports, for the assignment panel.
async fn list_candidates(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<Vec<CandidateResponse>>> {
    let candidates = AssignmentService::new(&state).candidates(&id).await?;

    let response = candidates
        .into_iter()
        .map(|c| CandidateResponse {
            eligible: c.is_eligible(),
            gm_id: c.gm.id.clone(),
            gm_name: c.gm.name.clone(),
            competency_level: c.competency_level,
            same_day_assignments: c.same_day_assignments,
            report: c.report,
        })
        .collect();

    Ok(Json(response))
}

/// Dry-run conflict check for one GM against this activity's window.
async fn check_conflicts(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ConflictQuery>,
) -> AppResult<Json<ConflictReport>> {
    let activity = require_activity(&state, &id).await?;
    let report = conflict_report(&state, &activity, &query.gm_id).await?;
    Ok(Json(report))
}

// ============================================================================
// Helpers
// ============================================================================

async fn require_activity(state: &Arc<AppState>, id: &str) -> AppResult<Activity> {
    ActivityRepository::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(i18n::t("not_found.activity")))
}

/// The break rule needs the activity's game; fall back to a title match when
/// the column is empty.
async fn conflict_report(
    state: &Arc<AppState>,
    activity: &Activity,
    gm_id: &str,
) -> AppResult<ConflictReport> {
    let game_id = match &activity.game_id {
        Some(id) => Some(id.clone()),
        None => {
            matcher::match_title(&state.db, &state.mappings, &activity.title)
                .await?
                .game_id
        }
    };

    conflicts::check_gm_availability_conflicts(
        &state.db,
        gm_id,
        activity.date,
        activity.start_time,
        activity.end_time,
        game_id.as_deref(),
        Some(activity.id.as_str()),
    )
    .await
}

async fn assignment_views(
    state: &Arc<AppState>,
    activity_id: &str,
) -> AppResult<Vec<AssignmentView>> {
    let assignments: Vec<EventAssignment> =
        AssignmentRepository::find_by_activity(&state.db, activity_id).await?;

    let mut views = Vec::with_capacity(assignments.len());
    for assignment in assignments {
        let gm_name = GameMasterRepository::find_by_id(&state.db, &assignment.gm_id)
            .await?
            .map(|gm| gm.name);
        views.push(AssignmentView {
            gm_id: assignment.gm_id,
            gm_name,
            assignment_order: assignment.assignment_order,
            status: assignment.status,
        });
    }

    Ok(views)
}
