use std::sync::Arc;

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::reports::{self, GmMonthlyHours};
use crate::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/monthly-hours", get(monthly_hours))
}

#[derive(Debug, Deserialize)]
pub struct MonthlyHoursQuery {
    pub year: i32,
    pub month: u32,
}

/// Per-GM assigned minutes for one month.
async fn monthly_hours(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MonthlyHoursQuery>,
) -> AppResult<Json<Vec<GmMonthlyHours>>> {
    let rows = reports::monthly_gm_hours(&state.db, query.year, query.month).await?;
    Ok(Json(rows))
}
