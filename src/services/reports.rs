use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};

use crate::error::{AppError, AppResult};

/// Assigned minutes of one GM over one month.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GmMonthlyHours {
    pub gm_id: String,
    pub gm_name: String,
    pub activity_count: i64,
    pub total_minutes: i64,
}

/// Per-GM totals of assigned activity minutes for a month. Cancelled and
/// deleted events do not count.
pub async fn monthly_gm_hours(
    pool: &SqlitePool,
    year: i32,
    month: u32,
) -> AppResult<Vec<GmMonthlyHours>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| AppError::BadRequest(format!("Invalid month: {year}-{month}")))?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    }
    .expect("first day of a month is always valid");
    let last = next_month.pred_opt().expect("date has a predecessor");

    let rows = sqlx::query_as::<_, GmMonthlyHours>(
        r#"
        SELECT
            gm.id AS gm_id,
            gm.name AS gm_name,
            COUNT(*) AS activity_count,
            SUM(a.duration) AS total_minutes
        FROM event_assignments ea
        INNER JOIN activities a ON a.id = ea.activity_id
        INNER JOIN game_masters gm ON gm.id = ea.gm_id
        WHERE a.date >= ? AND a.date <= ?
          AND a.status NOT IN ('cancelled', 'deleted')
        GROUP BY gm.id, gm.name
        ORDER BY total_minutes DESC
        "#,
    )
    .bind(first)
    .bind(last)
    .fetch_all(pool)
    .await
    .map_err(AppError::Database)?;

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{CreateGameMaster, NewActivity};
    use crate::db::{ActivityRepository, AssignmentRepository, GameMasterRepository};
    use chrono::NaiveTime;

    #[tokio::test]
    async fn sums_assigned_minutes_per_gm() {
        let pool = crate::db::testing::pool().await;

        let gm = GameMasterRepository::create(
            &pool,
            CreateGameMaster {
                name: "Alex".into(),
                email: "alex@center.test".into(),
                phone: None,
            },
        )
        .await
        .unwrap();

        for (day, start_h, minutes) in [(10u32, 10u32, 60i64), (12, 14, 90)] {
            let activity = ActivityRepository::create(
                &pool,
                NewActivity {
                    title: "Session".into(),
                    date: NaiveDate::from_ymd_opt(2025, 1, day).unwrap(),
                    start_time: NaiveTime::from_hms_opt(start_h, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(start_h + 2, 0, 0).unwrap(),
                    duration: minutes,
                    activity_type: "gaming".into(),
                    game_id: None,
                    admin_notes: None,
                    description: None,
                    source: "manual".into(),
                    external_ref: None,
                },
            )
            .await
            .unwrap();
            AssignmentRepository::insert(&pool, &activity.id, &gm.id, 1)
                .await
                .unwrap();
        }

        // An event in another month must not count.
        let other = ActivityRepository::create(
            &pool,
            NewActivity {
                title: "February".into(),
                date: NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
                start_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
                end_time: NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
                duration: 60,
                activity_type: "gaming".into(),
                game_id: None,
                admin_notes: None,
                description: None,
                source: "manual".into(),
                external_ref: None,
            },
        )
        .await
        .unwrap();
        AssignmentRepository::insert(&pool, &other.id, &gm.id, 1)
            .await
            .unwrap();

        let report = monthly_gm_hours(&pool, 2025, 1).await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report[0].gm_id, gm.id);
        assert_eq!(report[0].activity_count, 2);
        assert_eq!(report[0].total_minutes, 150);
    }

    #[tokio::test]
    async fn invalid_month_is_a_bad_request() {
        let pool = crate::db::testing::pool().await;
        assert!(monthly_gm_hours(&pool, 2025, 13).await.is_err());
    }
}
