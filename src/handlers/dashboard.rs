use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::SessionContext;
use crate::error::{AppError, AppResult};
use crate::models::daily_stat::DailyStat;
use crate::models::meal::Meal;
use crate::models::profile::{Profile, WeightProgress};
use crate::sync::DashboardSnapshot;
use crate::AppState;

/// Fixed daily targets shown on the dashboard.
#[derive(Debug, Serialize)]
pub struct DailyGoals {
    pub calories: i32,
    pub steps: i32,
    pub water_glasses: i32,
    pub sleep_hours: f64,
}

impl Default for DailyGoals {
    fn default() -> Self {
        Self {
            calories: 1800,
            steps: 10_000,
            water_glasses: 8,
            sleep_hours: 8.0,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub profile: Profile,
    pub progress: WeightProgress,
    pub snapshot: DashboardSnapshot,
    pub total_calories: i64,
    pub goals: DailyGoals,
}

/// Full dashboard load. Lazily creates today's stat row by natural key
/// (loading twice never produces a second row) and replaces the in-memory
/// snapshot with database state — the reconciliation point after any failed
/// optimistic persist.
pub async fn get_dashboard(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> AppResult<Json<DashboardResponse>> {
    let today = Utc::now().date_naive();

    ensure_stat_row(&state.db, ctx.user_id, today).await?;

    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(ctx.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Profile not found".into()))?;

    let snapshot = load_snapshot(&state.db, ctx.user_id, today).await?;
    state.sync.replace(ctx.user_id, today, snapshot.clone());

    let total_calories = snapshot.total_calories();
    let progress = WeightProgress::for_profile(&profile);

    Ok(Json(DashboardResponse {
        profile,
        progress,
        snapshot,
        total_calories,
        goals: DailyGoals::default(),
    }))
}

/// Upsert-by-natural-key creation of the day's stat row. The no-op update
/// makes RETURNING yield the existing row on conflict.
pub async fn ensure_stat_row(
    db: &PgPool,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<DailyStat> {
    let stat = sqlx::query_as::<_, DailyStat>(
        r#"
        INSERT INTO daily_stats (id, user_id, stat_date, steps, water_glasses, sleep_hours)
        VALUES ($1, $2, $3, 0, 0, 0)
        ON CONFLICT (user_id, stat_date) DO UPDATE SET stat_date = EXCLUDED.stat_date
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(date)
    .fetch_one(db)
    .await?;

    Ok(stat)
}

/// Seed the in-memory snapshot from the database when a mutation arrives
/// before any dashboard load, so deltas and updates apply to real values.
pub async fn seed_snapshot(state: &AppState, user_id: Uuid, date: NaiveDate) -> AppResult<()> {
    if state.sync.get(user_id, date).is_none() {
        let snap = load_snapshot(&state.db, user_id, date).await?;
        state.sync.replace(user_id, date, snap);
    }
    Ok(())
}

/// Read the day's state from the database into a fresh snapshot. Missing
/// stat rows read as zeros; the row itself is only created on dashboard load.
pub async fn load_snapshot(
    db: &PgPool,
    user_id: Uuid,
    date: NaiveDate,
) -> AppResult<DashboardSnapshot> {
    let stat = sqlx::query_as::<_, DailyStat>(
        "SELECT * FROM daily_stats WHERE user_id = $1 AND stat_date = $2",
    )
    .bind(user_id)
    .bind(date)
    .fetch_optional(db)
    .await?;

    let meals = sqlx::query_as::<_, Meal>(
        r#"
        SELECT * FROM meals
        WHERE user_id = $1 AND meal_date = $2
        ORDER BY time_label ASC, created_at ASC
        "#,
    )
    .bind(user_id)
    .bind(date)
    .fetch_all(db)
    .await?;

    let weight_current =
        sqlx::query_scalar::<_, f64>("SELECT weight_current FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(db)
            .await?;

    let snapshot = match stat {
        Some(stat) => DashboardSnapshot::from_parts(&stat, meals, weight_current),
        None => DashboardSnapshot {
            meals,
            weight_current,
            ..Default::default()
        },
    };

    Ok(snapshot)
}
