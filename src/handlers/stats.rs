use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::SessionContext;
use crate::error::{AppError, AppResult};
use crate::handlers::dashboard::seed_snapshot;
use crate::models::daily_stat::{AdjustStatRequest, Mood, SetMoodRequest};
use crate::sync::{spawn_persist, DashboardSnapshot, PersistAck, PersistError};
use crate::AppState;

/// Optimistic counter adjustment: the snapshot is updated and returned
/// immediately; the upsert keyed by (user, date) runs on a spawned task.
pub async fn adjust_stat(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(body): Json<AdjustStatRequest>,
) -> AppResult<Json<DashboardSnapshot>> {
    if !body.delta.is_finite() {
        return Err(AppError::Validation("Delta must be a finite number".into()));
    }

    let today = Utc::now().date_naive();
    seed_snapshot(&state, ctx.user_id, today).await?;

    let snap = state
        .sync
        .apply_counter(ctx.user_id, today, body.field, body.delta);

    let db = state.db.clone();
    let (steps, water, sleep) = (snap.steps, snap.water_glasses, snap.sleep_hours);
    let user_id = ctx.user_id;
    spawn_persist(&state.sync, user_id, today, async move {
        persist_counters(&db, user_id, today, steps, water, sleep).await
    });

    Ok(Json(snap))
}

pub async fn set_mood(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(body): Json<SetMoodRequest>,
) -> AppResult<Json<DashboardSnapshot>> {
    let today = Utc::now().date_naive();
    seed_snapshot(&state, ctx.user_id, today).await?;

    let snap = state.sync.set_mood(ctx.user_id, today, body.mood);

    let db = state.db.clone();
    let user_id = ctx.user_id;
    let mood = body.mood;
    spawn_persist(&state.sync, user_id, today, async move {
        persist_mood(&db, user_id, today, mood).await
    });

    Ok(Json(snap))
}

async fn persist_counters(
    db: &PgPool,
    user_id: Uuid,
    date: NaiveDate,
    steps: i32,
    water_glasses: i32,
    sleep_hours: f64,
) -> Result<PersistAck, PersistError> {
    sqlx::query(
        r#"
        INSERT INTO daily_stats (id, user_id, stat_date, steps, water_glasses, sleep_hours)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (user_id, stat_date) DO UPDATE SET
            steps = $4,
            water_glasses = $5,
            sleep_hours = $6,
            updated_at = NOW()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(date)
    .bind(steps)
    .bind(water_glasses)
    .bind(sleep_hours)
    .execute(db)
    .await?;

    Ok(PersistAck)
}

async fn persist_mood(
    db: &PgPool,
    user_id: Uuid,
    date: NaiveDate,
    mood: Mood,
) -> Result<PersistAck, PersistError> {
    sqlx::query(
        r#"
        INSERT INTO daily_stats (id, user_id, stat_date, steps, water_glasses, sleep_hours, mood)
        VALUES ($1, $2, $3, 0, 0, 0, $4)
        ON CONFLICT (user_id, stat_date) DO UPDATE SET
            mood = $4,
            updated_at = NOW()
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(date)
    .bind(mood)
    .execute(db)
    .await?;

    Ok(PersistAck)
}
