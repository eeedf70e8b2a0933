use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::SessionContext;
use crate::error::{AppError, AppResult};
use crate::handlers::dashboard::seed_snapshot;
use crate::models::profile::{Profile, UpdateWeightRequest, WeightProgress};
use crate::sync::{spawn_persist, PersistAck, PersistError};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UpdateWeightResponse {
    pub weight_current: f64,
    pub progress: WeightProgress,
}

/// Optimistic weight update: the snapshot and derived progress reflect the
/// new value immediately; the profile row is updated on a spawned task.
pub async fn update_weight(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(body): Json<UpdateWeightRequest>,
) -> AppResult<Json<UpdateWeightResponse>> {
    if !body.weight.is_finite() || body.weight <= 0.0 {
        return Err(AppError::Validation("Weight must be positive".into()));
    }

    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(ctx.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Profile not found".into()))?;

    let today = Utc::now().date_naive();
    // Seed before mutating so a cold cache never gets a zeroed snapshot
    // that later counter deltas would build on.
    seed_snapshot(&state, ctx.user_id, today).await?;
    let _ = state.sync.set_weight(ctx.user_id, today, body.weight);

    let db = state.db.clone();
    let user_id = ctx.user_id;
    let weight = body.weight;
    spawn_persist(&state.sync, user_id, today, async move {
        persist_weight(&db, user_id, weight).await
    });

    let progress = WeightProgress::compute(profile.weight_initial, body.weight, profile.weight_goal);

    Ok(Json(UpdateWeightResponse {
        weight_current: body.weight,
        progress,
    }))
}

async fn persist_weight(db: &PgPool, user_id: Uuid, weight: f64) -> Result<PersistAck, PersistError> {
    sqlx::query(
        r#"
        UPDATE profiles
        SET weight_current = $2, updated_at = NOW()
        WHERE user_id = $1
        "#,
    )
    .bind(user_id)
    .bind(weight)
    .execute(db)
    .await?;

    Ok(PersistAck)
}
