use axum::{extract::State, Json};
use chrono::{NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::guard::SessionContext;
use crate::error::{AppError, AppResult};
use crate::handlers::dashboard::seed_snapshot;
use crate::models::meal::{CreateMealRequest, Meal};
use crate::sync::{spawn_persist, PersistAck, PersistError};
use crate::AppState;

/// Append-only meal log: the row is built server-side (id, date, HH:MM time
/// label), added to the snapshot optimistically, and inserted on a spawned
/// task. There is no update or delete path.
pub async fn create_meal(
    State(state): State<AppState>,
    ctx: SessionContext,
    Json(body): Json<CreateMealRequest>,
) -> AppResult<Json<Meal>> {
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Meal name is required".into()));
    }

    let now = Utc::now();
    let today = now.date_naive();

    let meal = Meal {
        id: Uuid::new_v4(),
        user_id: ctx.user_id,
        meal_date: today,
        name: body.name.trim().to_string(),
        time_label: now.format("%H:%M").to_string(),
        items: body.items,
        calories: body.calories.max(0),
        category: body.category,
        created_at: now,
    };

    seed_snapshot(&state, ctx.user_id, today).await?;
    state.sync.push_meal(ctx.user_id, today, meal.clone());

    let db = state.db.clone();
    let row = meal.clone();
    spawn_persist(&state.sync, ctx.user_id, today, async move {
        persist_meal(&db, &row).await
    });

    Ok(Json(meal))
}

pub async fn list_meals(
    State(state): State<AppState>,
    ctx: SessionContext,
) -> AppResult<Json<Vec<Meal>>> {
    let today = Utc::now().date_naive();
    let meals = meals_for_day(&state.db, ctx.user_id, today).await?;
    Ok(Json(meals))
}

pub async fn meals_for_day(db: &PgPool, user_id: Uuid, date: NaiveDate) -> AppResult<Vec<Meal>> {
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

    Ok(meals)
}

async fn persist_meal(db: &PgPool, meal: &Meal) -> Result<PersistAck, PersistError> {
    sqlx::query(
        r#"
        INSERT INTO meals (id, user_id, meal_date, name, time_label, items, calories, category, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(meal.id)
    .bind(meal.user_id)
    .bind(meal.meal_date)
    .bind(&meal.name)
    .bind(&meal.time_label)
    .bind(&meal.items)
    .bind(meal.calories)
    .bind(meal.category)
    .bind(meal.created_at)
    .execute(db)
    .await?;

    Ok(PersistAck)
}
