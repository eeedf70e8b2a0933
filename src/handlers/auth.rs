use axum::{extract::State, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::guard::SessionContext;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::session::{create_session, named_session_cookie, revoke_session, session_cookie};
use crate::error::{AppError, AppResult};
use crate::models::profile::Profile;
use crate::models::user::User;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[validate(email(message = "A valid email is required"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[validate(range(min = 1.0, message = "Current weight must be positive"))]
    pub weight_current: f64,
    #[validate(range(min = 1.0, message = "Goal weight must be positive"))]
    pub weight_goal: f64,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user_id: Uuid,
    pub email: String,
}

/// Signup is all-or-nothing: user, profile, and the first daily-stat row are
/// inserted in one transaction, and the session is only minted after commit.
/// A failure anywhere leaves no orphaned identity behind.
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<SignupRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let email = body.email.trim().to_lowercase();

    // One outstanding signup per email; released when this handler settles.
    let _in_flight = state
        .inflight
        .try_acquire(&email)
        .ok_or(AppError::InFlight)?;

    body.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let existing = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(&email)
        .fetch_one(&state.db)
        .await?;

    if existing > 0 {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let pwd_hash = hash_password(&body.password)?;
    let user_id = Uuid::new_v4();
    let today = Utc::now().date_naive();

    let mut tx = state.db.begin().await?;

    // The COUNT check above can race with a concurrent signup (e.g. another
    // instance); the unique index is the authority, so map its violation to
    // the same 409 instead of a 500.
    sqlx::query(
        r#"
        INSERT INTO users (id, email, password_hash)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(user_id)
    .bind(&email)
    .bind(&pwd_hash)
    .execute(&mut *tx)
    .await
    .map_err(|e| conflict_on_unique(e, "Email already registered"))?;

    sqlx::query(
        r#"
        INSERT INTO profiles (id, user_id, name, weight_current, weight_goal, weight_initial)
        VALUES ($1, $2, $3, $4, $5, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(body.name.trim())
    .bind(body.weight_current)
    .bind(body.weight_goal)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        INSERT INTO daily_stats (id, user_id, stat_date, steps, water_glasses, sleep_hours)
        VALUES ($1, $2, $3, 0, 0, 0)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(today)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(user_id = %user_id, "User signed up");

    let token = create_session(&state.db, user_id, &state.config).await?;
    let jar = jar.add(session_cookie(&state.config, token));

    Ok((jar, Json(AuthResponse { user_id, email })))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<AuthResponse>)> {
    let email = body.email.trim().to_lowercase();

    let _in_flight = state
        .inflight
        .try_acquire(&email)
        .ok_or(AppError::InFlight)?;

    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::BadCredentials)?;

    if !verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::BadCredentials);
    }

    let token = create_session(&state.db, user.id, &state.config).await?;
    let jar = jar.add(session_cookie(&state.config, token));

    Ok((
        jar,
        Json(AuthResponse {
            user_id: user.id,
            email: user.email,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    ctx: SessionContext,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<serde_json::Value>)> {
    revoke_session(&state.db, ctx.session_id).await?;
    let jar = jar.remove(named_session_cookie(&state.config));
    Ok((jar, Json(serde_json::json!({ "message": "Logged out" }))))
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: User,
    pub profile: Profile,
}

/// Map a unique-index violation to a 409; everything else stays a database
/// error.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict(message.into())
        }
        _ => AppError::Database(e),
    }
}

pub async fn me(State(state): State<AppState>, ctx: SessionContext) -> AppResult<Json<MeResponse>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(ctx.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("User not found".into()))?;

    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(ctx.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or(AppError::NotFound("Profile not found".into()))?;

    Ok(Json(MeResponse { user, profile }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_unique_errors_stay_database_errors() {
        let mapped = conflict_on_unique(sqlx::Error::PoolTimedOut, "Email already registered");
        assert!(matches!(mapped, AppError::Database(_)));
        assert!(mapped.is_retriable());
    }
}
