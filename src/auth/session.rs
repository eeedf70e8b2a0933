use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::config::Config;
use crate::error::AppResult;

/// A session resolved from a presented cookie token. When the stored row was
/// old enough to rotate, `rotated_token` carries the replacement that must be
/// sent back to the client.
#[derive(Debug)]
pub struct ResolvedSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub rotated_token: Option<String>,
}

/// Mint a new opaque session token: 32 random bytes, hex-encoded. Only the
/// SHA-256 hash is stored.
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Compute SHA-256 hash of a raw token string, returned as lowercase hex.
pub fn hash_token(raw_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Create a session row for the user and return the raw token for the cookie.
pub async fn create_session(db: &PgPool, user_id: Uuid, config: &Config) -> AppResult<String> {
    let raw_token = generate_token();
    store_session(db, user_id, &raw_token, config.session_ttl_secs).await?;
    Ok(raw_token)
}

async fn store_session(
    db: &PgPool,
    user_id: Uuid,
    raw_token: &str,
    ttl_secs: i64,
) -> AppResult<Uuid> {
    let token_hash = hash_token(raw_token);
    let expires_at = Utc::now() + Duration::seconds(ttl_secs);
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, token_hash, expires_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(&token_hash)
    .bind(expires_at)
    .execute(db)
    .await?;

    Ok(id)
}

/// Look up a presented token. Returns None for unknown, revoked, or expired
/// tokens. Rotates the session (new token, old row revoked) when the row is
/// older than the configured threshold.
pub async fn resolve_session(
    db: &PgPool,
    raw_token: &str,
    config: &Config,
) -> AppResult<Option<ResolvedSession>> {
    let token_hash = hash_token(raw_token);

    let row = sqlx::query_as::<_, (Uuid, Uuid, DateTime<Utc>, DateTime<Utc>, bool)>(
        r#"
        SELECT id, user_id, created_at, expires_at, revoked
        FROM sessions
        WHERE token_hash = $1
        "#,
    )
    .bind(&token_hash)
    .fetch_optional(db)
    .await?;

    let Some((session_id, user_id, created_at, expires_at, revoked)) = row else {
        return Ok(None);
    };

    let now = Utc::now();
    if revoked || expires_at <= now {
        return Ok(None);
    }

    let age = now - created_at;
    if age < Duration::seconds(config.session_rotate_after_secs) {
        return Ok(Some(ResolvedSession {
            session_id,
            user_id,
            rotated_token: None,
        }));
    }

    // Rotate: store the replacement first so a crash between the two writes
    // cannot leave the user without a valid session.
    let new_token = generate_token();
    let new_id = store_session(db, user_id, &new_token, config.session_ttl_secs).await?;

    sqlx::query(
        r#"
        UPDATE sessions
        SET revoked = true, rotated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(session_id)
    .execute(db)
    .await?;

    tracing::debug!(user_id = %user_id, old = %session_id, new = %new_id, "Session rotated");

    Ok(Some(ResolvedSession {
        session_id: new_id,
        user_id,
        rotated_token: Some(new_token),
    }))
}

pub async fn revoke_session(db: &PgPool, session_id: Uuid) -> AppResult<()> {
    sqlx::query("UPDATE sessions SET revoked = true WHERE id = $1")
        .bind(session_id)
        .execute(db)
        .await?;
    Ok(())
}

/// Build the session cookie for a raw token. Expiry is enforced server-side
/// by the session row, so the cookie itself is a browser-session cookie.
pub fn session_cookie(config: &Config, raw_token: String) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), raw_token))
        .path("/")
        .http_only(true)
        .secure(config.cookie_secure)
        .same_site(SameSite::Lax)
        .build()
}

/// Cookie handle used to remove the session cookie from a jar on logout.
pub fn named_session_cookie(config: &Config) -> Cookie<'static> {
    Cookie::build((config.session_cookie_name.clone(), ""))
        .path("/")
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_token_deterministic() {
        let token = "test-session-token-value";
        let h1 = hash_token(token);
        let h2 = hash_token(token);
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64); // SHA-256 hex = 64 chars
    }

    #[test]
    fn test_hash_token_different_inputs() {
        let h1 = hash_token("token-a");
        let h2 = hash_token("token-b");
        assert_ne!(h1, h2);
    }

    #[test]
    fn test_generated_tokens_unique() {
        let t1 = generate_token();
        let t2 = generate_token();
        assert_ne!(t1, t2);
        assert_eq!(t1.len(), 64); // 32 bytes hex
    }
}
