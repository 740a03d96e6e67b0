use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use rand::RngCore;
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::error::ApiError;
use crate::state::AppState;

pub const TOKEN_KEY_LEN: usize = 40;

/// New opaque token key: 40 lowercase hex chars from OS randomness.
pub fn generate_key() -> String {
    let mut buf = [0u8; TOKEN_KEY_LEN / 2];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    buf.iter().map(|b| format!("{b:02x}")).collect()
}

/// Issue a fresh token for the user and persist it.
pub async fn issue(db: &PgPool, user_id: Uuid) -> anyhow::Result<String> {
    let key = generate_key();
    sqlx::query(
        r#"
        INSERT INTO auth_tokens (key, user_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(&key)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(key)
}

/// Look a token key up; `None` means the key was never issued.
pub async fn resolve(db: &PgPool, key: &str) -> anyhow::Result<Option<Uuid>> {
    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        SELECT user_id
        FROM auth_tokens
        WHERE key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(db)
    .await?;
    Ok(row.map(|(user_id,)| user_id))
}

/// Resolves the bearer token on the request to the owning user's id.
/// Every failure is a 401 and the handler never runs.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized("Missing Authorization header"))?;

        let key = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid Authorization header"))?;

        match resolve(&state.db, key).await? {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => {
                warn!("request with unknown token");
                Err(ApiError::Unauthorized("Invalid token"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_key_is_40_lowercase_hex_chars() {
        let key = generate_key();
        assert_eq!(key.len(), TOKEN_KEY_LEN);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn generated_keys_differ() {
        assert_ne!(generate_key(), generate_key());
    }
}
