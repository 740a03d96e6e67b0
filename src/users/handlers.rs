use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, instrument, warn};

use crate::auth::password::hash_password;
use crate::auth::token::{self, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{CreateUserRequest, TokenRequest, TokenResponse, UpdateMeRequest, UserResponse};
use super::repo::User;
use super::service;

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let user = service::create_user(
        &state.db,
        state.config.auth.min_password_len,
        &payload.email,
        &payload.password,
        &payload.name,
    )
    .await?;

    info!(user_id = %user.id, email = %user.email, "user created");
    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            email: user.email,
            name: user.name,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn issue_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        warn!("token request with missing credentials");
        return Err(ApiError::validation("Email and password are required"));
    }

    let user = service::authenticate(&state.db, &payload.email, &payload.password)
        .await?
        .ok_or_else(|| {
            warn!("authentication failed");
            ApiError::validation("Unable to authenticate with provided credentials")
        })?;

    let key = token::issue(&state.db, user.id).await?;
    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse { token: key }))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::Unauthorized("Unknown user"))?;

    Ok(Json(UserResponse {
        email: user.email,
        name: user.name,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let password_hash = match payload.password.as_deref() {
        Some(password) => {
            service::validate_password(password, state.config.auth.min_password_len)?;
            Some(hash_password(password)?)
        }
        None => None,
    };

    let user = User::update_profile(
        &state.db,
        user_id,
        payload.name.as_deref(),
        password_hash.as_deref(),
    )
    .await?;

    info!(user_id = %user.id, "profile updated");
    Ok(Json(UserResponse {
        email: user.email,
        name: user.name,
    }))
}
