mod dto;
pub mod handlers;
pub mod repo;
pub mod service;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(handlers::create_user))
        .route("/token", post(handlers::issue_token))
        .route("/me", get(handlers::get_me).patch(handlers::update_me))
}
