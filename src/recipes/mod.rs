mod dto;
pub mod handlers;
pub mod repo;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tags", get(handlers::list_tags).post(handlers::create_tag))
        .route(
            "/ingredients",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route(
            "/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route(
            "/recipes/:id",
            get(handlers::get_recipe)
                .put(handlers::put_recipe)
                .patch(handlers::patch_recipe),
        )
}
