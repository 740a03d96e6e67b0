use std::collections::HashMap;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use sqlx::PgPool;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::token::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{
    CreateIngredientRequest, CreateTagRequest, IngredientResponse, RecipeDetail, RecipeListItem,
    RecipePatchRequest, RecipeWriteRequest, TagResponse,
};
use super::repo::{self, Recipe};

// ---- tags ----

#[instrument(skip(state))]
pub async fn list_tags(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<TagResponse>>, ApiError> {
    let tags = repo::list_tags(&state.db, user_id).await?;
    Ok(Json(tags.into_iter().map(TagResponse::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn create_tag(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<TagResponse>), ApiError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if repo::tag_name_exists(&state.db, user_id, &name).await? {
        return Err(ApiError::validation("Tag with this name already exists"));
    }

    let tag = repo::insert_tag(&state.db, user_id, &name).await?;
    info!(user_id = %user_id, tag_id = tag.id, "tag created");
    Ok((StatusCode::CREATED, Json(tag.into())))
}

// ---- ingredients ----

#[instrument(skip(state))]
pub async fn list_ingredients(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<IngredientResponse>>, ApiError> {
    let ingredients = repo::list_ingredients(&state.db, user_id).await?;
    Ok(Json(
        ingredients.into_iter().map(IngredientResponse::from).collect(),
    ))
}

#[instrument(skip(state, payload))]
pub async fn create_ingredient(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateIngredientRequest>,
) -> Result<(StatusCode, Json<IngredientResponse>), ApiError> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::validation("Name is required"));
    }
    if repo::ingredient_name_exists(&state.db, user_id, &name).await? {
        return Err(ApiError::validation(
            "Ingredient with this name already exists",
        ));
    }

    let ingredient = repo::insert_ingredient(&state.db, user_id, &name).await?;
    info!(user_id = %user_id, ingredient_id = ingredient.id, "ingredient created");
    Ok((StatusCode::CREATED, Json(ingredient.into())))
}

// ---- recipes ----

#[instrument(skip(state))]
pub async fn list_recipes(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<RecipeListItem>>, ApiError> {
    let recipes = repo::list_recipes(&state.db, user_id).await?;
    let ids: Vec<i64> = recipes.iter().map(|r| r.id).collect();
    let mut tags = group_pairs(repo::tag_ids_by_recipe(&state.db, &ids).await?);
    let mut ingredients = group_pairs(repo::ingredient_ids_by_recipe(&state.db, &ids).await?);

    let items = recipes
        .into_iter()
        .map(|r| RecipeListItem {
            tags: tags.remove(&r.id).unwrap_or_default(),
            ingredients: ingredients.remove(&r.id).unwrap_or_default(),
            id: r.id,
            title: r.title,
            time_minutes: r.time_minutes,
            price: r.price,
        })
        .collect();
    Ok(Json(items))
}

#[instrument(skip(state))]
pub async fn get_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<RecipeDetail>, ApiError> {
    let recipe = repo::find_recipe(&state.db, user_id, id)
        .await?
        .ok_or(ApiError::NotFound)?;
    let tags = repo::tags_for_recipe(&state.db, recipe.id).await?;
    let ingredients = repo::ingredients_for_recipe(&state.db, recipe.id).await?;

    Ok(Json(RecipeDetail {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        tags: tags.into_iter().map(Into::into).collect(),
        ingredients: ingredients.into_iter().map(Into::into).collect(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<(StatusCode, Json<RecipeListItem>), ApiError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::validation("Title is required"));
    }
    let tags = dedup_ids(payload.tags);
    let ingredients = dedup_ids(payload.ingredients);
    check_owned_associations(&state.db, user_id, &tags, &ingredients).await?;

    let recipe = repo::create_recipe(
        &state.db,
        user_id,
        &title,
        payload.time_minutes,
        payload.price,
        &tags,
        &ingredients,
    )
    .await?;

    info!(user_id = %user_id, recipe_id = recipe.id, "recipe created");
    Ok((StatusCode::CREATED, Json(item_for(recipe, tags, ingredients))))
}

#[instrument(skip(state, payload))]
pub async fn put_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RecipeWriteRequest>,
) -> Result<Json<RecipeListItem>, ApiError> {
    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(ApiError::validation("Title is required"));
    }
    let tags = dedup_ids(payload.tags);
    let ingredients = dedup_ids(payload.ingredients);
    check_owned_associations(&state.db, user_id, &tags, &ingredients).await?;

    let recipe = repo::update_recipe(
        &state.db,
        user_id,
        id,
        &title,
        payload.time_minutes,
        payload.price,
        &tags,
        &ingredients,
    )
    .await?
    .ok_or(ApiError::NotFound)?;

    info!(user_id = %user_id, recipe_id = recipe.id, "recipe replaced");
    Ok(Json(item_for(recipe, tags, ingredients)))
}

#[instrument(skip(state, payload))]
pub async fn patch_recipe(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<RecipePatchRequest>,
) -> Result<Json<RecipeListItem>, ApiError> {
    let title = payload.title.map(|t| t.trim().to_string());
    if title.as_deref() == Some("") {
        return Err(ApiError::validation("Title is required"));
    }
    let tags = payload.tags.map(dedup_ids);
    let ingredients = payload.ingredients.map(dedup_ids);
    check_owned_associations(
        &state.db,
        user_id,
        tags.as_deref().unwrap_or(&[]),
        ingredients.as_deref().unwrap_or(&[]),
    )
    .await?;

    let recipe = repo::patch_recipe(
        &state.db,
        user_id,
        id,
        title.as_deref(),
        payload.time_minutes,
        payload.price,
        tags.as_deref(),
        ingredients.as_deref(),
    )
    .await?
    .ok_or(ApiError::NotFound)?;

    info!(user_id = %user_id, recipe_id = recipe.id, "recipe updated");

    // Untouched association sets are reported as currently stored.
    let tags = match tags {
        Some(ids) => ids,
        None => single_recipe_ids(repo::tag_ids_by_recipe(&state.db, &[recipe.id]).await?),
    };
    let ingredients = match ingredients {
        Some(ids) => ids,
        None => single_recipe_ids(repo::ingredient_ids_by_recipe(&state.db, &[recipe.id]).await?),
    };
    Ok(Json(item_for(recipe, tags, ingredients)))
}

// ---- helpers ----

fn item_for(recipe: Recipe, tags: Vec<i64>, ingredients: Vec<i64>) -> RecipeListItem {
    RecipeListItem {
        id: recipe.id,
        title: recipe.title,
        time_minutes: recipe.time_minutes,
        price: recipe.price,
        tags,
        ingredients,
    }
}

fn dedup_ids(mut ids: Vec<i64>) -> Vec<i64> {
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn group_pairs(pairs: Vec<(i64, i64)>) -> HashMap<i64, Vec<i64>> {
    let mut map: HashMap<i64, Vec<i64>> = HashMap::new();
    for (recipe_id, other_id) in pairs {
        map.entry(recipe_id).or_default().push(other_id);
    }
    map
}

fn single_recipe_ids(pairs: Vec<(i64, i64)>) -> Vec<i64> {
    pairs.into_iter().map(|(_, other_id)| other_id).collect()
}

/// Supplied association ids must all be rows the caller owns.
async fn check_owned_associations(
    db: &PgPool,
    user_id: Uuid,
    tag_ids: &[i64],
    ingredient_ids: &[i64],
) -> Result<(), ApiError> {
    if !tag_ids.is_empty()
        && repo::count_owned_tags(db, user_id, tag_ids).await? != tag_ids.len() as i64
    {
        return Err(ApiError::validation("Unknown tag id"));
    }
    if !ingredient_ids.is_empty()
        && repo::count_owned_ingredients(db, user_id, ingredient_ids).await?
            != ingredient_ids.len() as i64
    {
        return Err(ApiError::validation("Unknown ingredient id"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedup_ids_sorts_and_removes_duplicates() {
        assert_eq!(dedup_ids(vec![3, 1, 3, 2, 1]), vec![1, 2, 3]);
        assert!(dedup_ids(vec![]).is_empty());
    }

    #[test]
    fn group_pairs_collects_per_recipe() {
        let map = group_pairs(vec![(1, 10), (2, 20), (1, 11)]);
        assert_eq!(map[&1], vec![10, 11]);
        assert_eq!(map[&2], vec![20]);
        assert!(!map.contains_key(&3));
    }

    #[test]
    fn single_recipe_ids_drops_the_recipe_column() {
        assert_eq!(single_recipe_ids(vec![(5, 10), (5, 11)]), vec![10, 11]);
    }
}
