use std::fmt;

use anyhow::Context;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

impl fmt::Display for Ingredient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub created_at: OffsetDateTime,
}

// ---- tags ----

pub async fn list_tags(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT id, user_id, name
        FROM tags
        WHERE user_id = $1
        ORDER BY name DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn tag_name_exists(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM tags WHERE user_id = $1 AND name = $2
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

pub async fn insert_tag(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Tag> {
    let tag = sqlx::query_as::<_, Tag>(
        r#"
        INSERT INTO tags (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(tag)
}

/// How many of the given tag ids belong to the user.
pub async fn count_owned_tags(db: &PgPool, user_id: Uuid, ids: &[i64]) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM tags WHERE user_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(user_id)
    .bind(ids)
    .fetch_one(db)
    .await?;
    Ok(count)
}

// ---- ingredients ----

pub async fn list_ingredients(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Ingredient>> {
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT id, user_id, name
        FROM ingredients
        WHERE user_id = $1
        ORDER BY name DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn ingredient_name_exists(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
) -> anyhow::Result<bool> {
    let row: Option<(i64,)> = sqlx::query_as(
        r#"
        SELECT id FROM ingredients WHERE user_id = $1 AND name = $2
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_optional(db)
    .await?;
    Ok(row.is_some())
}

pub async fn insert_ingredient(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
) -> anyhow::Result<Ingredient> {
    let ingredient = sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (user_id, name)
        VALUES ($1, $2)
        RETURNING id, user_id, name
        "#,
    )
    .bind(user_id)
    .bind(name)
    .fetch_one(db)
    .await?;
    Ok(ingredient)
}

pub async fn count_owned_ingredients(
    db: &PgPool,
    user_id: Uuid,
    ids: &[i64],
) -> anyhow::Result<i64> {
    let (count,): (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM ingredients WHERE user_id = $1 AND id = ANY($2)
        "#,
    )
    .bind(user_id)
    .bind(ids)
    .fetch_one(db)
    .await?;
    Ok(count)
}

// ---- recipes ----

pub async fn list_recipes(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Recipe>> {
    let rows = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, time_minutes, price, created_at
        FROM recipes
        WHERE user_id = $1
        ORDER BY id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_recipe(db: &PgPool, user_id: Uuid, id: i64) -> anyhow::Result<Option<Recipe>> {
    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        SELECT id, user_id, title, time_minutes, price, created_at
        FROM recipes
        WHERE id = $1 AND user_id = $2
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(db)
    .await?;
    Ok(recipe)
}

pub async fn create_recipe(
    db: &PgPool,
    user_id: Uuid,
    title: &str,
    time_minutes: i32,
    price: Decimal,
    tag_ids: &[i64],
    ingredient_ids: &[i64],
) -> anyhow::Result<Recipe> {
    let mut tx = db.begin().await.context("begin tx")?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (user_id, title, time_minutes, price)
        VALUES ($1, $2, $3, $4)
        RETURNING id, user_id, title, time_minutes, price, created_at
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .fetch_one(&mut *tx)
    .await?;

    replace_tags_tx(&mut tx, recipe.id, tag_ids).await?;
    replace_ingredients_tx(&mut tx, recipe.id, ingredient_ids).await?;

    tx.commit().await.context("commit tx")?;
    Ok(recipe)
}

/// Full replace: all scalar fields overwritten, both association sets
/// replaced with exactly what was supplied. `None` means the id does not
/// exist for this user.
pub async fn update_recipe(
    db: &PgPool,
    user_id: Uuid,
    id: i64,
    title: &str,
    time_minutes: i32,
    price: Decimal,
    tag_ids: &[i64],
    ingredient_ids: &[i64],
) -> anyhow::Result<Option<Recipe>> {
    let mut tx = db.begin().await.context("begin tx")?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET title = $3, time_minutes = $4, price = $5
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, time_minutes, price, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(recipe) = recipe else {
        tx.rollback().await.context("rollback tx")?;
        return Ok(None);
    };

    replace_tags_tx(&mut tx, recipe.id, tag_ids).await?;
    replace_ingredients_tx(&mut tx, recipe.id, ingredient_ids).await?;

    tx.commit().await.context("commit tx")?;
    Ok(Some(recipe))
}

/// Partial merge: omitted scalars keep their value, an association set is
/// replaced only when supplied.
pub async fn patch_recipe(
    db: &PgPool,
    user_id: Uuid,
    id: i64,
    title: Option<&str>,
    time_minutes: Option<i32>,
    price: Option<Decimal>,
    tag_ids: Option<&[i64]>,
    ingredient_ids: Option<&[i64]>,
) -> anyhow::Result<Option<Recipe>> {
    let mut tx = db.begin().await.context("begin tx")?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET title = COALESCE($3, title),
            time_minutes = COALESCE($4, time_minutes),
            price = COALESCE($5, price)
        WHERE id = $1 AND user_id = $2
        RETURNING id, user_id, title, time_minutes, price, created_at
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(title)
    .bind(time_minutes)
    .bind(price)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(recipe) = recipe else {
        tx.rollback().await.context("rollback tx")?;
        return Ok(None);
    };

    if let Some(tag_ids) = tag_ids {
        replace_tags_tx(&mut tx, recipe.id, tag_ids).await?;
    }
    if let Some(ingredient_ids) = ingredient_ids {
        replace_ingredients_tx(&mut tx, recipe.id, ingredient_ids).await?;
    }

    tx.commit().await.context("commit tx")?;
    Ok(Some(recipe))
}

async fn replace_tags_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    tag_ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear recipe tags")?;
    for tag_id in tag_ids {
        sqlx::query("INSERT INTO recipe_tags (recipe_id, tag_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(tag_id)
            .execute(&mut **tx)
            .await
            .context("link recipe tag")?;
    }
    Ok(())
}

async fn replace_ingredients_tx(
    tx: &mut Transaction<'_, Postgres>,
    recipe_id: i64,
    ingredient_ids: &[i64],
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM recipe_ingredients WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut **tx)
        .await
        .context("clear recipe ingredients")?;
    for ingredient_id in ingredient_ids {
        sqlx::query("INSERT INTO recipe_ingredients (recipe_id, ingredient_id) VALUES ($1, $2)")
            .bind(recipe_id)
            .bind(ingredient_id)
            .execute(&mut **tx)
            .await
            .context("link recipe ingredient")?;
    }
    Ok(())
}

// ---- association reads ----

/// (recipe_id, tag_id) pairs for a batch of recipes.
pub async fn tag_ids_by_recipe(db: &PgPool, recipe_ids: &[i64]) -> anyhow::Result<Vec<(i64, i64)>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT recipe_id, tag_id
        FROM recipe_tags
        WHERE recipe_id = ANY($1)
        ORDER BY tag_id
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn ingredient_ids_by_recipe(
    db: &PgPool,
    recipe_ids: &[i64],
) -> anyhow::Result<Vec<(i64, i64)>> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
        SELECT recipe_id, ingredient_id
        FROM recipe_ingredients
        WHERE recipe_id = ANY($1)
        ORDER BY ingredient_id
        "#,
    )
    .bind(recipe_ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn tags_for_recipe(db: &PgPool, recipe_id: i64) -> anyhow::Result<Vec<Tag>> {
    let rows = sqlx::query_as::<_, Tag>(
        r#"
        SELECT t.id, t.user_id, t.name
        FROM tags t
        JOIN recipe_tags rt ON rt.tag_id = t.id
        WHERE rt.recipe_id = $1
        ORDER BY t.name DESC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn ingredients_for_recipe(
    db: &PgPool,
    recipe_id: i64,
) -> anyhow::Result<Vec<Ingredient>> {
    let rows = sqlx::query_as::<_, Ingredient>(
        r#"
        SELECT i.id, i.user_id, i.name
        FROM ingredients i
        JOIN recipe_ingredients ri ON ri.ingredient_id = i.id
        WHERE ri.recipe_id = $1
        ORDER BY i.name DESC
        "#,
    )
    .bind(recipe_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_displays_as_its_name() {
        let tag = Tag {
            id: 1,
            user_id: Uuid::new_v4(),
            name: "Vegan".into(),
        };
        assert_eq!(tag.to_string(), "Vegan");
    }

    #[test]
    fn ingredient_displays_as_its_name() {
        let ingredient = Ingredient {
            id: 1,
            user_id: Uuid::new_v4(),
            name: "Kale".into(),
        };
        assert_eq!(ingredient.to_string(), "Kale");
    }
}
