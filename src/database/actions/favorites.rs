use sqlx::{Pool, Postgres};

use super::recipes::with_attributes;
use crate::{
    error::{Error, QueryError},
    schema::{Id, Recipe, RecipeWithAttributes},
};

/// The user's favorited recipes, most recently favorited first.
pub async fn fetch_favorites(
    pool: &Pool<Postgres>,
    user_id: Id,
) -> Result<Vec<RecipeWithAttributes>, Error> {
    let rows: Vec<Recipe> = sqlx::query_as(
        "
        SELECT r.*
        FROM user_favorites f
        INNER JOIN recipes r ON r.id = f.recipe_id
        WHERE f.user_id = $1
        ORDER BY f.id DESC
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    with_attributes(pool, rows).await
}

/// Returns `false` when the recipe already was a favorite.
pub async fn add_to_favorites(
    pool: &Pool<Postgres>,
    user_id: Id,
    recipe_id: Id,
) -> Result<bool, Error> {
    let result = sqlx::query(
        "INSERT INTO user_favorites (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(user_id)
    .bind(recipe_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

/// Returns `false` when the recipe was not a favorite.
pub async fn remove_from_favorites(
    pool: &Pool<Postgres>,
    user_id: Id,
    recipe_id: Id,
) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM user_favorites WHERE user_id = $1 AND recipe_id = $2")
        .bind(user_id)
        .bind(recipe_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}
