use sqlx::{Pool, Postgres, QueryBuilder};

use super::attributes::{list_recipe_attributes, set_recipe_attributes};
use crate::{
    error::{Error, QueryError},
    form::{NewRecipe, RecipeChanges},
    schema::{AttributeKind, Id, Recipe, RecipeWithAttributes},
};

/// Narrows a recipe listing to recipes linked to any of the given ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<Id>>,
    pub ingredients: Option<Vec<Id>>,
}

/// Loads the tags and ingredients for a batch of recipes, keeping their order.
pub async fn with_attributes(
    pool: &Pool<Postgres>,
    recipes: Vec<Recipe>,
) -> Result<Vec<RecipeWithAttributes>, Error> {
    let ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut tags = list_recipe_attributes(pool, AttributeKind::Tag, &ids).await?;
    let mut ingredients = list_recipe_attributes(pool, AttributeKind::Ingredient, &ids).await?;

    Ok(recipes
        .into_iter()
        .map(|recipe| RecipeWithAttributes {
            tags: tags.remove(&recipe.id).unwrap_or_default(),
            ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
            recipe,
        })
        .collect())
}

pub async fn fetch_recipes(
    pool: &Pool<Postgres>,
    user_id: Id,
    filter: &RecipeFilter,
) -> Result<Vec<RecipeWithAttributes>, Error> {
    let mut query: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT r.* FROM recipes r WHERE r.user_id = ");
    query.push_bind(user_id);

    for (kind, ids) in [
        (AttributeKind::Tag, &filter.tags),
        (AttributeKind::Ingredient, &filter.ingredients),
    ] {
        if let Some(ids) = ids {
            query
                .push(format!(
                    " AND r.id IN (SELECT recipe_id FROM {} WHERE {} = ANY(",
                    kind.link_table(),
                    kind.link_column()
                ))
                .push_bind(ids.to_owned())
                .push("))");
        }
    }
    query.push(" ORDER BY r.id DESC");

    let rows: Vec<Recipe> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    with_attributes(pool, rows).await
}

/// Fetches a recipe owned by `user_id`. Other users' recipes read as missing.
pub async fn get_recipe(
    pool: &Pool<Postgres>,
    user_id: Id,
    id: Id,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_recipe_details(
    pool: &Pool<Postgres>,
    user_id: Id,
    id: Id,
) -> Result<Option<RecipeWithAttributes>, Error> {
    match get_recipe(pool, user_id, id).await? {
        Some(recipe) => Ok(with_attributes(pool, vec![recipe]).await?.pop()),
        None => Ok(None),
    }
}

pub async fn recipe_exists(pool: &Pool<Postgres>, id: Id) -> Result<bool, Error> {
    let row: Option<(Id,)> = sqlx::query_as("SELECT id FROM recipes WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row.is_some())
}

pub async fn create_recipe(
    pool: &Pool<Postgres>,
    user_id: Id,
    recipe: NewRecipe,
) -> Result<Id, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (user_id, title, description, time_minutes, price, link)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
    ",
    )
    .bind(user_id)
    .bind(&recipe.title)
    .bind(&recipe.description)
    .bind(recipe.time_minutes)
    .bind(recipe.price)
    .bind(&recipe.link)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    set_recipe_attributes(&mut tr, AttributeKind::Tag, user_id, id.0, &recipe.tags).await?;
    set_recipe_attributes(
        &mut tr,
        AttributeKind::Ingredient,
        user_id,
        id.0,
        &recipe.ingredients,
    )
    .await?;

    tr.commit().await.map_err(QueryError::from)?;

    Ok(id.0)
}

/// Applies changes to a recipe owned by `user_id`. Returns `false` when there
/// is no such recipe. Tags and ingredients are replaced only when present.
pub async fn update_recipe(
    pool: &Pool<Postgres>,
    user_id: Id,
    id: Id,
    changes: RecipeChanges,
) -> Result<bool, Error> {
    let mut tr = pool.begin().await.map_err(QueryError::from)?;

    let row: Option<(Id,)> = sqlx::query_as(
        "
        UPDATE recipes
        SET title = COALESCE($3, title),
            description = COALESCE($4, description),
            time_minutes = COALESCE($5, time_minutes),
            price = COALESCE($6, price),
            link = COALESCE($7, link)
        WHERE id = $1 AND user_id = $2
        RETURNING id
    ",
    )
    .bind(id)
    .bind(user_id)
    .bind(changes.title)
    .bind(changes.description)
    .bind(changes.time_minutes)
    .bind(changes.price)
    .bind(changes.link)
    .fetch_optional(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    if row.is_none() {
        return Ok(false);
    }

    if let Some(tags) = &changes.tags {
        set_recipe_attributes(&mut tr, AttributeKind::Tag, user_id, id, tags).await?;
    }
    if let Some(ingredients) = &changes.ingredients {
        set_recipe_attributes(&mut tr, AttributeKind::Ingredient, user_id, id, ingredients)
            .await?;
    }

    tr.commit().await.map_err(QueryError::from)?;

    Ok(true)
}

pub async fn set_recipe_image(
    pool: &Pool<Postgres>,
    user_id: Id,
    id: Id,
    image: &str,
) -> Result<Option<Recipe>, Error> {
    let row: Option<Recipe> =
        sqlx::query_as("UPDATE recipes SET image = $3 WHERE id = $1 AND user_id = $2 RETURNING *")
            .bind(id)
            .bind(user_id)
            .bind(image)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Deletes a recipe owned by `user_id` along with its links and favorites.
pub async fn delete_recipe(pool: &Pool<Postgres>, user_id: Id, id: Id) -> Result<bool, Error> {
    let result = sqlx::query("DELETE FROM recipes WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}
