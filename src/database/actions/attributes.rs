use std::collections::HashMap;

use sqlx::{PgConnection, Pool, Postgres};

use crate::{
    error::{Error, QueryError},
    schema::{Attribute, AttributeKind, Id, LinkedAttribute},
};

pub async fn list_attributes(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    user_id: Id,
    assigned_only: bool,
) -> Result<Vec<Attribute>, Error> {
    let assigned = if assigned_only {
        format!(
            "AND EXISTS (SELECT 1 FROM {} l WHERE l.{} = a.id)",
            kind.link_table(),
            kind.link_column()
        )
    } else {
        String::new()
    };

    let list: Vec<Attribute> = sqlx::query_as(&format!(
        "SELECT a.id, a.name FROM {} a WHERE a.user_id = $1 {assigned} ORDER BY a.name DESC, a.id DESC",
        kind.table()
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

pub async fn get_attribute(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    user_id: Id,
    id: Id,
) -> Result<Option<Attribute>, Error> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "SELECT id, name FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn create_attribute(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    user_id: Id,
    name: &str,
) -> Result<Attribute, Error> {
    let row: Attribute = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id, name",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

/// Renames an attribute owned by `user_id`. `None` when there is no such row.
pub async fn update_attribute(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    user_id: Id,
    id: Id,
    name: Option<&str>,
) -> Result<Option<Attribute>, Error> {
    let row: Option<Attribute> = sqlx::query_as(&format!(
        "UPDATE {} SET name = COALESCE($3, name) WHERE id = $1 AND user_id = $2 RETURNING id, name",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn delete_attribute(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    user_id: Id,
    id: Id,
) -> Result<bool, Error> {
    let result = sqlx::query(&format!(
        "DELETE FROM {} WHERE id = $1 AND user_id = $2",
        kind.table()
    ))
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(result.rows_affected() > 0)
}

/// Finds the caller's attribute with this exact name, creating it when missing.
pub async fn get_or_create_attribute(
    conn: &mut PgConnection,
    kind: AttributeKind,
    user_id: Id,
    name: &str,
) -> Result<Id, Error> {
    let existing: Option<(Id,)> = sqlx::query_as(&format!(
        "SELECT id FROM {} WHERE user_id = $1 AND name = $2 ORDER BY id LIMIT 1",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .fetch_optional(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    if let Some((id,)) = existing {
        return Ok(id);
    }

    let id: (Id,) = sqlx::query_as(&format!(
        "INSERT INTO {} (user_id, name) VALUES ($1, $2) RETURNING id",
        kind.table()
    ))
    .bind(user_id)
    .bind(name)
    .fetch_one(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    Ok(id.0)
}

/// Replaces the attributes linked to a recipe with the named ones.
pub async fn set_recipe_attributes(
    conn: &mut PgConnection,
    kind: AttributeKind,
    user_id: Id,
    recipe_id: Id,
    names: &[String],
) -> Result<(), Error> {
    sqlx::query(&format!(
        "DELETE FROM {} WHERE recipe_id = $1",
        kind.link_table()
    ))
    .bind(recipe_id)
    .execute(&mut *conn)
    .await
    .map_err(QueryError::from)?;

    for name in names {
        let attribute_id = get_or_create_attribute(&mut *conn, kind, user_id, name).await?;

        sqlx::query(&format!(
            "INSERT INTO {} (recipe_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.link_table(),
            kind.link_column()
        ))
        .bind(recipe_id)
        .bind(attribute_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;
    }

    Ok(())
}

/// Attributes of each listed recipe, keyed by recipe id.
pub async fn list_recipe_attributes(
    pool: &Pool<Postgres>,
    kind: AttributeKind,
    recipe_ids: &[Id],
) -> Result<HashMap<Id, Vec<Attribute>>, Error> {
    let mut hashmap: HashMap<Id, Vec<Attribute>> = HashMap::new();
    if recipe_ids.is_empty() {
        return Ok(hashmap);
    }

    let rows: Vec<LinkedAttribute> = sqlx::query_as(&format!(
        "
        SELECT l.recipe_id AS recipe_id, a.id AS id, a.name AS name
        FROM {} l
        INNER JOIN {} a ON a.id = l.{}
        WHERE l.recipe_id = ANY($1)
        ORDER BY a.id
    ",
        kind.link_table(),
        kind.table(),
        kind.link_column()
    ))
    .bind(recipe_ids.to_vec())
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    rows.into_iter().for_each(|row| {
        hashmap
            .entry(row.recipe_id)
            .or_default()
            .push(Attribute::from(row))
    });

    Ok(hashmap)
}
