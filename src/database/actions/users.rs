use log::{info, warn};
use sqlx::{Pool, Postgres};

use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::TokenKey,
    },
    error::{Error, HtmlError, QueryError, ValidationErrors},
    form::{normalize_email, UserChanges},
    schema::{Id, User},
};

const INVALID_CREDENTIALS: &str = "Unable to authenticate with provided credentials.";
const DUPLICATE_EMAIL: &str = "user with this email already exists.";

pub async fn get_user(pool: &Pool<Postgres>, email: &str) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(pool: &Pool<Postgres>, user_id: Id) -> Result<Option<User>, Error> {
    let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(row)
}

fn hash(password: &str) -> Result<String, Error> {
    hash_password(password).map_err(|e| {
        warn!("Password hashing failed: {e}");
        HtmlError::InternalError.default()
    })
}

/// Inserts a user row. `password` must already be hashed.
async fn register_user(
    pool: &Pool<Postgres>,
    email: &str,
    password: &str,
    name: &str,
    is_superuser: bool,
) -> Result<User, Error> {
    let row: Option<User> = sqlx::query_as(
        "
        INSERT INTO users (email, password, name, is_staff, is_superuser)
        VALUES ($1, $2, $3, $4, $4)
        ON CONFLICT (email) DO NOTHING RETURNING *;
    ",
    )
    .bind(email)
    .bind(password)
    .bind(name)
    .bind(is_superuser)
    .fetch_optional(pool)
    .await
    .map_err(QueryError::from)?;

    row.ok_or_else(|| ValidationErrors::single("email", DUPLICATE_EMAIL).into())
}

async fn create_account(
    pool: &Pool<Postgres>,
    email: &str,
    password: &str,
    name: &str,
    is_superuser: bool,
) -> Result<User, Error> {
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(HtmlError::InvalidRequest.new("Users must have an email address."));
    }

    let user = register_user(pool, &email, &hash(password)?, name, is_superuser).await?;
    info!("Created user {} ({})", user.id, user.email);

    Ok(user)
}

/// Creates a regular user, normalizing the email and hashing the password.
pub async fn create_user(
    pool: &Pool<Postgres>,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, Error> {
    create_account(pool, email, password, name, false).await
}

/// Creates a user with the staff and superuser flags set.
pub async fn create_superuser(
    pool: &Pool<Postgres>,
    email: &str,
    password: &str,
    name: &str,
) -> Result<User, Error> {
    create_account(pool, email, password, name, true).await
}

/// Checks the credentials of an active user.
pub async fn authenticate_user(
    pool: &Pool<Postgres>,
    email: &str,
    password: &str,
) -> Result<User, Error> {
    let invalid =
        || -> Error { ValidationErrors::single("non_field_errors", INVALID_CREDENTIALS).into() };

    let user = match get_user(pool, &normalize_email(email)).await? {
        Some(user) if user.is_active => user,
        _ => return Err(invalid()),
    };

    let authenticated = verify_password(password, &user.password).map_err(|e| {
        warn!("Stored password hash for user {} is unreadable: {e}", user.id);
        invalid()
    })?;
    if !authenticated {
        return Err(invalid());
    }

    Ok(user)
}

/// Authenticates a user and issues a session token.
pub async fn login_user(
    pool: &Pool<Postgres>,
    keys: &TokenKey,
    email: &str,
    password: &str,
) -> Result<String, Error> {
    let user = authenticate_user(pool, email, password).await?;

    sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    keys.generate_jwt_session(&user)
}

pub async fn update_user(
    pool: &Pool<Postgres>,
    user_id: Id,
    changes: UserChanges,
) -> Result<Option<User>, Error> {
    let password = match &changes.password {
        Some(password) => Some(hash(password)?),
        None => None,
    };

    let row: Option<User> = sqlx::query_as(
        "
        UPDATE users
        SET email = COALESCE($2, email), name = COALESCE($3, name), password = COALESCE($4, password)
        WHERE id = $1
        RETURNING *
    ",
    )
    .bind(user_id)
    .bind(changes.email)
    .bind(changes.name)
    .bind(password)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        let error = QueryError::from(e);
        if error.is_unique_violation() {
            ValidationErrors::single("email", DUPLICATE_EMAIL).into()
        } else {
            Error::from(error)
        }
    })?;

    Ok(row)
}
