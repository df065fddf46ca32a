use std::{convert::Infallible, sync::Arc};

use chrono::Duration;
use serde_json::Value;
use sqlx::{Pool, Postgres};
use warp::Filter;

use crate::{config::Config, docs::openapi_document, error::Error, jwt::TokenKey};

/// Shared handles every request handler needs.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool<Postgres>,
    pub config: Arc<Config>,
    pub keys: Arc<TokenKey>,
    pub openapi: Arc<Value>,
}

impl AppState {
    pub fn new(pool: Pool<Postgres>, config: Config) -> Result<Self, Error> {
        let keys = TokenKey::new(&config.secret_key, Duration::hours(config.token_ttl_hours))?;
        let openapi = openapi_document(&config);

        Ok(Self {
            pool,
            config: Arc::new(config),
            keys: Arc::new(keys),
            openapi: Arc::new(openapi),
        })
    }
}

pub fn with_state(state: AppState) -> impl Filter<Extract = (AppState,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}
