use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply},
    Filter,
};

use super::filters::{boxed_reply, no_content};
use crate::{
    actions,
    error::HtmlError,
    jwt::SessionData,
    middleware::with_session,
    schema::{Id, Message, RecipeSummary},
    state::{with_state, AppState},
};

pub fn routes(state: AppState) -> BoxedFilter<(Box<dyn Reply>,)> {
    let list = warp::path!("api" / "recipe" / "favorites")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(list_favorites_handler);

    let add = warp::path!("api" / "recipe" / "favorites" / Id)
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(add_favorite_handler);

    let remove = warp::path!("api" / "recipe" / "favorites" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(remove_favorite_handler);

    list.or(add).or(remove).map(boxed_reply).boxed()
}

async fn list_favorites_handler(
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let favorites: Vec<RecipeSummary> = actions::fetch_favorites(&state.pool, session.user_id)
        .await?
        .into_iter()
        .map(|recipe| recipe.summary())
        .collect();

    Ok(reply::json(&favorites))
}

/// Any existing recipe can be favorited, not only the caller's own.
async fn add_favorite_handler(
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if !actions::recipe_exists(&state.pool, id).await? {
        return Err(HtmlError::NotFound.default().into());
    }

    let (message, status) = if actions::add_to_favorites(&state.pool, session.user_id, id).await? {
        ("Recipe added to favorites.", StatusCode::CREATED)
    } else {
        ("Recipe already in favorites.", StatusCode::OK)
    };

    Ok(reply::with_status(reply::json(&Message::new(message)), status))
}

async fn remove_favorite_handler(
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if !actions::recipe_exists(&state.pool, id).await? {
        return Err(HtmlError::NotFound.default().into());
    }

    actions::remove_from_favorites(&state.pool, session.user_id, id).await?;
    Ok(no_content())
}
