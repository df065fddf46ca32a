use std::collections::HashMap;

use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{self, Reply},
    Filter,
};

use super::filters::{boxed_reply, created, no_content, update_mode, with_form};
use crate::{
    actions,
    error::HtmlError,
    form::{parse_flag, AttributeChanges, Form},
    jwt::SessionData,
    middleware::with_session,
    schema::{AttributeKind, Id},
    state::{with_state, AppState},
};

/// CRUD endpoints for one attribute kind, mounted at `/api/recipe/{tags|ingredients}/`.
pub fn routes(state: AppState, kind: AttributeKind) -> BoxedFilter<(Box<dyn Reply>,)> {
    let base = warp::path("api")
        .and(warp::path("recipe"))
        .and(warp::path(kind.plural()));
    let collection = base.clone().and(warp::path::end());
    let member = base.and(warp::path::param::<Id>()).and(warp::path::end());
    let kind = warp::any().map(move || kind);

    let list = collection
        .clone()
        .and(warp::get())
        .and(kind.clone())
        .and(with_session(state.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(list_attributes_handler);

    let create = collection
        .and(warp::post())
        .and(kind.clone())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(create_attribute_handler);

    let detail = member
        .clone()
        .and(warp::get())
        .and(kind.clone())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(attribute_detail_handler);

    let update = member
        .clone()
        .and(update_mode())
        .and(kind.clone())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(update_attribute_handler);

    let delete = member
        .and(warp::delete())
        .and(kind)
        .and(with_session(state.clone()))
        .and(with_state(state))
        .and_then(delete_attribute_handler);

    list.or(create)
        .or(detail)
        .or(update)
        .or(delete)
        .map(boxed_reply)
        .boxed()
}

async fn list_attributes_handler(
    kind: AttributeKind,
    session: SessionData,
    query: HashMap<String, String>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let assigned_only = match query.get("assigned_only") {
        Some(raw) => parse_flag("assigned_only", raw)?,
        None => false,
    };
    let list =
        actions::list_attributes(&state.pool, kind, session.user_id, assigned_only).await?;

    Ok(reply::json(&list))
}

async fn create_attribute_handler(
    kind: AttributeKind,
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let Some(name) = AttributeChanges::from_form(&form, false)?.name else {
        return Err(HtmlError::InvalidRequest.default().into());
    };
    let attribute = actions::create_attribute(&state.pool, kind, session.user_id, &name).await?;

    Ok(created(&attribute))
}

async fn attribute_detail_handler(
    id: Id,
    kind: AttributeKind,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let attribute = actions::get_attribute(&state.pool, kind, session.user_id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(reply::json(&attribute))
}

async fn update_attribute_handler(
    id: Id,
    partial: bool,
    kind: AttributeKind,
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let changes = AttributeChanges::from_form(&form, partial)?;
    let attribute = actions::update_attribute(
        &state.pool,
        kind,
        session.user_id,
        id,
        changes.name.as_deref(),
    )
    .await?
    .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(reply::json(&attribute))
}

async fn delete_attribute_handler(
    id: Id,
    kind: AttributeKind,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if !actions::delete_attribute(&state.pool, kind, session.user_id, id).await? {
        return Err(HtmlError::NotFound.default().into());
    }

    Ok(no_content())
}
