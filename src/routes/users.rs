use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{self, Reply},
    Filter,
};

use super::filters::{boxed_reply, created, update_mode, with_form};
use crate::{
    actions,
    error::HtmlError,
    form::{Credentials, Form, UserChanges},
    jwt::SessionData,
    middleware::with_session,
    schema::{TokenResponse, UserProfile},
    state::{with_state, AppState},
};

pub fn routes(state: AppState) -> BoxedFilter<(Box<dyn Reply>,)> {
    let create = warp::path!("api" / "user" / "create")
        .and(warp::post())
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(create_user_handler);

    let token = warp::path!("api" / "user" / "token")
        .and(warp::post())
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(token_handler);

    let me = warp::path!("api" / "user" / "me")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(profile_handler);

    let update = warp::path!("api" / "user" / "me")
        .and(update_mode())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state))
        .and_then(update_profile_handler);

    create
        .or(token)
        .or(me)
        .or(update)
        .map(boxed_reply)
        .boxed()
}

async fn create_user_handler(form: Form, state: AppState) -> Result<impl Reply, Rejection> {
    let changes = UserChanges::from_form(&form, false)?;
    let (Some(email), Some(password), Some(name)) =
        (changes.email, changes.password, changes.name)
    else {
        return Err(HtmlError::InvalidRequest.default().into());
    };

    let user = actions::create_user(&state.pool, &email, &password, &name).await?;

    Ok(created(&UserProfile::from(&user)))
}

async fn token_handler(form: Form, state: AppState) -> Result<impl Reply, Rejection> {
    let credentials = Credentials::from_form(&form)?;
    let token = actions::login_user(
        &state.pool,
        &state.keys,
        &credentials.email,
        &credentials.password,
    )
    .await?;

    Ok(reply::json(&TokenResponse { token }))
}

async fn profile_handler(session: SessionData, state: AppState) -> Result<impl Reply, Rejection> {
    let user = actions::get_user_by_id(&state.pool, session.user_id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(reply::json(&UserProfile::from(&user)))
}

async fn update_profile_handler(
    partial: bool,
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let changes = UserChanges::from_form(&form, partial)?;
    let user = actions::update_user(&state.pool, session.user_id, changes)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(reply::json(&UserProfile::from(&user)))
}
