use bytes::Bytes;
use serde::Serialize;
use warp::{
    http::StatusCode,
    reject::Rejection,
    reply::{self, Reply},
    Filter,
};

use crate::{constants::MAX_FORM_BYTES, form::Form};

/// Decodes a JSON request body into a [`Form`].
pub fn with_form() -> impl Filter<Extract = (Form,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_FORM_BYTES)
        .and(warp::body::bytes())
        .and_then(|body: Bytes| async move { Form::parse(&body).map_err(Rejection::from) })
}

/// Matches `PUT` and `PATCH`, extracting whether the update is partial.
pub fn update_mode() -> impl Filter<Extract = (bool,), Error = Rejection> + Clone {
    warp::put()
        .map(|| false)
        .or(warp::patch().map(|| true))
        .unify()
}

pub fn boxed_reply<T: Reply + 'static>(reply: T) -> Box<dyn Reply> {
    Box::new(reply)
}

pub fn created<T: Serialize>(value: &T) -> reply::WithStatus<reply::Json> {
    reply::with_status(reply::json(value), StatusCode::CREATED)
}

pub fn no_content() -> reply::WithStatus<&'static str> {
    reply::with_status("", StatusCode::NO_CONTENT)
}
