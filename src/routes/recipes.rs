use std::collections::HashMap;

use bytes::BufMut;
use futures::TryStreamExt;
use log::error;
use warp::{
    filters::{multipart, BoxedFilter},
    reject::Rejection,
    reply::{self, Reply},
    Filter,
};

use super::filters::{boxed_reply, created, no_content, update_mode, with_form};
use crate::{
    actions::{self, RecipeFilter},
    error::{Error, HtmlError, ValidationErrors},
    form::{parse_ids, Form, NewRecipe, RecipeChanges},
    jwt::SessionData,
    media::{decode_image, save_recipe_image},
    middleware::with_session,
    schema::{AttributeKind, Id, RecipeImage, RecipeSummary},
    state::{with_state, AppState},
};

const NO_FILE: &str = "No file was submitted.";
const NOT_A_FILE: &str = "The submitted data was not a file. Check the encoding type on the form.";
const EMPTY_FILE: &str = "The submitted file is empty.";
const INVALID_IMAGE: &str =
    "Upload a valid image. The file you uploaded was either not an image or a corrupted image.";

pub fn routes(state: AppState) -> BoxedFilter<(Box<dyn Reply>,)> {
    let list = warp::path!("api" / "recipe" / "recipes")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(warp::query::<HashMap<String, String>>())
        .and(with_state(state.clone()))
        .and_then(list_recipes_handler);

    let create = warp::path!("api" / "recipe" / "recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(create_recipe_handler);

    let detail = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(recipe_detail_handler);

    let update = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(update_mode())
        .and(with_session(state.clone()))
        .and(with_form())
        .and(with_state(state.clone()))
        .and_then(update_recipe_handler);

    let delete = warp::path!("api" / "recipe" / "recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .and_then(delete_recipe_handler);

    let upload = warp::path!("api" / "recipe" / "recipes" / Id / "upload-image")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(multipart::form().max_length(state.config.max_upload_bytes))
        .and(with_state(state))
        .and_then(upload_image_handler);

    list.or(create)
        .or(detail)
        .or(update)
        .or(delete)
        .or(upload)
        .map(boxed_reply)
        .boxed()
}

fn recipe_filter(query: &HashMap<String, String>) -> Result<RecipeFilter, Error> {
    let ids = |kind: AttributeKind| {
        query
            .get(kind.plural())
            .map(|raw| parse_ids(kind.plural(), raw))
            .transpose()
    };

    Ok(RecipeFilter {
        tags: ids(AttributeKind::Tag)?,
        ingredients: ids(AttributeKind::Ingredient)?,
    })
}

async fn detail_reply(state: &AppState, user_id: Id, id: Id) -> Result<reply::Json, Error> {
    let recipe = actions::get_recipe_details(&state.pool, user_id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(reply::json(
        &recipe.detail(|path| state.config.media_url_for(path)),
    ))
}

async fn list_recipes_handler(
    session: SessionData,
    query: HashMap<String, String>,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let filter = recipe_filter(&query)?;
    let recipes: Vec<RecipeSummary> = actions::fetch_recipes(&state.pool, session.user_id, &filter)
        .await?
        .into_iter()
        .map(|recipe| recipe.summary())
        .collect();

    Ok(reply::json(&recipes))
}

async fn create_recipe_handler(
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let recipe = NewRecipe::try_from(RecipeChanges::from_form(&form, false)?)?;
    let id = actions::create_recipe(&state.pool, session.user_id, recipe).await?;
    let recipe = actions::get_recipe_details(&state.pool, session.user_id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(created(
        &recipe.detail(|path| state.config.media_url_for(path)),
    ))
}

async fn recipe_detail_handler(
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    Ok(detail_reply(&state, session.user_id, id).await?)
}

async fn update_recipe_handler(
    id: Id,
    partial: bool,
    session: SessionData,
    form: Form,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    let changes = RecipeChanges::from_form(&form, partial)?;
    if !actions::update_recipe(&state.pool, session.user_id, id, changes).await? {
        return Err(HtmlError::NotFound.default().into());
    }

    Ok(detail_reply(&state, session.user_id, id).await?)
}

async fn delete_recipe_handler(
    id: Id,
    session: SessionData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if !actions::delete_recipe(&state.pool, session.user_id, id).await? {
        return Err(HtmlError::NotFound.default().into());
    }

    Ok(no_content())
}

/// Reads the `image` field of a multipart upload.
async fn read_image_field(form: multipart::FormData) -> Result<Vec<u8>, Error> {
    let invalid = |e: warp::Error| HtmlError::InvalidRequest.new(&format!("Multipart form parse error - {e}"));
    let mut form = Box::pin(form);

    while let Some(part) = form.try_next().await.map_err(invalid)? {
        if part.name() != "image" {
            continue;
        }
        if part.filename().is_none() {
            return Err(ValidationErrors::single("image", NOT_A_FILE).into());
        }

        let data = part
            .stream()
            .try_fold(Vec::<u8>::new(), |mut data, buf| async move {
                data.put(buf);
                Ok(data)
            })
            .await
            .map_err(invalid)?;

        return Ok(data);
    }

    Err(ValidationErrors::single("image", NO_FILE).into())
}

async fn upload_image_handler(
    id: Id,
    session: SessionData,
    form: multipart::FormData,
    state: AppState,
) -> Result<impl Reply, Rejection> {
    if actions::get_recipe(&state.pool, session.user_id, id)
        .await?
        .is_none()
    {
        return Err(HtmlError::NotFound.default().into());
    }

    let data = read_image_field(form).await?;
    if data.is_empty() {
        return Err(Error::from(ValidationErrors::single("image", EMPTY_FILE)).into());
    }
    let (format, data) = tokio::task::spawn_blocking(move || (decode_image(&data), data))
        .await
        .map_err(|e| {
            error!("Image decoding task failed: {e}");
            HtmlError::InternalError.default()
        })?;
    let format =
        format.ok_or_else(|| Error::from(ValidationErrors::single("image", INVALID_IMAGE)))?;

    let path = save_recipe_image(&state.config.media_root, format, &data).await?;
    let recipe = actions::set_recipe_image(&state.pool, session.user_id, id, &path)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(reply::json(&RecipeImage {
        id: recipe.id,
        image: recipe
            .image
            .as_deref()
            .map(|path| state.config.media_url_for(path)),
    }))
}
