mod common;

use common::{request, TestApp};
use recipe_api::actions;
use serde_json::{json, Value};
use warp::http::StatusCode;

async fn create_recipe(app: &TestApp, token: &str, title: &str) -> Value {
    let (status, body) = app
        .json(
            "POST",
            "/api/recipe/recipes/",
            Some(token),
            &json!({ "title": title, "time_minutes": 10, "price": "3.00" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    body
}

fn favorite_url(id: &Value) -> String {
    format!("/api/recipe/favorites/{id}/")
}

#[tokio::test]
async fn add_list_and_remove_favorites() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (user, token) = app.user().await;
    let (_, other_token) = app.user().await;
    let own = create_recipe(&app, &token, "Own recipe").await;
    let foreign = create_recipe(&app, &other_token, "Someone else's recipe").await;

    let (status, body) = app.send(request("POST", &favorite_url(&own["id"]), Some(&token))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body, json!({ "detail": "Recipe added to favorites." }));

    let (status, _) = app
        .send(request("POST", &favorite_url(&foreign["id"]), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app.get("/api/recipe/favorites/", Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    let titles: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|recipe| recipe["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Someone else's recipe", "Own recipe"]);

    let (status, _) = app
        .send(request("DELETE", &favorite_url(&own["id"]), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let remaining = actions::fetch_favorites(&app.state.pool, user.id)
        .await
        .unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].recipe.id, foreign["id"].as_i64().unwrap() as i32);
}

#[tokio::test]
async fn adding_twice_reports_existing_favorite() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;
    let recipe = create_recipe(&app, &token, "Pancakes").await;

    app.send(request("POST", &favorite_url(&recipe["id"]), Some(&token)))
        .await;
    let (status, body) = app
        .send(request("POST", &favorite_url(&recipe["id"]), Some(&token)))
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "detail": "Recipe already in favorites." }));
}

#[tokio::test]
async fn unknown_recipe_cannot_be_favorited() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;

    let (status, _) = app
        .send(request("POST", "/api/recipe/favorites/2147483647/", Some(&token)))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_recipe_cannot_be_unfavorited() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;

    let (status, body) = app
        .send(request("DELETE", "/api/recipe/favorites/2147483647/", Some(&token)))
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));
}

#[tokio::test]
async fn removing_a_non_favorite_succeeds() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;
    let recipe = create_recipe(&app, &token, "Soup").await;

    let (status, _) = app
        .send(request("DELETE", &favorite_url(&recipe["id"]), Some(&token)))
        .await;

    assert_eq!(status, StatusCode::NO_CONTENT);
}
