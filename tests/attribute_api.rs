mod common;

use common::{request, TestApp};
use recipe_api::{actions, schema::AttributeKind};
use serde_json::{json, Value};
use warp::http::StatusCode;

const TAGS_URL: &str = "/api/recipe/tags/";
const INGREDIENTS_URL: &str = "/api/recipe/ingredients/";

fn names(body: &Value) -> Vec<&str> {
    body.as_array()
        .unwrap()
        .iter()
        .map(|item| item["name"].as_str().unwrap())
        .collect()
}

#[tokio::test]
async fn list_is_limited_to_user_and_sorted_by_name() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (user, token) = app.user().await;
    let (other, _) = app.user().await;

    for name in ["Dessert", "Vegan"] {
        actions::create_attribute(&app.state.pool, AttributeKind::Tag, user.id, name)
            .await
            .unwrap();
    }
    actions::create_attribute(&app.state.pool, AttributeKind::Tag, other.id, "Fruity")
        .await
        .unwrap();

    let (status, body) = app.get(TAGS_URL, Some(&token)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Vegan", "Dessert"]);
}

#[tokio::test]
async fn create_update_and_delete_ingredient() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;

    let (status, created) = app
        .json("POST", INGREDIENTS_URL, Some(&token), &json!({ "name": "Kale" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["name"], "Kale");

    let url = format!("{INGREDIENTS_URL}{}/", created["id"]);
    let (status, body) = app
        .json("PATCH", &url, Some(&token), &json!({ "name": "Coriander" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "id": created["id"], "name": "Coriander" }));

    let (status, body) = app.get(&url, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Coriander");

    let (status, _) = app.send(request("DELETE", &url, Some(&token))).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.get(&url, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn blank_names_are_rejected() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;

    let (status, body) = app
        .json("POST", TAGS_URL, Some(&token), &json!({ "name": "  " }))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("name").is_some());
}

#[tokio::test]
async fn other_users_attributes_are_not_found() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;
    let (other, _) = app.user().await;
    let tag = actions::create_attribute(&app.state.pool, AttributeKind::Tag, other.id, "Lunch")
        .await
        .unwrap();
    let url = format!("{TAGS_URL}{}/", tag.id);

    let (status, _) = app
        .json("PUT", &url, Some(&token), &json!({ "name": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(request("DELETE", &url, Some(&token))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn assigned_only_filters_unique_attributes() {
    let Some(app) = TestApp::database().await else {
        return;
    };
    let (_, token) = app.user().await;

    for title in ["Eggs Benedict", "Herb Eggs"] {
        let (status, _) = app
            .json(
                "POST",
                "/api/recipe/recipes/",
                Some(&token),
                &json!({
                    "title": title,
                    "time_minutes": 5,
                    "price": "4.00",
                    "ingredients": [{ "name": "Eggs" }],
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    app.json("POST", INGREDIENTS_URL, Some(&token), &json!({ "name": "Lentils" }))
        .await;

    let (status, body) = app
        .get(&format!("{INGREDIENTS_URL}?assigned_only=1"), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(names(&body), vec!["Eggs"]);

    let (_, body) = app
        .get(&format!("{INGREDIENTS_URL}?assigned_only=0"), Some(&token))
        .await;
    assert_eq!(names(&body), vec!["Lentils", "Eggs"]);
}
