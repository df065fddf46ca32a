//! Requests that are answered without touching the database.

mod common;

use common::{request, TestApp};
use serde_json::json;
use warp::http::StatusCode;

#[tokio::test]
async fn protected_endpoints_require_a_token() {
    let app = TestApp::offline();

    for (method, path) in [
        ("GET", "/api/user/me/"),
        ("PATCH", "/api/user/me/"),
        ("GET", "/api/recipe/recipes/"),
        ("POST", "/api/recipe/recipes/"),
        ("GET", "/api/recipe/recipes/1/"),
        ("DELETE", "/api/recipe/recipes/1/"),
        ("POST", "/api/recipe/recipes/1/upload-image/"),
        ("GET", "/api/recipe/tags/"),
        ("PUT", "/api/recipe/tags/1/"),
        ("GET", "/api/recipe/ingredients/"),
        ("DELETE", "/api/recipe/ingredients/1/"),
        ("GET", "/api/recipe/favorites/"),
        ("POST", "/api/recipe/favorites/1/"),
    ] {
        let (status, body) = app.send(request(method, path, None)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED, "{method} {path}");
        assert_eq!(
            body,
            json!({ "detail": "Authentication credentials were not provided." })
        );
    }
}

#[tokio::test]
async fn malformed_tokens_are_rejected() {
    let app = TestApp::offline();

    let (status, body) = app.get("/api/recipe/recipes/", Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "detail": "Invalid token." }));

    let (status, _) = app
        .send(
            warp::test::request()
                .path("/api/user/me/")
                .header("authorization", "Basic dXNlcjpwYXNz"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_user_validates_before_saving() {
    let app = TestApp::offline();

    let (status, body) = app
        .json(
            "POST",
            "/api/user/create/",
            None,
            &json!({ "email": "test@example.com", "password": "pw", "name": "Test" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("password").is_some());

    let (status, body) = app
        .json(
            "POST",
            "/api/user/create/",
            None,
            &json!({ "email": "not-an-email", "password": "testpass123" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("email").is_some());
    assert!(body.get("name").is_some());
}

#[tokio::test]
async fn token_requires_credentials() {
    let app = TestApp::offline();

    let (status, body) = app
        .json(
            "POST",
            "/api/user/token/",
            None,
            &json!({ "email": "test@example.com", "password": "" }),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.get("password").is_some());
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let app = TestApp::offline();

    let (status, _) = app
        .send(
            request("POST", "/api/user/create/", None)
                .header("content-type", "application/json")
                .body("{not json"),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn schema_and_docs_are_public() {
    let app = TestApp::offline();

    let (status, body) = app.get("/api/schema/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["openapi"], "3.0.3");
    assert!(body["paths"]["/api/recipe/recipes/"].is_object());

    let response = request("GET", "/api/docs/", None)
        .reply(&recipe_api::server::routes(app.state.clone()))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(String::from_utf8_lossy(response.body()).contains("swagger-ui"));
}

#[tokio::test]
async fn unknown_paths_and_methods() {
    let app = TestApp::offline();

    let (status, body) = app.get("/api/unknown/", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "detail": "Not found." }));

    let (status, _) = app.send(request("DELETE", "/api/user/create/", None)).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn missing_media_is_not_found() {
    let app = TestApp::offline();

    let (status, _) = app
        .get("/static/media/uploads/recipe/missing.png", None)
        .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}
