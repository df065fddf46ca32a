//! Shared helpers for the HTTP integration tests.
//!
//! Database backed tests need `RECIPE_API_TEST_DATABASE_URL` pointing at a
//! disposable Postgres database. When it is unset they log a notice and
//! return early.
#![allow(dead_code)]

use std::{io::Cursor, path::PathBuf};

use image::{DynamicImage, ImageFormat};
use recipe_api::{
    actions, config::Config, connection, jwt::TokenKey, schema::User, server, state::AppState,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;
use warp::{http::StatusCode, test::RequestBuilder};

pub const TEST_DATABASE_ENV: &str = "RECIPE_API_TEST_DATABASE_URL";
pub const TEST_PASSWORD: &str = "testpass123";

/// PNG signature and IHDR tag with no image data behind them.
pub const PNG_HEADER: &[u8] = &[
    0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, b'I', b'H', b'D', b'R',
];

/// A small, fully decodable PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    DynamicImage::new_rgb8(8, 8)
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .unwrap();
    data
}

pub fn test_config(database_url: &str, media_root: PathBuf) -> Config {
    let media_root = media_root.to_string_lossy().to_string();
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(database_url.to_string()),
        "SECRET_KEY" => Some(String::from("integration-test-secret")),
        "MEDIA_ROOT" => Some(media_root.clone()),
        _ => None,
    })
    .unwrap()
}

fn temp_media_root() -> PathBuf {
    std::env::temp_dir().join(format!("recipe-api-test-{}", Uuid::new_v4()))
}

pub struct TestApp {
    pub state: AppState,
}

impl TestApp {
    /// App state over a pool that never connects, for requests rejected
    /// before any query runs.
    pub fn offline() -> Self {
        let config = test_config("postgres://localhost:1/unused", temp_media_root());
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .connect_lazy(&config.database_url)
            .unwrap();

        Self {
            state: AppState::new(pool, config).unwrap(),
        }
    }

    /// App state over the test database, migrated. `None` when no test
    /// database is configured.
    pub async fn database() -> Option<Self> {
        let Ok(url) = std::env::var(TEST_DATABASE_ENV) else {
            eprintln!("{TEST_DATABASE_ENV} not set, skipping database test");
            return None;
        };

        let config = test_config(&url, temp_media_root());
        let pool = connection::connect(&config).await.unwrap();
        connection::migrate(&pool).await.unwrap();

        Some(Self {
            state: AppState::new(pool, config).unwrap(),
        })
    }

    pub fn keys(&self) -> &TokenKey {
        &self.state.keys
    }

    /// A fresh user with a unique email and a valid token.
    pub async fn user(&self) -> (User, String) {
        let email = unique_email();
        let user = actions::create_user(&self.state.pool, &email, TEST_PASSWORD, "Test Name")
            .await
            .unwrap();
        let token = self.keys().generate_jwt_session(&user).unwrap();

        (user, token)
    }

    pub async fn send(&self, request: RequestBuilder) -> (StatusCode, Value) {
        let response = request.reply(&server::routes(self.state.clone())).await;
        let status = response.status();
        let body = if response.body().is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(response.body()).unwrap_or(Value::Null)
        };

        (status, body)
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", path, token)).await
    }

    pub async fn json(
        &self,
        method: &str,
        path: &str,
        token: Option<&str>,
        body: &Value,
    ) -> (StatusCode, Value) {
        self.send(request(method, path, token).json(body)).await
    }
}

pub fn unique_email() -> String {
    format!("user-{}@example.com", Uuid::new_v4())
}

pub fn request(method: &str, path: &str, token: Option<&str>) -> RequestBuilder {
    let request = warp::test::request().method(method).path(path);
    match token {
        Some(token) => request.header("authorization", format!("Token {token}")),
        None => request,
    }
}

/// A `multipart/form-data` body holding one field.
pub fn multipart_body(field: &str, filename: Option<&str>, data: &[u8]) -> (String, Vec<u8>) {
    let boundary = "recipe-api-test-boundary";
    let disposition = match filename {
        Some(filename) => format!("form-data; name=\"{field}\"; filename=\"{filename}\""),
        None => format!("form-data; name=\"{field}\""),
    };

    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: {disposition}\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}
