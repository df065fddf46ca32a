use std::{
    convert::Infallible,
    fmt::{self, Display},
};

use log::{debug, error};
use serde_json::{json, Map, Value};
use warp::{
    http::StatusCode,
    reject::{self, Reject, Rejection},
    reply::{self, Reply, Response},
};

/// HTTP-facing error carried through warp rejections.
///
/// `details` replaces the default `{"detail": info}` body when present, which
/// is how field-level validation messages reach the client.
#[derive(Debug, Clone)]
pub struct Error {
    pub code: u16,
    pub info: Option<String>,
    pub details: Option<Value>,
}

impl Error {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> Value {
        match &self.details {
            Some(details) => details.clone(),
            None => json!({ "detail": self.info.clone().unwrap_or_default() }),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.info, &self.details) {
            (Some(info), _) => write!(f, "{} {}", self.code, info),
            (None, Some(details)) => write!(f, "{} {}", self.code, details),
            (None, None) => write!(f, "{}", self.code),
        }
    }
}

impl std::error::Error for Error {}
impl Reject for Error {}

impl Reply for Error {
    fn into_response(self) -> Response {
        reply::with_status(reply::json(&self.body()), self.status()).into_response()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlError {
    InvalidRequest,
    Unauthorized,
    InvalidSession,
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    UnsupportedMediaType,
    InternalError,
}

impl HtmlError {
    pub fn code(&self) -> u16 {
        match self {
            HtmlError::InvalidRequest => 400,
            HtmlError::Unauthorized | HtmlError::InvalidSession => 401,
            HtmlError::NotFound => 404,
            HtmlError::MethodNotAllowed => 405,
            HtmlError::PayloadTooLarge => 413,
            HtmlError::UnsupportedMediaType => 415,
            HtmlError::InternalError => 500,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            HtmlError::InvalidRequest => "Invalid request.",
            HtmlError::Unauthorized => "Authentication credentials were not provided.",
            HtmlError::InvalidSession => "Invalid token.",
            HtmlError::NotFound => "Not found.",
            HtmlError::MethodNotAllowed => "Method not allowed.",
            HtmlError::PayloadTooLarge => "Request entity too large.",
            HtmlError::UnsupportedMediaType => "Unsupported media type in request.",
            HtmlError::InternalError => "Internal server error.",
        }
    }

    pub fn new(self, info: &str) -> Error {
        Error {
            code: self.code(),
            info: Some(info.to_string()),
            details: None,
        }
    }

    pub fn default(self) -> Error {
        self.new(self.message())
    }

    pub fn with_details(self, details: Value) -> Error {
        Error {
            code: self.code(),
            info: None,
            details: Some(details),
        }
    }
}

#[derive(Debug)]
pub struct QueryError {
    info: String,
    unique_violation: bool,
}

impl QueryError {
    pub fn new(info: String) -> Self {
        Self {
            info,
            unique_violation: false,
        }
    }

    pub fn is_unique_violation(&self) -> bool {
        self.unique_violation
    }
}

impl From<sqlx::Error> for QueryError {
    fn from(value: sqlx::Error) -> Self {
        match value {
            sqlx::Error::Database(e) => Self {
                unique_violation: e.is_unique_violation(),
                info: format!("{e}"),
            },
            sqlx::Error::RowNotFound => Self::new(String::from("Row not found")),
            sqlx::Error::PoolTimedOut => Self::new(String::from("Pool timed out")),
            sqlx::Error::PoolClosed => Self::new(String::from("Pool closed")),
            sqlx::Error::ColumnDecode { index, source } => {
                Self::new(format!("Column decode {index} ({source})"))
            }
            e => Self::new(format!("{e}")),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for QueryError {
    fn from(value: sqlx::migrate::MigrateError) -> Self {
        Self::new(format!("Migration failed: {value}"))
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({})", self.info)
    }
}

impl std::error::Error for QueryError {}

impl From<QueryError> for Error {
    fn from(value: QueryError) -> Self {
        error!("Database query failed: {}", value.info);
        HtmlError::InternalError.default()
    }
}

/// Per-field validation messages, rendered as `{"field": ["message", ...]}`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    inner: Map<String, Value>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: &str) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: &str) {
        match self.inner.get_mut(field) {
            Some(Value::Array(messages)) => messages.push(Value::from(message)),
            _ => {
                self.inner
                    .insert(field.to_string(), Value::Array(vec![Value::from(message)]));
            }
        }
    }

    /// Errors for list fields whose items are objects, one entry per item.
    pub fn add_nested(&mut self, field: &str, items: Vec<Value>) {
        self.inner.insert(field.to_string(), Value::Array(items));
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn into_result(self) -> Result<(), Error> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(value: ValidationErrors) -> Self {
        HtmlError::InvalidRequest.with_details(Value::Object(value.inner))
    }
}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let error = if let Some(error) = err.find::<Error>() {
        error.clone()
    } else if err.find::<reject::MethodNotAllowed>().is_some() {
        HtmlError::MethodNotAllowed.default()
    } else if err.is_not_found() {
        HtmlError::NotFound.default()
    } else if err.find::<reject::PayloadTooLarge>().is_some() {
        HtmlError::PayloadTooLarge.default()
    } else if err.find::<reject::UnsupportedMediaType>().is_some() {
        HtmlError::UnsupportedMediaType.default()
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        HtmlError::InvalidRequest.new(&format!("{e}"))
    } else if let Some(e) = err.find::<reject::InvalidQuery>() {
        HtmlError::InvalidRequest.new(&format!("{e}"))
    } else if let Some(e) = err.find::<reject::MissingHeader>() {
        HtmlError::InvalidRequest.new(&format!("{e}"))
    } else if let Some(e) = err.find::<reject::InvalidHeader>() {
        HtmlError::InvalidRequest.new(&format!("{e}"))
    } else if err.find::<reject::LengthRequired>().is_some() {
        HtmlError::InvalidRequest.new("A content length is required.")
    } else {
        error!("Unhandled rejection: {err:?}");
        HtmlError::InternalError.default()
    };

    if error.code >= 500 {
        error!("Request failed: {error}");
    } else {
        debug!("Request rejected: {error}");
    }

    Ok(error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_group_messages_by_field() {
        let mut errors = ValidationErrors::new();
        errors.add("title", "This field is required.");
        errors.add("price", "A valid number is required.");
        errors.add("price", "Ensure that there are no more than 5 digits in total.");

        let error: Error = errors.into();

        assert_eq!(error.code, 400);
        assert_eq!(
            error.body(),
            json!({
                "title": ["This field is required."],
                "price": [
                    "A valid number is required.",
                    "Ensure that there are no more than 5 digits in total."
                ],
            })
        );
    }

    #[test]
    fn empty_validation_errors_pass() {
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn default_errors_render_detail() {
        let error = HtmlError::NotFound.default();

        assert_eq!(error.status(), StatusCode::NOT_FOUND);
        assert_eq!(error.body(), json!({ "detail": "Not found." }));
    }

    #[test]
    fn query_errors_hide_their_cause() {
        let error: Error = QueryError::new(String::from("relation does not exist")).into();

        assert_eq!(error.code, 500);
        assert_eq!(error.body(), json!({ "detail": "Internal server error." }));
    }

    #[tokio::test]
    async fn rejections_map_to_statuses() {
        let response = handle_rejection(reject::not_found())
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = handle_rejection(HtmlError::InvalidSession.default().into())
            .await
            .unwrap()
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
