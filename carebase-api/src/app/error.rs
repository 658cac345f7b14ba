use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use carebase_core::AccountError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    code: &'static str,
    message: String,
    status: StatusCode,
}

impl ApiError {
    pub fn new(code: &'static str, status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            status,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new("Unauthorized", StatusCode::UNAUTHORIZED, "unauthorized")
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new("BadRequest", StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NotFound", StatusCode::NOT_FOUND, message)
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(msg) => {
                ApiError::new("Validation", StatusCode::BAD_REQUEST, msg)
            }
            AccountError::DuplicateEmail => ApiError::new(
                "DuplicateEmail",
                StatusCode::CONFLICT,
                "email already registered",
            ),
            AccountError::InvalidCredentials => ApiError::new(
                "InvalidCredentials",
                StatusCode::UNAUTHORIZED,
                "invalid credentials",
            ),
            AccountError::WrongPassword => ApiError::new(
                "WrongPassword",
                StatusCode::UNAUTHORIZED,
                "you must provide your current password",
            ),
            AccountError::InvalidPassword(msg) => {
                ApiError::new("InvalidPassword", StatusCode::BAD_REQUEST, msg)
            }
            AccountError::InvalidOrExpiredToken => ApiError::new(
                "InvalidToken",
                StatusCode::BAD_REQUEST,
                "invalid or expired token",
            ),
            AccountError::NotFound(what) => ApiError::new(
                "NotFound",
                StatusCode::NOT_FOUND,
                format!("{what} not found"),
            ),
            AccountError::Unauthorized(msg) => {
                ApiError::new("Unauthorized", StatusCode::UNAUTHORIZED, msg)
            }
            AccountError::Io(e) => {
                ApiError::new("IoError", StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
            AccountError::Serde(e) => {
                ApiError::new("SerdeError", StatusCode::BAD_REQUEST, e.to_string())
            }
            AccountError::Other(msg) => {
                ApiError::new("Error", StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "code": self.code,
            "message": self.message,
        }));
        (self.status, body).into_response()
    }
}
