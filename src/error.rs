//! Unified application error model and mapping helpers.
//! `AuthError` is the taxonomy of the auth engine; `AppError` is the response
//! envelope every HTTP handler returns, rendered as `{"error", "code"}` JSON.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

use crate::identity::TokenError;
use crate::storage::StoreError;

pub const MISSING_CREDENTIAL_MSG: &str = "Missing Authorization Header";
pub const INVALID_CREDENTIAL_MSG: &str = "Invalid or expired token";
pub const MISSING_LOGIN_FIELDS_MSG: &str = "Please provide name and password to obtain the token";
pub const USER_NOT_FOUND_MSG: &str = "user not found";
pub const CREDENTIAL_MISMATCH_MSG: &str = "Name and password do not match";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("{}", MISSING_CREDENTIAL_MSG)]
    MissingCredential,
    /// The cause is for logs only; the rendered message is the same for all.
    #[error("{}", INVALID_CREDENTIAL_MSG)]
    InvalidCredential(TokenError),
    #[error("{}", USER_NOT_FOUND_MSG)]
    IdentityNotFound,
    #[error("{}", CREDENTIAL_MISMATCH_MSG)]
    CredentialMismatch,
    #[error("{0}")]
    AccessDenied(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    pub fn http_status(&self) -> u16 { AppError::from(self.clone()).http_status() }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AppError {
    UserInput { code: String, message: String },
    NotFound { code: String, message: String },
    Auth { code: String, message: String },
    Internal { code: String, message: String },
}

impl AppError {
    pub fn code_str(&self) -> &str {
        match self {
            AppError::UserInput { code, .. }
            | AppError::NotFound { code, .. }
            | AppError::Auth { code, .. }
            | AppError::Internal { code, .. } => code.as_str(),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            AppError::UserInput { message, .. }
            | AppError::NotFound { message, .. }
            | AppError::Auth { message, .. }
            | AppError::Internal { message, .. } => message.as_str(),
        }
    }

    pub fn user<S: Into<String>>(code: S, msg: S) -> Self { AppError::UserInput { code: code.into(), message: msg.into() } }
    pub fn not_found<S: Into<String>>(code: S, msg: S) -> Self { AppError::NotFound { code: code.into(), message: msg.into() } }
    pub fn auth<S: Into<String>>(code: S, msg: S) -> Self { AppError::Auth { code: code.into(), message: msg.into() } }
    pub fn internal<S: Into<String>>(code: S, msg: S) -> Self { AppError::Internal { code: code.into(), message: msg.into() } }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::UserInput { .. } => 400,
            AppError::NotFound { .. } => 404,
            AppError::Auth { .. } => 401,
            AppError::Internal { .. } => 500,
        }
    }
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code_str(), self.message())
    }
}

impl std::error::Error for AppError {}

pub type AppResult<T> = Result<T, AppError>;

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        let message = err.to_string();
        match err {
            AuthError::MissingCredential => AppError::auth("missing_credential".into(), message),
            AuthError::InvalidCredential(_) => AppError::auth("invalid_credential".into(), message),
            AuthError::IdentityNotFound => AppError::not_found("not_found".into(), message),
            AuthError::CredentialMismatch => AppError::auth("credential_mismatch".into(), message),
            AuthError::AccessDenied(_) => AppError::auth("access_denied".into(), message),
            AuthError::BadRequest(_) => AppError::user("bad_request".into(), message),
            AuthError::Internal(_) => AppError::internal("internal".into(), message),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        tracing::error!(target: "tenantgate::error", "store error: {}", err);
        AppError::Internal { code: "store_error".into(), message: "internal storage error".into() }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal { code: "internal".into(), message: err.to_string() }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = serde_json::json!({ "error": self.message(), "code": self.code_str() });
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response { AppError::from(self).into_response() }
}
