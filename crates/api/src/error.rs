//! Unified error handling with Sentry integration.
//!
//! Every route handler returns `Result<T, AppError>`. Responses carry a JSON
//! body `{"error": "<message>"}`; server-side failures are captured to Sentry
//! and reported to the client without detail.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reservio_core::ValidationError;
use reservio_core::inventory::StockError;
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::db::seed::SeedError;
use crate::services::{AuthError, BookingError, PosError, WebhookError};

/// Application-level error type for the API.
#[derive(Debug, Error)]
pub enum AppError {
    /// Repository operation failed.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("Booking error: {0}")]
    Booking(#[from] BookingError),

    #[error("POS error: {0}")]
    Pos(#[from] PosError),

    #[error("Webhook error: {0}")]
    Webhook(#[from] WebhookError),

    #[error("Seed error: {0}")]
    Seed(#[from] SeedError),

    /// A request body failed domain validation.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

const fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::InvalidReference(_) | RepositoryError::Validation(_) => {
            StatusCode::BAD_REQUEST
        }
    }
}

impl AppError {
    /// HTTP status the error maps to.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Repository(err)
            | Self::Auth(AuthError::Repository(err))
            | Self::Booking(BookingError::Repository(err))
            | Self::Pos(PosError::Repository(err)) => repository_status(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::InvalidToken => StatusCode::UNAUTHORIZED,
                AuthError::AccountAlreadyExists => StatusCode::CONFLICT,
                AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_)
                | AuthError::MissingField(_) => StatusCode::BAD_REQUEST,
                AuthError::Forbidden(_)
                | AuthError::SignupDisabled
                | AuthError::InvalidSignupCode => StatusCode::FORBIDDEN,
                AuthError::PasswordHash | AuthError::Repository(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::Booking(err) => match err {
                BookingError::Schedule(_) => StatusCode::BAD_REQUEST,
                BookingError::DoubleBooked { .. } | BookingError::InvalidTransition { .. } => {
                    StatusCode::CONFLICT
                }
                BookingError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Pos(err) => match err {
                PosError::Stock {
                    source: StockError::Insufficient { .. },
                    ..
                } => StatusCode::CONFLICT,
                PosError::Pricing(_) | PosError::Stock { .. } => StatusCode::BAD_REQUEST,
                PosError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Webhook(WebhookError::NotConfigured) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Webhook(_) | Self::Validation(_) | Self::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Seed(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the client.
    fn client_message(&self) -> String {
        if self.status().is_server_error() && self.status() != StatusCode::SERVICE_UNAVAILABLE {
            return "Internal server error".to_string();
        }
        match self {
            Self::Repository(err) => err.to_string(),
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_string(),
            Self::Auth(err) => err.to_string(),
            Self::Booking(err) => err.to_string(),
            Self::Pos(err) => err.to_string(),
            Self::Webhook(err) => err.to_string(),
            Self::Validation(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg)
            | Self::Internal(msg) => msg.clone(),
            Self::Seed(err) => err.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Capture server errors to Sentry
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = Json(json!({ "error": self.client_message() }));
        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the authenticated account.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
