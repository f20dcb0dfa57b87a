//! Signup, login and token management for every account class.

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};
use reservio_core::types::AccountClass;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::extract::{Json, Path};
use crate::middleware::{CurrentSession, auth_rate_limiter};
use crate::services::auth::{LoginRequest, SignupRequest};
use crate::services::{Session, TokenPair};
use crate::state::AppState;

/// Build the auth router. Signup and login share one rate limit budget.
pub fn router(trust_proxy_headers: bool) -> Router<AppState> {
    Router::new()
        .route("/{class}/signup", post(signup))
        .route("/{class}/login", post(login))
        .layer(auth_rate_limiter(trust_proxy_headers))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/me", get(me))
}

/// Refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Optional logout body.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// Create an account and return its first token pair.
#[instrument(skip_all, fields(%class))]
pub async fn signup(
    State(state): State<AppState>,
    Path(class): Path<AccountClass>,
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<TokenPair>)> {
    let tokens = state.auth().signup(class, request).await?;
    let class_name = class.to_string();
    add_breadcrumb("auth", "signup", Some(&[("class", class_name.as_str())]));
    Ok((StatusCode::CREATED, Json(tokens)))
}

/// Log in with email and password.
#[instrument(skip_all, fields(%class))]
pub async fn login(
    State(state): State<AppState>,
    Path(class): Path<AccountClass>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<TokenPair>> {
    let tokens = state.auth().login(class, request).await?;
    let class_name = class.to_string();
    add_breadcrumb("auth", "login", Some(&[("class", class_name.as_str())]));
    Ok(Json(tokens))
}

/// Exchange a refresh token for a new pair.
#[instrument(skip_all)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<TokenPair>> {
    Ok(Json(state.auth().refresh(&request.refresh_token).await?))
}

/// Revoke the presented access token and, if sent, a refresh token.
///
/// The body is optional.
#[instrument(skip_all)]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentSession,
    body: Bytes,
) -> Result<StatusCode> {
    let request: LogoutRequest = if body.iter().all(u8::is_ascii_whitespace) {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| AppError::BadRequest(e.to_string()))?
    };
    state
        .auth()
        .logout(&current.access_token, request.refresh_token.as_deref())
        .await;
    Ok(StatusCode::NO_CONTENT)
}

/// The session behind the presented access token.
pub async fn me(current: CurrentSession) -> Json<Session> {
    Json(current.session)
}
