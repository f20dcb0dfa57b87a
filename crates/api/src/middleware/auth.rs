//! Authentication extractors.
//!
//! Route handlers name the caller they require:
//!
//! - [`CurrentSession`] - any bearer token
//! - [`BusinessAuth`] - a business bearer token or an `X-Api-Key`
//! - [`CustomerAuth`] - a customer bearer token
//! - [`AdminAuth`] - an admin bearer token
//!
//! Business and customer callers are refused with 403 while their business
//! is suspended, including tokens issued before the suspension.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use reservio_core::types::{AccountClass, ApiKeyId, BusinessId, CustomerId};

use crate::db::{Database, RepositoryError};
use crate::error::{AppError, set_sentry_user};
use crate::services::Session;
use crate::services::auth::hash_api_key;
use crate::state::AppState;

/// Header carrying a business API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The bearer token of a request, if any.
fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn ensure_not_suspended(db: &Database, business_id: BusinessId) -> Result<(), AppError> {
    let tables = db.read().await;
    match tables.tenant(business_id) {
        Ok(tenant) if tenant.business.suspended => {
            Err(AppError::Forbidden("business is suspended".to_owned()))
        }
        Ok(_) => Ok(()),
        // Business deleted under a live token
        Err(RepositoryError::NotFound(_)) => {
            Err(AppError::Unauthorized("invalid or expired token".to_owned()))
        }
        Err(err) => Err(err.into()),
    }
}

/// Any authenticated account.
#[derive(Debug, Clone)]
pub struct CurrentSession {
    pub session: Session,
    pub access_token: String,
}

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_owned()))?;
        let session = state
            .tokens()
            .session(token)
            .await
            .ok_or_else(|| AppError::Unauthorized("invalid or expired token".to_owned()))?;
        set_sentry_user(&session.account_id, Some(session.email.as_str()));

        Ok(Self {
            session,
            access_token: token.to_owned(),
        })
    }
}

impl CurrentSession {
    fn require(self, class: AccountClass) -> Result<Session, AppError> {
        if self.session.class == class {
            Ok(self.session)
        } else {
            Err(AppError::Forbidden(format!("{class} account required")))
        }
    }
}

/// Who is acting on a business.
#[derive(Debug, Clone)]
pub enum BusinessActor {
    Account(Session),
    ApiKey(ApiKeyId),
}

/// A caller allowed to manage one business.
#[derive(Debug, Clone)]
pub struct BusinessAuth {
    pub business_id: BusinessId,
    pub actor: BusinessActor,
}

impl BusinessAuth {
    async fn from_api_key(state: &AppState, key: &str) -> Result<Self, AppError> {
        let hash = hash_api_key(key);
        let tables = state.db().read().await;
        let (business_id, key_id, suspended) = tables
            .tenants()
            .find_map(|tenant| {
                tenant
                    .api_keys
                    .iter()
                    .find(|k| k.is_active() && k.key_hash == hash)
                    .map(|k| (tenant.business.id, k.id, tenant.business.suspended))
            })
            .ok_or_else(|| AppError::Unauthorized("invalid API key".to_owned()))?;
        if suspended {
            return Err(AppError::Forbidden("business is suspended".to_owned()));
        }
        sentry::configure_scope(|scope| {
            scope.set_tag("api_key_id", key_id.to_string());
        });

        Ok(Self {
            business_id,
            actor: BusinessActor::ApiKey(key_id),
        })
    }
}

impl FromRequestParts<AppState> for BusinessAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if bearer_token(parts).is_none()
            && let Some(key) = parts
                .headers
                .get(API_KEY_HEADER)
                .and_then(|v| v.to_str().ok())
        {
            return Self::from_api_key(state, key.trim()).await;
        }

        let session = CurrentSession::from_request_parts(parts, state)
            .await?
            .require(AccountClass::Business)?;
        let business_id = session
            .business_id
            .ok_or_else(|| AppError::Forbidden("account has no business".to_owned()))?;
        ensure_not_suspended(state.db(), business_id).await?;

        Ok(Self {
            business_id,
            actor: BusinessActor::Account(session),
        })
    }
}

/// A signed-in customer of one business.
#[derive(Debug, Clone)]
pub struct CustomerAuth {
    pub business_id: BusinessId,
    pub customer_id: CustomerId,
    pub session: Session,
}

impl FromRequestParts<AppState> for CustomerAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state)
            .await?
            .require(AccountClass::Customer)?;
        let (Some(business_id), Some(customer_id)) = (session.business_id, session.customer_id)
        else {
            return Err(AppError::Forbidden(
                "account is not linked to a customer".to_owned(),
            ));
        };
        ensure_not_suspended(state.db(), business_id).await?;

        Ok(Self {
            business_id,
            customer_id,
            session,
        })
    }
}

/// A platform administrator.
#[derive(Debug, Clone)]
pub struct AdminAuth(pub Session);

impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = CurrentSession::from_request_parts(parts, state)
            .await?
            .require(AccountClass::Admin)?;
        Ok(Self(session))
    }
}
