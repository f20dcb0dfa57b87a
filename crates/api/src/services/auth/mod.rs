//! Authentication service.
//!
//! Password signup and login for the three account classes, bearer token
//! refresh and logout, plus API key issuance for server-to-server access.

mod api_keys;
mod error;
mod tokens;

pub use api_keys::{API_KEY_PREFIX, generate_api_key, hash_api_key};
pub use error::AuthError;
pub use tokens::{Session, TokenPair, TokenStore};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::Utc;
use reservio_core::domain::{Business, Customer, CustomerDraft};
use reservio_core::types::{AccountClass, AccountId, BusinessId, CustomerId, Email};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::db::{Account, Database, Tables, Tenant};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Signup body. Which optional fields are required depends on the class.
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    /// Business class: name of the business to create.
    #[serde(default)]
    pub business_name: Option<String>,
    /// Customer class: the business the customer books with.
    #[serde(default)]
    pub business_id: Option<BusinessId>,
    /// Customer class: phone stored on the customer record.
    #[serde(default)]
    pub phone: Option<String>,
    /// Admin class: must match the configured admin signup code.
    #[serde(default)]
    pub signup_code: Option<String>,
}

/// Login body. Customers also name their business.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub business_id: Option<BusinessId>,
}

/// Authentication service.
///
/// Handles account creation, password login and token rotation.
pub struct AuthService<'a> {
    db: &'a Database,
    tokens: &'a TokenStore,
    admin_signup_code: Option<&'a SecretString>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(
        db: &'a Database,
        tokens: &'a TokenStore,
        admin_signup_code: Option<&'a SecretString>,
    ) -> Self {
        Self {
            db,
            tokens,
            admin_signup_code,
        }
    }

    /// Register an account of `class` and log it in.
    ///
    /// Business signup also creates the tenant. Customer signup links to an
    /// existing customer record with the same email, or creates one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail`, `WeakPassword` or `MissingField` for
    /// bad input, `AccountAlreadyExists` for a duplicate, `SignupDisabled` or
    /// `InvalidSignupCode` for admin signup, and `Forbidden` for customers of a
    /// suspended business.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(
        &self,
        class: AccountClass,
        request: SignupRequest,
    ) -> Result<TokenPair, AuthError> {
        let email = Email::parse(&request.email)?;
        validate_password(&request.password)?;
        let name = request.name.trim().to_owned();
        if name.is_empty() {
            return Err(AuthError::MissingField("name"));
        }
        if class == AccountClass::Admin {
            self.check_signup_code(request.signup_code.as_deref())?;
        }

        let password_hash = hash_password(&request.password)?;
        let now = Utc::now();

        let account = {
            let mut tables = self.db.write().await;
            let (business_id, customer_id) = match class {
                AccountClass::Admin => {
                    ensure_unique(&tables, class, &email, None)?;
                    (None, None)
                }
                AccountClass::Business => {
                    let business_name = request
                        .business_name
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .ok_or(AuthError::MissingField("business_name"))?;
                    ensure_unique(&tables, class, &email, None)?;
                    let business = Business {
                        id: BusinessId::new(),
                        name: business_name.to_owned(),
                        owner_email: email.clone(),
                        suspended: false,
                        created_at: now,
                    };
                    let id = business.id;
                    tables.insert_tenant(Tenant::new(business))?;
                    (Some(id), None)
                }
                AccountClass::Customer => {
                    let business_id = request
                        .business_id
                        .ok_or(AuthError::MissingField("business_id"))?;
                    ensure_unique(&tables, class, &email, Some(business_id))?;
                    let customer_id =
                        link_customer(&mut tables, business_id, &email, &name, request.phone)?;
                    (Some(business_id), Some(customer_id))
                }
            };

            let account = Account {
                id: AccountId::new(),
                class,
                email,
                name,
                password_hash,
                business_id,
                customer_id,
                created_at: now,
            };
            tables.accounts.insert(account.clone())?;
            account
        };

        info!(account_id = %account.id, %class, "Account created");
        Ok(self.tokens.issue(&account).await)
    }

    /// Log in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` for an unknown account or wrong
    /// password, and `AuthError::Forbidden` if the account's business is suspended.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(
        &self,
        class: AccountClass,
        request: LoginRequest,
    ) -> Result<TokenPair, AuthError> {
        let email = Email::parse(&request.email).map_err(|_| AuthError::InvalidCredentials)?;
        let (account, active) = {
            let tables = self.db.read().await;
            let account = tables
                .accounts
                .by_login(class, &email, request.business_id)
                .cloned()
                .ok_or(AuthError::InvalidCredentials)?;
            let active = ensure_active(&tables, &account);
            (account, active)
        };

        verify_password(&request.password, &account.password_hash)?;
        active?;
        info!(account_id = %account.id, %class, "Login succeeded");
        Ok(self.tokens.issue(&account).await)
    }

    /// Exchange a refresh token for a new token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` for an unknown, expired or already
    /// used refresh token, and `AuthError::Forbidden` for a suspended business.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AuthError> {
        let account_id = self
            .tokens
            .take_refresh(refresh_token)
            .await
            .ok_or(AuthError::InvalidToken)?;
        let account = {
            let tables = self.db.read().await;
            let account = tables
                .accounts
                .get(account_id)
                .cloned()
                .ok_or(AuthError::InvalidToken)?;
            ensure_active(&tables, &account)?;
            account
        };
        Ok(self.tokens.issue(&account).await)
    }

    /// Invalidate an access token and, if given, a refresh token.
    #[instrument(skip_all)]
    pub async fn logout(&self, access_token: &str, refresh_token: Option<&str>) {
        self.tokens.revoke_access(access_token).await;
        if let Some(refresh) = refresh_token {
            self.tokens.take_refresh(refresh).await;
        }
    }

    fn check_signup_code(&self, provided: Option<&str>) -> Result<(), AuthError> {
        let expected = self.admin_signup_code.ok_or(AuthError::SignupDisabled)?;
        let provided = provided.ok_or(AuthError::InvalidSignupCode)?;
        if constant_time_compare(expected.expose_secret(), provided) {
            Ok(())
        } else {
            Err(AuthError::InvalidSignupCode)
        }
    }
}

fn ensure_unique(
    tables: &Tables,
    class: AccountClass,
    email: &Email,
    business_id: Option<BusinessId>,
) -> Result<(), AuthError> {
    if tables.accounts.by_login(class, email, business_id).is_some() {
        return Err(AuthError::AccountAlreadyExists);
    }
    Ok(())
}

/// Refuse accounts whose business is suspended.
fn ensure_active(tables: &Tables, account: &Account) -> Result<(), AuthError> {
    if let Some(business_id) = account.business_id
        && tables.tenant(business_id)?.business.suspended
    {
        return Err(AuthError::Forbidden("business is suspended".to_owned()));
    }
    Ok(())
}

/// Find or create the customer record a customer account belongs to.
fn link_customer(
    tables: &mut Tables,
    business_id: BusinessId,
    email: &Email,
    name: &str,
    phone: Option<String>,
) -> Result<CustomerId, AuthError> {
    let tenant = tables.tenant_mut(business_id)?;
    if tenant.business.suspended {
        return Err(AuthError::Forbidden("business is suspended".to_owned()));
    }
    if let Some(existing) = tenant
        .customers
        .iter()
        .find(|c| c.email.as_ref() == Some(email))
    {
        return Ok(existing.id);
    }
    let customer = Customer::create(
        CustomerDraft {
            name: name.to_owned(),
            email: Some(email.clone()),
            phone,
            notes: None,
        },
        Utc::now(),
    )
    .map_err(|e| AuthError::Repository(e.into()))?;
    let id = customer.id;
    tenant.customers.insert(customer)?;
    Ok(id)
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

/// Compare two strings without short-circuiting on the first difference.
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}
