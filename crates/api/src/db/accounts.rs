//! Authentication records: user accounts and business API keys.

use chrono::{DateTime, Utc};
use reservio_core::types::{
    AccountClass, AccountId, ApiKeyId, BusinessId, CustomerId, Email,
};
use serde::Serialize;

use super::{Record, Table, Tenant, TenantRecord};

/// A user who can log in.
///
/// Emails are unique per class, and per business for customer accounts.
#[derive(Clone)]
pub struct Account {
    pub id: AccountId,
    pub class: AccountClass,
    pub email: Email,
    pub name: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Set for business and customer accounts.
    pub business_id: Option<BusinessId>,
    /// Customer record linked to a customer account.
    pub customer_id: Option<CustomerId>,
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("id", &self.id)
            .field("class", &self.class)
            .field("email", &self.email)
            .field("name", &self.name)
            .field("password_hash", &"[REDACTED]")
            .field("business_id", &self.business_id)
            .field("customer_id", &self.customer_id)
            .finish_non_exhaustive()
    }
}

impl Record for Account {
    type Id = AccountId;
    const ENTITY: &'static str = "account";

    fn id(&self) -> AccountId {
        self.id
    }
}

/// Account fields safe to return to clients.
#[derive(Debug, Clone, Serialize)]
pub struct AccountView {
    pub id: AccountId,
    pub class: AccountClass,
    pub email: Email,
    pub name: String,
    pub business_id: Option<BusinessId>,
    pub customer_id: Option<CustomerId>,
}

impl From<&Account> for AccountView {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            class: account.class,
            email: account.email.clone(),
            name: account.name.clone(),
            business_id: account.business_id,
            customer_id: account.customer_id,
        }
    }
}

impl Table<Account> {
    /// Find the account a login attempt refers to.
    ///
    /// Customer accounts are scoped to `business_id`; other classes ignore it.
    #[must_use]
    pub fn by_login(
        &self,
        class: AccountClass,
        email: &Email,
        business_id: Option<BusinessId>,
    ) -> Option<&Account> {
        self.iter().find(|a| {
            a.class == class
                && &a.email == email
                && (class != AccountClass::Customer || a.business_id == business_id)
        })
    }
}

/// A long-lived credential for server-to-server access to one business.
///
/// Only the SHA-256 hash of the key is stored.
#[derive(Debug, Clone)]
pub struct ApiKey {
    pub id: ApiKeyId,
    pub label: String,
    /// Leading characters of the key, shown so users can tell keys apart.
    pub prefix: String,
    /// Hex-encoded SHA-256 of the full key.
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl ApiKey {
    /// Whether the key still authenticates.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }
}

impl Record for ApiKey {
    type Id = ApiKeyId;
    const ENTITY: &'static str = "api key";

    fn id(&self) -> ApiKeyId {
        self.id
    }
}

impl TenantRecord for ApiKey {
    fn table(tenant: &Tenant) -> &Table<Self> {
        &tenant.api_keys
    }

    fn table_mut(tenant: &mut Tenant) -> &mut Table<Self> {
        &mut tenant.api_keys
    }
}

/// API key fields safe to list. `key` is only present right after creation.
#[derive(Debug, Clone, Serialize)]
pub struct ApiKeyView {
    pub id: ApiKeyId,
    pub label: String,
    pub prefix: String,
    pub created_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

impl From<&ApiKey> for ApiKeyView {
    fn from(key: &ApiKey) -> Self {
        Self {
            id: key.id,
            label: key.label.clone(),
            prefix: key.prefix.clone(),
            created_at: key.created_at,
            revoked_at: key.revoked_at,
            key: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account(class: AccountClass, email: &str, business_id: Option<BusinessId>) -> Account {
        Account {
            id: AccountId::new(),
            class,
            email: Email::parse(email).unwrap(),
            name: "Test".to_owned(),
            password_hash: String::new(),
            business_id,
            customer_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_customer_login_is_scoped_to_business() {
        let shop_a = BusinessId::new();
        let shop_b = BusinessId::new();
        let mut accounts = Table::default();
        accounts
            .insert(account(AccountClass::Customer, "ada@example.test", Some(shop_a)))
            .unwrap();
        let email = Email::parse("ada@example.test").unwrap();

        assert!(accounts.by_login(AccountClass::Customer, &email, Some(shop_a)).is_some());
        assert!(accounts.by_login(AccountClass::Customer, &email, Some(shop_b)).is_none());
        assert!(accounts.by_login(AccountClass::Business, &email, Some(shop_a)).is_none());
    }

    #[test]
    fn test_account_debug_redacts_hash() {
        let mut acct = account(AccountClass::Admin, "root@example.test", None);
        acct.password_hash = "$argon2id$secret".to_owned();
        let debug = format!("{acct:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("argon2id"));
    }
}
