//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//! - `RESERVIO_HOST` - Bind address (default: 127.0.0.1)
//! - `RESERVIO_PORT` - Listen port (default: 8080)
//! - `RESERVIO_STRIPE_WEBHOOK_SECRET` - Stripe endpoint signing secret; the
//!   webhook answers 503 without it
//! - `RESERVIO_ADMIN_SIGNUP_CODE` - Code required to create admin accounts
//!   (min 16 chars, high entropy); admin signup is disabled without it
//! - `RESERVIO_SEED_FILE` - YAML file loaded into the store at startup
//! - `RESERVIO_ACCESS_TOKEN_TTL_SECS` - Access token lifetime (default: 900)
//! - `RESERVIO_REFRESH_TOKEN_TTL_SECS` - Refresh token lifetime (default: 604800)
//! - `RESERVIO_TRUST_PROXY_HEADERS` - Key the auth rate limit on client IP
//!   headers such as `X-Forwarded-For` (default: false). Only enable behind a
//!   proxy that overwrites them.
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;
const MIN_SIGNUP_CODE_LENGTH: usize = 16;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API server configuration.
///
/// Implements `Debug` manually to redact secret fields.
#[derive(Clone)]
pub struct ApiConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: Option<SecretString>,
    /// Code that must accompany admin signups
    pub admin_signup_code: Option<SecretString>,
    /// YAML seed loaded at startup
    pub seed_file: Option<PathBuf>,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// Take the client IP from proxy headers instead of the TCP peer
    pub trust_proxy_headers: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            stripe_webhook_secret: None,
            admin_signup_code: None,
            seed_file: None,
            access_token_ttl: Duration::from_secs(DEFAULT_ACCESS_TOKEN_TTL_SECS),
            refresh_token_ttl: Duration::from_secs(DEFAULT_REFRESH_TOKEN_TTL_SECS),
            trust_proxy_headers: false,
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |secret: &Option<SecretString>| secret.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("ApiConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("stripe_webhook_secret", &redacted(&self.stripe_webhook_secret))
            .field("admin_signup_code", &redacted(&self.admin_signup_code))
            .field("seed_file", &self.seed_file)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish()
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable cannot be parsed or the admin
    /// signup code fails validation (length, placeholder, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env("RESERVIO_HOST", IpAddr::V4(Ipv4Addr::LOCALHOST))?;
        let port = parse_env("RESERVIO_PORT", DEFAULT_PORT)?;
        let access_ttl = parse_env(
            "RESERVIO_ACCESS_TOKEN_TTL_SECS",
            DEFAULT_ACCESS_TOKEN_TTL_SECS,
        )?;
        let refresh_ttl = parse_env(
            "RESERVIO_REFRESH_TOKEN_TTL_SECS",
            DEFAULT_REFRESH_TOKEN_TTL_SECS,
        )?;
        validate_ttls(access_ttl, refresh_ttl)?;

        let admin_signup_code = get_optional_env("RESERVIO_ADMIN_SIGNUP_CODE")
            .map(|code| {
                validate_signup_code(&code, "RESERVIO_ADMIN_SIGNUP_CODE")?;
                Ok::<_, ConfigError>(SecretString::from(code))
            })
            .transpose()?;

        Ok(Self {
            host,
            port,
            stripe_webhook_secret: get_optional_env("RESERVIO_STRIPE_WEBHOOK_SECRET")
                .map(SecretString::from),
            admin_signup_code,
            seed_file: get_optional_env("RESERVIO_SEED_FILE").map(PathBuf::from),
            access_token_ttl: Duration::from_secs(access_ttl),
            refresh_token_ttl: Duration::from_secs(refresh_ttl),
            trust_proxy_headers: parse_env("RESERVIO_TRUST_PROXY_HEADERS", false)?,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_optional_env(key).map_or(Ok(default), |value| parse_value(key, &value))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn validate_ttls(access: u64, refresh: u64) -> Result<(), ConfigError> {
    if access == 0 {
        return Err(ConfigError::InvalidEnvVar(
            "RESERVIO_ACCESS_TOKEN_TTL_SECS".to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    if refresh < access {
        return Err(ConfigError::InvalidEnvVar(
            "RESERVIO_REFRESH_TOKEN_TTL_SECS".to_string(),
            "must not be shorter than the access token lifetime".to_string(),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated code."
            ),
        ));
    }

    Ok(())
}

fn validate_signup_code(code: &str, var_name: &str) -> Result<(), ConfigError> {
    if code.len() < MIN_SIGNUP_CODE_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {MIN_SIGNUP_CODE_LENGTH} characters (got {})",
                code.len()
            ),
        ));
    }
    validate_secret_strength(code, var_name)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_signup_code_placeholder_rejected() {
        let err = validate_signup_code("changeme-admin-code-123", "TEST_VAR").unwrap_err();
        assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
    }

    #[test]
    fn test_signup_code_too_short() {
        assert!(validate_signup_code("aB3$xY9!", "TEST_VAR").is_err());
    }

    #[test]
    fn test_signup_code_low_entropy() {
        assert!(validate_signup_code("abababababababababab", "TEST_VAR").is_err());
    }

    #[test]
    fn test_signup_code_valid() {
        assert!(validate_signup_code("aB3$xY9!mK2@nL5#pQ7&rT0*", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_parse_value() {
        assert_eq!(parse_value::<u16>("PORT", " 9000 ").unwrap(), 9000);
        let err = parse_value::<u16>("PORT", "99999").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "PORT"));
        assert!(parse_value::<IpAddr>("HOST", "0.0.0.0").is_ok());
    }

    #[test]
    fn test_ttl_validation() {
        assert!(validate_ttls(900, 604_800).is_ok());
        assert!(validate_ttls(0, 604_800).is_err());
        assert!(validate_ttls(900, 60).is_err());
    }

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 8080);
        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.refresh_token_ttl, Duration::from_secs(604_800));
        assert!(!config.trust_proxy_headers);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = ApiConfig {
            stripe_webhook_secret: Some(SecretString::from("whsec_super_private")),
            admin_signup_code: Some(SecretString::from("admin_super_private")),
            sentry_dsn: Some("https://key@sentry.test/1".to_string()),
            ..ApiConfig::default()
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("sentry.test"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("whsec_super_private"));
        assert!(!debug_output.contains("admin_super_private"));
    }
}
