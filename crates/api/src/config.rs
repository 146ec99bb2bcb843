//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Database
//! - `DATABASE_BACKEND` - `mongodb` (default) or `astra`
//! - `MONGODB_URI` - MongoDB connection string (required for `mongodb`)
//! - `MONGODB_DATABASE` - Database name when the URI does not name one
//! - `ASTRA_DB_API_ENDPOINT` - Data API endpoint (required for `astra`)
//! - `ASTRA_DB_APPLICATION_TOKEN` - Data API token (required for `astra`)
//! - `ASTRA_DB_KEYSPACE` - Keyspace (default: `default_keyspace`)
//!
//! ## Optional
//! - `HOST` - Bind address (default: 0.0.0.0)
//! - `PORT` - Listen port (default: 3001)
//! - `CORS_ORIGINS` - Comma-separated allowed origins
//!   (default: `http://localhost:5173,http://localhost:3000`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Logging (read by the binary, not by `ApiConfig`)
//! - `RUST_LOG` - Log filter (default: `storemari_api=info,tower_http=info`)
//! - `LOG_FORMAT` - `json` for one JSON object per line

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: &str = "3001";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_CORS_ORIGINS: &str = "http://localhost:5173,http://localhost:3000";
const DEFAULT_ASTRA_KEYSPACE: &str = "default_keyspace";
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
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
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Document store connection settings
    pub database: DatabaseConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Origins allowed by CORS
    pub cors_origins: Vec<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Which document store to talk to, and how.
///
/// `SecretString` fields print as `[REDACTED]` in `Debug` output.
#[derive(Debug, Clone)]
pub enum DatabaseConfig {
    /// MongoDB via the native driver.
    MongoDb {
        /// Connection string (may embed credentials)
        uri: SecretString,
        /// Database used when the URI does not name one
        database: Option<String>,
    },
    /// Astra Data API over HTTPS.
    Astra {
        /// Database API endpoint
        endpoint: Url,
        /// Application token
        token: SecretString,
        /// Keyspace holding the collections
        keyspace: String,
    },
}

impl DatabaseConfig {
    /// Human readable backend name, as reported by `GET /`.
    #[must_use]
    pub const fn backend_name(&self) -> &'static str {
        match self {
            Self::MongoDb { .. } => "MongoDB",
            Self::Astra { .. } => "Astra DB",
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the Data API token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let database = DatabaseConfig::from_env(&env)?;
        let host = env
            .get_or_default("HOST", DEFAULT_HOST)
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("HOST".to_string(), e.to_string()))?;
        let port = env
            .get_or_default("PORT", DEFAULT_PORT)
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("PORT".to_string(), e.to_string()))?;
        let cors_origins = parse_origins(&env.get_or_default("CORS_ORIGINS", DEFAULT_CORS_ORIGINS))?;

        Ok(Self {
            database,
            host,
            port,
            cors_origins,
            sentry_dsn: env.get_optional("SENTRY_DSN"),
            sentry_environment: env.get_optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl DatabaseConfig {
    fn from_env(env: &Env<'_>) -> Result<Self, ConfigError> {
        let backend = env.get_or_default("DATABASE_BACKEND", "mongodb");

        match backend.to_ascii_lowercase().as_str() {
            "mongodb" | "mongo" => Ok(Self::MongoDb {
                uri: SecretString::from(env.get_required("MONGODB_URI")?),
                database: env.get_optional("MONGODB_DATABASE"),
            }),
            "astra" => {
                let raw_endpoint = env.get_required("ASTRA_DB_API_ENDPOINT")?;
                let endpoint = Url::parse(&raw_endpoint).map_err(|e| {
                    ConfigError::InvalidEnvVar("ASTRA_DB_API_ENDPOINT".to_string(), e.to_string())
                })?;
                let token = env.get_required("ASTRA_DB_APPLICATION_TOKEN")?;
                validate_secret_strength(&token, "ASTRA_DB_APPLICATION_TOKEN")?;

                Ok(Self::Astra {
                    endpoint,
                    token: SecretString::from(token),
                    keyspace: env.get_or_default("ASTRA_DB_KEYSPACE", DEFAULT_ASTRA_KEYSPACE),
                })
            }
            other => Err(ConfigError::InvalidEnvVar(
                "DATABASE_BACKEND".to_string(),
                format!("unknown backend '{other}' (expected 'mongodb' or 'astra')"),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment lookup with the usual required/optional/default helpers.
struct Env<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Env<'_> {
    /// Get a required variable. Blank values count as missing.
    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get_optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Blank values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }
}

/// Split and check a comma-separated origin list.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(|origin| {
            Url::parse(origin)
                .map(|_| origin.trim_end_matches('/').to_string())
                .map_err(|e| {
                    ConfigError::InvalidEnvVar(
                        "CORS_ORIGINS".to_string(),
                        format!("'{origin}': {e}"),
                    )
                })
        })
        .collect()
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
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Copy the token from the database console."
            ),
        ));
    }

    Ok(())
}
