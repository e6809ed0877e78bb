//! Application configuration management.
//!
//! Configuration is loaded from a YAML file with environment variable
//! overrides. The file path defaults to `config.yaml` and can be set via the
//! `-f` flag or `QUOTEBOARD_CONFIG` environment variable.
//!
//! ## Loading Priority
//!
//! Sources are merged in order (later overrides earlier):
//!
//! 1. **YAML config file** - base configuration (default: `config.yaml`)
//! 2. **Environment variables** - `QUOTEBOARD_`-prefixed variables
//! 3. **DATABASE_URL** - special case: overrides `database.url` if set
//!
//! Nested values use double underscores, e.g.
//! `QUOTEBOARD_AUTH__PASSWORD__MIN_LENGTH=12`.
//!
//! ## Usage
//!
//! ```no_run
//! use clap::Parser;
//! use quoteboard::config::{Args, Config};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let args = Args::parse();
//! let config = Config::load(&args)?;
//! println!("Server will bind to {}", config.bind_address());
//! # Ok(())
//! # }
//! ```

use clap::Parser;
use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::auth::password::Argon2Params;
use crate::errors::Error;

/// Simple CLI args - just for specifying config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "QUOTEBOARD_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines to catch config errors before deployment.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
///
/// This is the root configuration structure loaded from YAML and environment
/// variables. All fields have sensible defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// PostgreSQL connection settings
    pub database: DatabaseConfig,
    /// Username for the initial admin user (created on first startup)
    pub admin_username: String,
    /// Password for the initial admin user (optional, can be set via environment)
    pub admin_password: Option<String>,
    /// Secret key for token signing (required for production)
    pub secret_key: Option<String>,
    /// Frontend banner metadata served by the public status endpoints
    pub metadata: Metadata,
    /// Authentication configuration
    pub auth: AuthConfig,
    /// Enable OpenTelemetry OTLP export for distributed tracing
    pub enable_otel_export: bool,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Connection string for the database
    pub url: String,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost:5432/quoteboard".to_string(),
            max_connections: 10,
        }
    }
}

/// Banner state for maintenance/announcement polling.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Banner {
    pub enabled: bool,
    pub message: Option<String>,
}

/// Frontend metadata displayed in the UI without authentication.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Metadata {
    /// Maintenance banner shown while parts of the system are degraded
    pub maintenance: Banner,
    /// Announcement banner for operator messages
    pub announcement: Banner,
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Refresh cookie configuration
    pub session: SessionConfig,
    /// Password validation rules and hashing cost
    pub password: PasswordConfig,
    /// Token TTLs and CORS settings
    pub security: SecurityConfig,
    /// Onboarding code settings
    pub registration: RegistrationConfig,
    /// Default vendor-edit window duration in hours when a grant omits it
    pub vendor_edit_default_hours: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            password: PasswordConfig::default(),
            security: SecurityConfig::default(),
            registration: RegistrationConfig::default(),
            vendor_edit_default_hours: 5,
        }
    }
}

/// Refresh cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Cookie name for the refresh token
    pub cookie_name: String,
    /// Set Secure flag on the cookie (HTTPS only)
    pub cookie_secure: bool,
    /// SameSite cookie attribute ("strict", "lax", or "none")
    pub cookie_same_site: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            cookie_name: "quoteboard_refresh".to_string(),
            cookie_secure: true,
            cookie_same_site: "strict".to_string(),
        }
    }
}

/// Password validation rules.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct PasswordConfig {
    /// Minimum password length
    pub min_length: usize,
    /// Maximum password length
    pub max_length: usize,
    /// Argon2 memory cost in KiB (default: 19456 KiB = 19 MB, secure for production)
    pub argon2_memory_kib: u32,
    /// Argon2 iterations (default: 2, secure for production)
    pub argon2_iterations: u32,
    /// Argon2 parallelism (default: 1)
    pub argon2_parallelism: u32,
    /// Known default password applied by the admin reset endpoint
    pub reset_default: String,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 64,
            argon2_memory_kib: 19456, // 19 MB
            argon2_iterations: 2,
            argon2_parallelism: 1,
            reset_default: "ChangeMe123!".to_string(),
        }
    }
}

/// Security configuration for tokens and CORS.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Access token expiry duration
    #[serde(with = "humantime_serde")]
    pub access_token_ttl: Duration,
    /// Refresh token expiry duration (also the refresh cookie Max-Age)
    #[serde(with = "humantime_serde")]
    pub refresh_token_ttl: Duration,
    /// CORS configuration for browser clients
    pub cors: CorsConfig,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            access_token_ttl: Duration::from_secs(20 * 60),
            refresh_token_ttl: Duration::from_secs(7 * 24 * 60 * 60),
            cors: CorsConfig::default(),
        }
    }
}

/// CORS (Cross-Origin Resource Sharing) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Allowed origins for CORS requests ("*" for any)
    pub allowed_origins: Vec<String>,
    /// Allow credentials (cookies) in CORS requests
    pub allow_credentials: bool,
    /// Cache preflight requests for this many seconds
    pub max_age: Option<u64>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![],
            allow_credentials: true,
            max_age: None,
        }
    }
}

/// Onboarding code settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegistrationConfig {
    /// Length of generated codes
    pub code_length: usize,
    /// How long a code stays redeemable
    #[serde(with = "humantime_serde")]
    pub code_ttl: Duration,
    /// Collision retries before code generation gives up
    pub max_generation_attempts: u32,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            code_length: 8,
            code_ttl: Duration::from_secs(24 * 60 * 60),
            max_generation_attempts: 5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database: DatabaseConfig::default(),
            admin_username: "admin".to_string(),
            admin_password: None,
            secret_key: None,
            metadata: Metadata::default(),
            auth: AuthConfig::default(),
            enable_otel_export: false,
        }
    }
}

impl Config {
    /// Load configuration from the YAML file and environment overrides.
    pub fn load(args: &Args) -> Result<Self, Error> {
        let mut config: Config = Figment::new()
            .merge(Yaml::file(&args.config))
            .merge(Env::prefixed("QUOTEBOARD_").split("__"))
            .extract()
            .map_err(|e| Error::Internal {
                operation: format!("load configuration: {e}"),
            })?;

        // DATABASE_URL wins over everything for deployment convenience
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database.url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Argon2 cost parameters as configured.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.auth.password.argon2_memory_kib,
            iterations: self.auth.password.argon2_iterations,
            parallelism: self.auth.password.argon2_parallelism,
        }
    }

    /// Validate cross-field constraints that serde cannot express.
    pub fn validate(&self) -> Result<(), Error> {
        let password = &self.auth.password;
        if password.min_length < 1 {
            return Err(Error::Internal {
                operation: "config validation: password min_length must be at least 1".to_string(),
            });
        }
        if password.min_length > password.max_length {
            return Err(Error::Internal {
                operation: format!(
                    "config validation: password min_length ({}) cannot be greater than max_length ({})",
                    password.min_length, password.max_length
                ),
            });
        }

        let security = &self.auth.security;
        if security.access_token_ttl.as_secs() < 60 {
            return Err(Error::Internal {
                operation: "config validation: access_token_ttl must be at least 1 minute".to_string(),
            });
        }
        if security.refresh_token_ttl < security.access_token_ttl {
            return Err(Error::Internal {
                operation: "config validation: refresh_token_ttl must not be shorter than access_token_ttl".to_string(),
            });
        }

        let same_site = self.auth.session.cookie_same_site.to_ascii_lowercase();
        if !matches!(same_site.as_str(), "strict" | "lax" | "none") {
            return Err(Error::Internal {
                operation: format!("config validation: invalid cookie_same_site '{same_site}'"),
            });
        }

        if self.secret_key.is_none() {
            tracing::warn!("secret_key is not configured; token issuance will fail until it is set");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.auth.security.access_token_ttl, Duration::from_secs(20 * 60));
        assert_eq!(config.auth.security.refresh_token_ttl, Duration::from_secs(7 * 24 * 60 * 60));
        assert_eq!(config.auth.session.cookie_name, "quoteboard_refresh");
        assert_eq!(config.auth.registration.code_ttl, Duration::from_secs(24 * 60 * 60));
    }

    #[test]
    fn test_yaml_and_env_merge() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
port: 9000
auth:
  password:
    min_length: 12
  security:
    access_token_ttl: "10m"
"#,
            )?;
            jail.set_env("QUOTEBOARD_PORT", "9001");
            jail.set_env("QUOTEBOARD_AUTH__SESSION__COOKIE_NAME", "qb_test");

            let args = Args {
                config: "config.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");

            // Env beats YAML, YAML beats defaults
            assert_eq!(config.port, 9001);
            assert_eq!(config.auth.password.min_length, 12);
            assert_eq!(config.auth.password.max_length, 64);
            assert_eq!(config.auth.security.access_token_ttl, Duration::from_secs(10 * 60));
            assert_eq!(config.auth.session.cookie_name, "qb_test");
            Ok(())
        });
    }

    #[test]
    fn test_database_url_env_override() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("DATABASE_URL", "postgres://elsewhere:5432/qb");
            let args = Args {
                config: "missing.yaml".to_string(),
                validate: false,
            };
            let config = Config::load(&args).expect("config should load");
            assert_eq!(config.database.url, "postgres://elsewhere:5432/qb");
            Ok(())
        });
    }

    #[test]
    fn test_invalid_password_lengths_rejected() {
        let mut config = Config::default();
        config.auth.password.min_length = 10;
        config.auth.password.max_length = 5;

        let result = config.validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_same_site_rejected() {
        let mut config = Config::default();
        config.auth.session.cookie_same_site = "sideways".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_refresh_shorter_than_access_rejected() {
        let mut config = Config::default();
        config.auth.security.refresh_token_ttl = Duration::from_secs(60);
        assert!(config.validate().is_err());
    }
}
