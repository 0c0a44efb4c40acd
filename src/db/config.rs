//! Database configuration module.

use std::env;
use std::str::FromStr;

/// PostgreSQL connection settings for the tournament store.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub database_url: String,

    /// Connection pool size bounds
    pub max_connections: u32,
    pub min_connections: u32,

    /// Connection acquisition timeout in seconds
    pub connection_timeout_secs: u64,

    /// Idle connection timeout and maximum lifetime, in seconds
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl DatabaseConfig {
    /// Read the configuration from the environment.
    ///
    /// `DATABASE_URL` is required. The pool knobs (`DB_MAX_CONNECTIONS`,
    /// `DB_MIN_CONNECTIONS`, `DB_CONNECTION_TIMEOUT`, `DB_IDLE_TIMEOUT`,
    /// `DB_MAX_LIFETIME`) fall back to the defaults.
    ///
    /// # Panics
    ///
    /// Panics if `DATABASE_URL` is not set, or if a pool knob is set but
    /// does not parse as a number.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            max_connections: env_knob("DB_MAX_CONNECTIONS", defaults.max_connections),
            min_connections: env_knob("DB_MIN_CONNECTIONS", defaults.min_connections),
            connection_timeout_secs: env_knob(
                "DB_CONNECTION_TIMEOUT",
                defaults.connection_timeout_secs,
            ),
            idle_timeout_secs: env_knob("DB_IDLE_TIMEOUT", defaults.idle_timeout_secs),
            max_lifetime_secs: env_knob("DB_MAX_LIFETIME", defaults.max_lifetime_secs),
        }
    }
}

impl Default for DatabaseConfig {
    /// Local development defaults.
    fn default() -> Self {
        Self {
            database_url: "postgres://postgres@localhost/vtes_tournament".to_string(),
            max_connections: 20,
            min_connections: 5,
            connection_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

fn env_knob<T: FromStr>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .unwrap_or_else(|_| panic!("{name} must be a valid number")),
        Err(_) => default,
    }
}
