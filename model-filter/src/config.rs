//! Database configuration management

use std::env;

use anyhow::{Context, Result, bail};

const DEFAULT_DATABASE_URL: &str = "sqlite::memory:";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Database configuration loaded from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// SQLite connection URL (`sqlite://path/to.db`, `sqlite::memory:`)
    pub database_url: String,

    /// Maximum pooled connections. In-memory databases always use one.
    pub max_connections: u32,
}

impl Config {
    /// Load configuration from the process environment (and `.env` if present)
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Prefer DATABASE_PATH (a file path), fall back to DATABASE_URL
        let database_url = match lookup("DATABASE_PATH") {
            Some(path) => format!("sqlite://{}?mode=rwc", path),
            None => lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
        };

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid DATABASE_MAX_CONNECTIONS '{}'", raw))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        if max_connections == 0 {
            bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }

        Ok(Self {
            database_url,
            max_connections,
        })
    }

    /// Whether the URL points at a private in-memory database
    pub fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.is_in_memory());
    }

    #[test]
    fn test_database_path_wins_over_url() {
        let config = Config::from_lookup(lookup(&[
            ("DATABASE_PATH", "./data/app.db"),
            ("DATABASE_URL", "sqlite://other.db"),
            ("DATABASE_MAX_CONNECTIONS", " 4 "),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "sqlite://./data/app.db?mode=rwc");
        assert_eq!(config.max_connections, 4);
        assert!(!config.is_in_memory());
    }

    #[test]
    fn test_invalid_max_connections() {
        let err = Config::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(err.to_string().contains("DATABASE_MAX_CONNECTIONS"));

        assert!(Config::from_lookup(lookup(&[("DATABASE_MAX_CONNECTIONS", "0")])).is_err());
    }
}
