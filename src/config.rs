//! Process configuration from environment variables (a `.env` file is honoured by the binary).

use crate::error::ConfigError;
use sqlx::mysql::MySqlConnectOptions;
use std::str::FromStr;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TIMEOUT_SECS: i64 = 1800;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Where to connect: a URL, or discrete parts (which avoids escaping passwords into a URL).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DbSource {
    Url(String),
    Parts {
        host: String,
        port: u16,
        name: String,
        user: String,
        pass: String,
    },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub db: DbSource,
    /// Schema whose `information_schema` entries describe the tables.
    pub catalog: String,
    pub bind_addr: String,
    pub session_timeout_secs: i64,
    pub cookie_secure: bool,
    pub max_connections: u32,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as `from_env` with an injectable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let db = match get("DATABASE_URL") {
            Some(url) => DbSource::Url(url),
            None => DbSource::Parts {
                host: get("DB_HOST").ok_or(ConfigError::Missing("DATABASE_URL or DB_HOST"))?,
                port: parse(&get, "DB_PORT", 3306)?,
                name: get("DB_NAME").ok_or(ConfigError::Missing("DB_NAME"))?,
                user: get("DB_USER").ok_or(ConfigError::Missing("DB_USER"))?,
                pass: lookup("DB_PASS").unwrap_or_default(),
            },
        };
        let catalog = match (&db, get("DB_NAME")) {
            (_, Some(name)) => name,
            (DbSource::Url(url), None) => {
                database_from_url(url).ok_or(ConfigError::Missing("DB_NAME"))?
            }
            (DbSource::Parts { name, .. }, None) => name.clone(),
        };

        Ok(AppConfig {
            db,
            catalog,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            session_timeout_secs: parse(&get, "SESSION_TIMEOUT_SECS", DEFAULT_SESSION_TIMEOUT_SECS)?,
            cookie_secure: parse(&get, "COOKIE_SECURE", false)?,
            max_connections: parse(&get, "DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
        })
    }

    pub fn connect_options(&self) -> Result<MySqlConnectOptions, ConfigError> {
        match &self.db {
            DbSource::Url(url) => MySqlConnectOptions::from_str(url).map_err(|_| ConfigError::Invalid {
                key: "DATABASE_URL",
                value: redact(url),
            }),
            DbSource::Parts {
                host,
                port,
                name,
                user,
                pass,
            } => Ok(MySqlConnectOptions::new()
                .host(host)
                .port(*port)
                .database(name)
                .username(user)
                .password(pass)),
        }
    }
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
    }
}

/// Path segment of a `mysql://host/db?opts` URL.
fn database_from_url(url: &str) -> Option<String> {
    let rest = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let (_, path) = rest.split_once('/')?;
    let name = path.split(['?', '#']).next().unwrap_or_default();
    (!name.is_empty()).then(|| name.to_string())
}

/// URL with any password blanked, for error messages.
fn redact(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme), Some(at)) if at > scheme => {
            let creds = &url[scheme + 3..at];
            match creds.split_once(':') {
                Some((user, _)) => format!("{}{}:***{}", &url[..scheme + 3], user, &url[at..]),
                None => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn url_supplies_the_catalog_and_defaults_apply() {
        let cfg = config(&[("DATABASE_URL", "mysql://app:pw@db:3306/tienda?ssl-mode=disabled")]).unwrap();
        assert_eq!(cfg.catalog, "tienda");
        assert_eq!(cfg.bind_addr, "0.0.0.0:3000");
        assert_eq!(cfg.session_timeout_secs, 1800);
        assert!(!cfg.cookie_secure);
        assert_eq!(cfg.max_connections, 5);
    }

    #[test]
    fn discrete_parts_are_accepted() {
        let cfg = config(&[
            ("DB_HOST", "localhost"),
            ("DB_NAME", "tienda"),
            ("DB_USER", "root"),
            ("DB_PASS", "p@ss:word"),
            ("SESSION_TIMEOUT_SECS", "60"),
            ("COOKIE_SECURE", "true"),
        ])
        .unwrap();
        assert_eq!(cfg.session_timeout_secs, 60);
        assert!(cfg.cookie_secure);
        assert!(matches!(cfg.db, DbSource::Parts { port: 3306, .. }));
        assert!(cfg.connect_options().is_ok());
    }

    #[test]
    fn missing_and_invalid_values_are_errors() {
        assert!(matches!(config(&[]), Err(ConfigError::Missing(_))));
        assert!(matches!(
            config(&[("DATABASE_URL", "mysql://db/tienda"), ("DB_MAX_CONNECTIONS", "many")]),
            Err(ConfigError::Invalid { key: "DB_MAX_CONNECTIONS", .. })
        ));
        assert!(matches!(
            config(&[("DATABASE_URL", "mysql://db")]),
            Err(ConfigError::Missing("DB_NAME"))
        ));
    }

    #[test]
    fn redaction_hides_the_password() {
        assert_eq!(redact("mysql://app:pw@db/tienda"), "mysql://app:***@db/tienda");
        assert_eq!(redact("mysql://db/tienda"), "mysql://db/tienda");
    }
}
