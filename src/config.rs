use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};

pub const MIN_JWT_SECRET_LEN: usize = 32;

/// Settings shared by the server and the schema tool.
#[derive(Clone, Debug)]
pub struct DatabaseSettings {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_connections: u32,
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub upload_dir: PathBuf,
    pub max_connections: u32,
    pub bind_addr: String,
    pub port: u16,
    pub jwt_secret: String,
    pub frontend_url: Option<String>,
}

impl DatabaseSettings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let database_url = get("DATABASE_URL").ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;
        let upload_dir = get("UPLOAD_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("./uploads"));
        let max_connections = match get("DB_MAX_CONNECTIONS") {
            Some(v) => v.parse().with_context(|| format!("DB_MAX_CONNECTIONS is not a number: {v}"))?,
            None => 5,
        };
        if max_connections == 0 {
            bail!("DB_MAX_CONNECTIONS must be at least 1");
        }
        Ok(Self { database_url, upload_dir, max_connections })
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let db = DatabaseSettings::from_lookup(&get)?;
        let jwt_secret = get("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            bail!("JWT_SECRET must be at least {MIN_JWT_SECRET_LEN} characters long");
        }
        let port = match get("PORT") {
            Some(v) => v.parse().with_context(|| format!("PORT is not a valid port: {v}"))?,
            None => 3000,
        };
        Ok(Self {
            database_url: db.database_url,
            upload_dir: db.upload_dir,
            max_connections: db.max_connections,
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            jwt_secret,
            frontend_url: get("FRONTEND_URL").filter(|v| !v.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn defaults_apply() {
        let cfg = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", SECRET)])).unwrap();
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.bind_addr, "0.0.0.0");
        assert_eq!(cfg.upload_dir, PathBuf::from("./uploads"));
        assert_eq!(cfg.max_connections, 5);
        assert!(cfg.frontend_url.is_none());
    }

    #[test]
    fn short_secret_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://x"), ("JWT_SECRET", "short")])).unwrap_err();
        assert!(err.to_string().contains("JWT_SECRET"));
    }

    #[test]
    fn database_url_required() {
        assert!(DatabaseSettings::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn bad_port_rejected() {
        let res = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", SECRET),
            ("PORT", "eighty"),
        ]));
        assert!(res.is_err());
    }

    #[test]
    fn overrides_are_read() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://x"),
            ("JWT_SECRET", SECRET),
            ("PORT", "8080"),
            ("UPLOAD_DIR", "/srv/photos"),
            ("FRONTEND_URL", "https://app.example"),
            ("DB_MAX_CONNECTIONS", "12"),
        ])).unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.upload_dir, PathBuf::from("/srv/photos"));
        assert_eq!(cfg.frontend_url.as_deref(), Some("https://app.example"));
        assert_eq!(cfg.max_connections, 12);
    }
}
