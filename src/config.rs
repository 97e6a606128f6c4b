use std::{env, path::PathBuf};

use anyhow::{Context, Result, anyhow};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_STORAGE_ROOT: &str = "storage/objects";
const DEFAULT_MAX_UPLOAD_MB: u64 = 50;
const DEFAULT_SEED_ADMIN_EMAIL: &str = "coordenador@tfc.local";
const DEFAULT_SEED_ADMIN_PASSWORD: &str = "change-me";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub storage_root: PathBuf,
    pub public_base_url: String,
    pub max_upload_bytes: u64,
    pub seed_admin_email: String,
    pub seed_admin_password: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL env var is missing")?;
        Self::from_lookup(database_url, |key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(database_url: String, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("PORT must be a valid port number, got `{raw}`"))?,
            None => DEFAULT_PORT,
        };

        let max_upload_mb = match lookup("MAX_UPLOAD_MB") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("MAX_UPLOAD_MB must be an integer, got `{raw}`"))?,
            None => DEFAULT_MAX_UPLOAD_MB,
        };
        if max_upload_mb == 0 {
            return Err(anyhow!("MAX_UPLOAD_MB must be greater than zero"));
        }

        let storage_root = lookup("STORAGE_ROOT")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_STORAGE_ROOT.to_string());

        let public_base_url = lookup("PUBLIC_BASE_URL")
            .map(|value| value.trim().trim_end_matches('/').to_string())
            .unwrap_or_default();

        Ok(Self {
            database_url,
            port,
            storage_root: PathBuf::from(storage_root),
            public_base_url,
            max_upload_bytes: max_upload_mb * 1024 * 1024,
            seed_admin_email: lookup("SEED_ADMIN_EMAIL")
                .unwrap_or_else(|| DEFAULT_SEED_ADMIN_EMAIL.to_string()),
            seed_admin_password: lookup("SEED_ADMIN_PASSWORD")
                .unwrap_or_else(|| DEFAULT_SEED_ADMIN_PASSWORD.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_with(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup("postgres://localhost/tfc".to_string(), |key| {
            vars.get(key).cloned()
        })
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_with(&[]).expect("config");
        assert_eq!(config.port, 8080);
        assert_eq!(config.storage_root, PathBuf::from("storage/objects"));
        assert_eq!(config.max_upload_bytes, 50 * 1024 * 1024);
        assert!(config.public_base_url.is_empty());
    }

    #[test]
    fn public_base_url_drops_trailing_slash() {
        let config = config_with(&[("PUBLIC_BASE_URL", "https://tfc.example.org/")]).unwrap();
        assert_eq!(config.public_base_url, "https://tfc.example.org");
    }

    #[test]
    fn rejects_invalid_port_and_zero_upload_limit() {
        assert!(config_with(&[("PORT", "http")]).is_err());
        assert!(config_with(&[("MAX_UPLOAD_MB", "0")]).is_err());
    }
}
