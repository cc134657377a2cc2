//! Runtime configuration.
//!
//! Defaults describe the shipped application; environment variables (and a
//! `.env` file, when present) override them.

use crate::store::company_store::COMPANY_STORE_KEY;
use crate::store::mood_store::MOOD_STORE_KEY;
use log::debug;
use std::path::PathBuf;

const ENV_COMPANY_STORE_KEY: &str = "MOOD_TRACKER_COMPANY_KEY";
const ENV_MOOD_STORE_KEY: &str = "MOOD_TRACKER_MOOD_KEY";
const ENV_CACHE_VERSION: &str = "MOOD_TRACKER_CACHE_VERSION";
const ENV_ORIGIN: &str = "MOOD_TRACKER_ORIGIN";
const ENV_DB_PATH: &str = "MOOD_TRACKER_DB_PATH";
const ENV_LOG_LEVEL: &str = "MOOD_TRACKER_LOG_LEVEL";
const ENV_VAPID_PUBLIC_KEY: &str = "VAPID_PUBLIC_KEY";

pub const DEFAULT_CACHE_VERSION: &str = "mood-tracker-v1";
pub const DEFAULT_ORIGIN: &str = "http://localhost:5173";
pub const NOTIFICATION_TITLE: &str = "Mood Tracker";
pub const NOTIFICATION_ICON: &str = "/images/icons/icon-192x192.png";
pub const DASHBOARD_PATH: &str = "/in/u/demo";

/// Application shell resources cached at install time.
pub const APP_SHELL_MANIFEST: &[&str] = &[
    "/",
    "/app.css",
    "/favicon.png",
    "/manifest.json",
    "/images/icons/icon-192x192.png",
    "/images/icons/icon-512x512.png",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub company_store_key: String,
    pub mood_store_key: String,
    /// Cache generation label; changing it retires the previous generation.
    pub cache_version: String,
    pub cache_manifest: Vec<String>,
    /// Base URL that manifest paths and relative requests resolve against.
    pub origin: String,
    pub notification_title: String,
    pub notification_icon: String,
    pub dashboard_path: String,
    pub database_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub vapid_public_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            company_store_key: COMPANY_STORE_KEY.to_string(),
            mood_store_key: MOOD_STORE_KEY.to_string(),
            cache_version: DEFAULT_CACHE_VERSION.to_string(),
            cache_manifest: APP_SHELL_MANIFEST.iter().map(|p| p.to_string()).collect(),
            origin: DEFAULT_ORIGIN.to_string(),
            notification_title: NOTIFICATION_TITLE.to_string(),
            notification_icon: NOTIFICATION_ICON.to_string(),
            dashboard_path: DASHBOARD_PATH.to_string(),
            database_path: None,
            log_level: None,
            vapid_public_key: None,
        }
    }
}

impl AppConfig {
    /// Reads `.env` (if any) and the process environment.
    pub fn from_env() -> Self {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("event=config_dotenv module=config status=ok path={}", path.display());
        }
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source; blank values are ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(value) = var(ENV_COMPANY_STORE_KEY) {
            config.company_store_key = value;
        }
        if let Some(value) = var(ENV_MOOD_STORE_KEY) {
            config.mood_store_key = value;
        }
        if let Some(value) = var(ENV_CACHE_VERSION) {
            config.cache_version = value;
        }
        if let Some(value) = var(ENV_ORIGIN) {
            config.origin = value.trim_end_matches('/').to_string();
        }
        config.database_path = var(ENV_DB_PATH).map(PathBuf::from);
        config.log_level = var(ENV_LOG_LEVEL);
        config.vapid_public_key = var(ENV_VAPID_PUBLIC_KEY);
        config
    }

    /// Absolute URL for an application path such as `/app.css`.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else if path.starts_with('/') {
            format!("{}{}", self.origin, path)
        } else {
            format!("{}/{}", self.origin, path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, APP_SHELL_MANIFEST, DEFAULT_CACHE_VERSION};
    use std::collections::HashMap;

    #[test]
    fn defaults_match_shipped_application() {
        let config = AppConfig::default();
        assert_eq!(config.company_store_key, "company-data");
        assert_eq!(config.mood_store_key, "mood-tracker");
        assert_eq!(config.cache_version, DEFAULT_CACHE_VERSION);
        assert_eq!(config.cache_manifest.len(), APP_SHELL_MANIFEST.len());
        assert_eq!(config.vapid_public_key, None);
    }

    #[test]
    fn lookup_overrides_and_ignores_blank_values() {
        let vars = HashMap::from([
            ("MOOD_TRACKER_CACHE_VERSION", "mood-tracker-v2"),
            ("MOOD_TRACKER_ORIGIN", "https://mood.example/"),
            ("MOOD_TRACKER_MOOD_KEY", "   "),
            ("VAPID_PUBLIC_KEY", "BEl62iUYgUivxIkv69yViEuiBIa"),
        ]);
        let config = AppConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.cache_version, "mood-tracker-v2");
        assert_eq!(config.origin, "https://mood.example");
        assert_eq!(config.mood_store_key, "mood-tracker");
        assert_eq!(
            config.vapid_public_key.as_deref(),
            Some("BEl62iUYgUivxIkv69yViEuiBIa")
        );
    }

    #[test]
    fn resolve_joins_paths_against_origin() {
        let config = AppConfig::default();
        assert_eq!(config.resolve("/app.css"), "http://localhost:5173/app.css");
        assert_eq!(config.resolve("app.css"), "http://localhost:5173/app.css");
        assert_eq!(config.resolve("https://cdn.example/x"), "https://cdn.example/x");
    }
}
