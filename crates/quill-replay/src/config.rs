use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use quill_types::AccountId;

pub const DEFAULT_ENVIRONMENT_URL: &str = "https://new.quill.chat";

/// Settings read from `QUILL_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub db_path: PathBuf,
    pub account_id: AccountId,
    pub email: String,
    pub environment_url: String,
    pub is_offline: bool,
    pub preview_cache: usize,
    pub report_id: String,
    pub import: Option<PathBuf>,
    pub comment: Option<String>,
    pub anchor: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, so tests need not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let account_id = get("QUILL_ACCOUNT_ID", "0")
            .parse()
            .context("QUILL_ACCOUNT_ID must be a number")?;
        let is_offline = get("QUILL_OFFLINE", "false")
            .parse()
            .context("QUILL_OFFLINE must be true or false")?;
        let preview_cache = get("QUILL_PREVIEW_CACHE", "500")
            .parse()
            .context("QUILL_PREVIEW_CACHE must be a number")?;
        let report_id = optional("QUILL_REPORT_ID").ok_or_else(|| anyhow!("QUILL_REPORT_ID is required"))?;

        Ok(Self {
            db_path: PathBuf::from(get("QUILL_DB_PATH", "quill.db")),
            account_id,
            email: get("QUILL_EMAIL", ""),
            environment_url: get("QUILL_ENVIRONMENT_URL", DEFAULT_ENVIRONMENT_URL),
            is_offline,
            preview_cache,
            report_id,
            import: optional("QUILL_IMPORT").map(PathBuf::from),
            comment: optional("QUILL_COMMENT"),
            anchor: optional("QUILL_ANCHOR"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[("QUILL_REPORT_ID", "42")])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("quill.db"));
        assert_eq!(config.account_id, 0);
        assert_eq!(config.environment_url, DEFAULT_ENVIRONMENT_URL);
        assert!(!config.is_offline);
        assert_eq!(config.preview_cache, 500);
        assert_eq!(config.report_id, "42");
        assert_eq!(config.import, None);
        assert_eq!(config.comment, None);
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("QUILL_REPORT_ID", "42"),
            ("QUILL_ACCOUNT_ID", "7"),
            ("QUILL_OFFLINE", "true"),
            ("QUILL_IMPORT", "dump.json"),
            ("QUILL_ANCHOR", ""),
        ]))
        .unwrap();
        assert_eq!(config.account_id, 7);
        assert!(config.is_offline);
        assert_eq!(config.import, Some(PathBuf::from("dump.json")));
        assert_eq!(config.anchor, None);
    }

    #[test]
    fn test_report_id_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
        assert!(Config::from_lookup(lookup(&[("QUILL_REPORT_ID", "1"), ("QUILL_ACCOUNT_ID", "x")])).is_err());
    }
}
