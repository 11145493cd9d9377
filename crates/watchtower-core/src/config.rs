//! TOML-based watchtower configuration.
//!
//! Stores:
//! - Key-value store connection (endpoint URL, access token, timeout)
//! - Scheduler cadence and daily report recipients
//! - Matching threshold for high-priority alerts
//! - HTTP opportunity sources
//! - An optional override of the institutional capability profile
//!
//! Configuration is stored at `~/.config/watchtower/config.toml`.
//! `KV_REST_API_URL` and `KV_REST_API_TOKEN` override the store section.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::capabilities::Capabilities;
use crate::error::ConfigError;

pub const ENV_STORE_URL: &str = "KV_REST_API_URL";
pub const ENV_STORE_TOKEN: &str = "KV_REST_API_TOKEN";

/// Shown in place of a configured access token.
pub const REDACTED: &str = "********";

/// Returns `~/.config/watchtower[-dev]/` based on WATCHTOWER_ENV.
///
/// Set WATCHTOWER_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WATCHTOWER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("watchtower-dev")
    } else {
        base_dir.join("watchtower")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(e.to_string()))?;
    Ok(dir)
}

/// Key-value store connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_store_timeout")]
    pub timeout_secs: u64,
}

/// Scheduler cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_scan_interval")]
    pub scan_interval_mins: u64,
    #[serde(default = "default_match_interval")]
    pub match_interval_mins: u64,
    #[serde(default = "default_compliance_interval")]
    pub compliance_interval_mins: u64,
    #[serde(default = "default_notification_interval")]
    pub notification_interval_mins: u64,
    /// Local hour (0-23) of the daily report.
    #[serde(default = "default_report_hour")]
    pub daily_report_hour: u32,
    #[serde(default = "default_recipients")]
    pub report_recipients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Scores strictly above this raise a high-priority alert.
    #[serde(default = "default_high_priority_threshold")]
    pub high_priority_threshold: f64,
}

/// An HTTP endpoint returning a JSON array of opportunities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_source_timeout")]
    pub timeout_secs: u64,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/watchtower/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub matching: MatchingConfig,
    /// Serve the built-in federal catalog as an opportunity source.
    #[serde(default = "default_true")]
    pub builtin_catalog: bool,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
    /// Replaces the built-in institutional profile when set.
    #[serde(default)]
    pub capabilities: Option<Capabilities>,
}

fn default_store_timeout() -> u64 {
    10
}
fn default_source_timeout() -> u64 {
    30
}
fn default_scan_interval() -> u64 {
    5
}
fn default_match_interval() -> u64 {
    10
}
fn default_compliance_interval() -> u64 {
    30
}
fn default_notification_interval() -> u64 {
    2
}
fn default_report_hour() -> u32 {
    6
}
fn default_recipients() -> Vec<String> {
    vec![
        "research-admin@example.org".into(),
        "watchtower-ops@example.org".into(),
    ]
}
fn default_high_priority_threshold() -> f64 {
    0.8
}
fn default_true() -> bool {
    true
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: None,
            token: None,
            timeout_secs: default_store_timeout(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scan_interval_mins: default_scan_interval(),
            match_interval_mins: default_match_interval(),
            compliance_interval_mins: default_compliance_interval(),
            notification_interval_mins: default_notification_interval(),
            daily_report_hour: default_report_hour(),
            report_recipients: default_recipients(),
        }
    }
}

impl SchedulerConfig {
    pub fn scan_interval(&self) -> Duration {
        minutes(self.scan_interval_mins)
    }

    pub fn match_interval(&self) -> Duration {
        minutes(self.match_interval_mins)
    }

    pub fn compliance_interval(&self) -> Duration {
        minutes(self.compliance_interval_mins)
    }

    pub fn notification_interval(&self) -> Duration {
        minutes(self.notification_interval_mins)
    }

    /// Reject zero or over-long intervals and out-of-range hours.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let intervals = [
            ("scheduler.scan_interval_mins", self.scan_interval_mins),
            ("scheduler.match_interval_mins", self.match_interval_mins),
            ("scheduler.compliance_interval_mins", self.compliance_interval_mins),
            ("scheduler.notification_interval_mins", self.notification_interval_mins),
        ];
        for (key, value) in intervals {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: "interval must be at least one minute".into(),
                });
            }
            if value > MAX_INTERVAL_MINS {
                return Err(ConfigError::InvalidValue {
                    key: key.into(),
                    message: format!("interval must be at most {} minutes (one week)", MAX_INTERVAL_MINS),
                });
            }
        }
        if self.daily_report_hour > 23 {
            return Err(ConfigError::InvalidValue {
                key: "scheduler.daily_report_hour".into(),
                message: format!("{} is not an hour of the day", self.daily_report_hour),
            });
        }
        Ok(())
    }
}

/// Longest accepted task interval: one week.
pub const MAX_INTERVAL_MINS: u64 = 7 * 24 * 60;

fn minutes(m: u64) -> Duration {
    Duration::from_secs(m.saturating_mul(60))
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            high_priority_threshold: default_high_priority_threshold(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            scheduler: SchedulerConfig::default(),
            matching: MatchingConfig::default(),
            builtin_catalog: true,
            sources: Vec::new(),
            capabilities: None,
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::InvalidValue {
            key: key.to_string(),
            message: "unknown config key".into(),
        };
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().map_or(true, |p| p.is_empty()) {
            return Err(ConfigError::MissingKey("config key is empty".into()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// Default location of the config file.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default path, writing defaults on first use.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path()?)
    }

    /// Load from `path`, writing defaults there when the file does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed, or if the
    /// default config cannot be written.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.scheduler.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to `path`.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
    }

    /// Apply `KV_REST_API_URL` / `KV_REST_API_TOKEN` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|name| std::env::var(name).ok())
    }

    /// Apply store overrides from an arbitrary variable lookup.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(url) = lookup(ENV_STORE_URL).filter(|v| !v.is_empty()) {
            self.store.url = Some(url);
        }
        if let Some(token) = lookup(ENV_STORE_TOKEN).filter(|v| !v.is_empty()) {
            self.store.token = Some(token);
        }
        self
    }

    /// Capability profile in effect.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
            .clone()
            .unwrap_or_else(Capabilities::institutional_default)
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Copy with every access token masked, for display.
    pub fn redacted(&self) -> Config {
        fn mask(token: &mut Option<String>) {
            if token.is_some() {
                *token = Some(REDACTED.to_string());
            }
        }

        let mut copy = self.clone();
        mask(&mut copy.store.token);
        for source in &mut copy.sources {
            mask(&mut source.token);
        }
        copy
    }

    /// Like [`get`](Self::get), but access tokens read as [`REDACTED`].
    pub fn get_redacted(&self, key: &str) -> Option<String> {
        self.redacted().get(key)
    }

    /// Set a config value by key. Returns error if key is unknown or the
    /// value does not fit the field.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.scheduler.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.store.url, None);
        assert_eq!(cfg.store.timeout_secs, 10);
        assert_eq!(cfg.scheduler.scan_interval(), Duration::from_secs(300));
        assert_eq!(cfg.scheduler.match_interval(), Duration::from_secs(600));
        assert_eq!(cfg.scheduler.compliance_interval(), Duration::from_secs(1800));
        assert_eq!(cfg.scheduler.notification_interval(), Duration::from_secs(120));
        assert_eq!(cfg.scheduler.daily_report_hour, 6);
        assert_eq!(cfg.scheduler.report_recipients.len(), 2);
        assert_eq!(cfg.matching.high_priority_threshold, 0.8);
        assert!(cfg.builtin_catalog);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [store]
            url = "https://kv.example.com"

            [scheduler]
            scan_interval_mins = 1
            "#,
        )
        .unwrap();
        assert_eq!(cfg.store.url.as_deref(), Some("https://kv.example.com"));
        assert_eq!(cfg.store.token, None);
        assert_eq!(cfg.scheduler.scan_interval_mins, 1);
        assert_eq!(cfg.scheduler.match_interval_mins, 10);
    }

    #[test]
    fn env_overrides_replace_store_section() {
        let cfg = Config::default().with_overrides_from(|name| match name {
            ENV_STORE_URL => Some("https://kv.example.com".into()),
            ENV_STORE_TOKEN => Some("tok".into()),
            _ => None,
        });
        assert_eq!(cfg.store.url.as_deref(), Some("https://kv.example.com"));
        assert_eq!(cfg.store.token.as_deref(), Some("tok"));
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut base = Config::default();
        base.store.url = Some("https://file.example.com".into());
        let cfg = base.with_overrides_from(|_| Some(String::new()));
        assert_eq!(cfg.store.url.as_deref(), Some("https://file.example.com"));
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("scheduler.daily_report_hour").as_deref(), Some("6"));
        assert_eq!(cfg.get("builtin_catalog").as_deref(), Some("true"));
        assert!(cfg.get("scheduler.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("scheduler.scan_interval_mins", "15").unwrap();
        cfg.set("store.url", "https://kv.example.com").unwrap();
        cfg.set("matching.high_priority_threshold", "0.9").unwrap();

        assert_eq!(cfg.scheduler.scan_interval_mins, 15);
        assert_eq!(cfg.store.url.as_deref(), Some("https://kv.example.com"));
        assert_eq!(cfg.matching.high_priority_threshold, 0.9);
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_values() {
        let mut cfg = Config::default();
        assert!(cfg.set("scheduler.nonexistent", "1").is_err());
        assert!(cfg.set("builtin_catalog", "not_a_bool").is_err());
        assert!(cfg.set("scheduler.scan_interval_mins", "0").is_err());
        assert!(cfg.set("scheduler.daily_report_hour", "24").is_err());
        assert!(cfg.set("scheduler.match_interval_mins", "10081").is_err());
        assert!(cfg
            .set("scheduler.compliance_interval_mins", &u64::MAX.to_string())
            .is_err());
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn redaction_masks_store_and_source_tokens() {
        let mut cfg = Config::default();
        cfg.set("store.token", "kv-secret").unwrap();
        cfg.set(
            "sources",
            r#"[{"name":"grants","url":"https://feeds.example.org/grants","token":"feed-secret"},
                {"name":"open","url":"https://feeds.example.org/open"}]"#,
        )
        .unwrap();

        assert_eq!(cfg.get("store.token").as_deref(), Some("kv-secret"));
        assert_eq!(cfg.get_redacted("store.token").as_deref(), Some(REDACTED));

        let listed = serde_json::to_string(&cfg.redacted()).unwrap();
        assert!(!listed.contains("kv-secret"));
        assert!(!listed.contains("feed-secret"));

        let sources = cfg.get_redacted("sources").unwrap();
        assert!(!sources.contains("feed-secret"));
        assert!(sources.contains("https://feeds.example.org/grants"));

        let redacted = cfg.redacted();
        assert_eq!(redacted.sources[1].token, None);
        assert_eq!(redacted.store.url, cfg.store.url);
    }

    #[test]
    fn unset_tokens_stay_unset_when_redacted() {
        let cfg = Config::default();
        assert_eq!(cfg.redacted(), cfg);
        assert_eq!(cfg.get_redacted("store.token").as_deref(), Some("null"));
    }

    #[test]
    fn interval_bounds_are_inclusive_of_one_week() {
        let mut cfg = Config::default();
        cfg.set("scheduler.scan_interval_mins", &MAX_INTERVAL_MINS.to_string())
            .unwrap();
        assert_eq!(cfg.scheduler.scan_interval(), Duration::from_secs(7 * 24 * 3600));
        cfg.set("scheduler.scan_interval_mins", "1").unwrap();
        assert_eq!(cfg.scheduler.scan_interval(), Duration::from_secs(60));
    }

    #[test]
    fn huge_interval_in_file_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[scheduler]\nnotification_interval_mins = 20000\n",
        )
        .unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::InvalidValue { key, .. }) if key == "scheduler.notification_interval_mins"
        ));
    }

    #[test]
    fn interval_conversion_saturates() {
        let cfg = SchedulerConfig {
            scan_interval_mins: u64::MAX,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.scan_interval(), Duration::from_secs(u64::MAX));
    }

    #[test]
    fn load_from_writes_defaults_then_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let first = Config::load_from(&path).unwrap();
        assert!(path.exists());

        let mut edited = first.clone();
        edited.set("scheduler.daily_report_hour", "7").unwrap();
        edited.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.scheduler.daily_report_hour, 7);
    }

    #[test]
    fn load_from_reports_parse_failures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "store = 12").unwrap();

        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::LoadFailed { .. })
        ));
    }

    #[test]
    fn capabilities_override() {
        let mut cfg = Config::default();
        assert_eq!(cfg.capabilities(), Capabilities::institutional_default());

        cfg.capabilities = Some(Capabilities::default());
        assert!(cfg.capabilities().research_areas.is_empty());
    }
}
