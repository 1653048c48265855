//! TOML-based engine configuration.
//!
//! One section per pipeline stage:
//! - `forecast`: history window, model version, result lag
//! - `scoring`: confidence and probability weights
//! - `alerts`: deadline and opportunity thresholds
//! - `calendar`: upcoming and high-priority cut-offs
//! - `priority`: program ranking weights
//!
//! Configuration is stored at `~/.config/grantcast/config.toml`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::alerts::AlertConfig;
use crate::calendar::CalendarConfig;
use crate::engine::EngineConfig;
use crate::error::ConfigError;
use crate::forecast::{ForecastConfig, ScoringConfig};
use crate::priority::PriorityWeights;

/// Default horizon of `upcoming`, in days.
fn default_upcoming_days() -> u32 {
    90
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/grantcast/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub alerts: AlertConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub priority: PriorityWeights,
    #[serde(default = "default_upcoming_days")]
    pub upcoming_days: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            forecast: ForecastConfig::default(),
            scoring: ScoringConfig::default(),
            alerts: AlertConfig::default(),
            calendar: CalendarConfig::default(),
            priority: PriorityWeights::default(),
            upcoming_days: default_upcoming_days(),
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
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
                        return Err(unknown());
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
    pub fn path() -> Result<PathBuf, ConfigError> {
        data_dir()
            .map(|dir| dir.join("config.toml"))
            .map_err(|e| ConfigError::LoadFailed {
                path: PathBuf::from("config.toml"),
                message: e.to_string(),
            })
    }

    /// Load from the default location, writing defaults when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string())),
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

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Set a value by dot-separated key, in memory only.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value does not fit the
    /// field's type.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Ok(())
    }

    /// Every leaf key with its current value, in dot-path form.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (k, v) in map {
                        let path = if prefix.is_empty() { k.clone() } else { format!("{prefix}.{k}") };
                        walk(&path, v, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }
        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        out.sort();
        out
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            forecast: self.forecast.clone(),
            scoring: self.scoring.clone(),
            alerts: self.alerts.clone(),
            calendar: self.calendar.clone(),
            priority: self.priority.clone(),
        }
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to default configuration");
            Self::default()
        })
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
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[forecast]\nmin_history_years = 2\n").unwrap();
        assert_eq!(parsed.forecast.min_history_years, 2);
        assert_eq!(parsed.forecast.lookback_years, 3);
        assert_eq!(parsed.alerts.deadline_window_days, 30);
        assert_eq!(parsed.upcoming_days, 90);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("forecast.model_version").as_deref(), Some("historical-v1"));
        assert_eq!(cfg.get("alerts.high_priority_days").as_deref(), Some("14"));
        assert!(cfg.get("alerts.missing_key").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("alerts.min_confidence", "75").unwrap();
        cfg.set("calendar.high_priority_threshold", "0.5").unwrap();
        cfg.set("forecast.model_version", "historical-v2").unwrap();
        assert_eq!(cfg.alerts.min_confidence, 75);
        assert!((cfg.calendar.high_priority_threshold - 0.5).abs() < f64::EPSILON);
        assert_eq!(cfg.forecast.model_version, "historical-v2");
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("alerts.nonexistent_key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(cfg.set("alerts", "1").is_err());
        assert!(cfg.set("alerts.min_confidence", "lots").is_err());
        // Out of range for u8
        assert!(cfg.set("alerts.min_confidence", "300").is_err());
        assert_eq!(cfg.alerts.min_confidence, 60);
    }

    #[test]
    fn entries_list_every_leaf() {
        let entries = Config::default().entries();
        assert!(entries.iter().any(|(k, v)| k == "scoring.confidence_cap" && v == "95"));
        assert!(entries.iter().any(|(k, _)| k == "upcoming_days"));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg, Config::default());
        assert!(path.exists());
    }
}
