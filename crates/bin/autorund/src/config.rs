//! Configuration loading — TOML file with environment variable overrides.
//!
//! Looks for `autorun.toml` in the working directory. Every field has a
//! sensible default so the file is optional. Environment variables take
//! precedence over file values.

use serde::Deserialize;

use autorun_adapter_virtual::SimulationConfig;
use autorun_app::config::RunnerConfig;

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runner options.
    pub runner: RunnerConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// Starting conditions of the virtual world.
    pub simulation: SimulationConfig,
}

/// Logging configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (`RUST_LOG` syntax).
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "autorund=info,autorun_app=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `autorun.toml` (if present) then apply
    /// environment-variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML file exists but is malformed, or if the
    /// resulting configuration is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::from_file("autorun.toml")?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(ConfigError::Parse),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(err) => Err(ConfigError::Io(err)),
        }
    }

    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(val) = lookup("AUTORUN_ENABLED") {
            self.runner.enabled = parse("AUTORUN_ENABLED", &val)?;
        }
        if let Some(val) = lookup("AUTORUN_STRATEGY") {
            self.runner.strategy = val
                .parse()
                .map_err(|reason| ConfigError::Env("AUTORUN_STRATEGY", reason))?;
        }
        if let Some(val) = lookup("AUTORUN_ACTIONS_PER_TICK") {
            self.runner.actions_per_tick = parse("AUTORUN_ACTIONS_PER_TICK", &val)?;
        }
        if let Some(val) = lookup("AUTORUN_TICK_MS") {
            self.runner.tick_ms = parse("AUTORUN_TICK_MS", &val)?;
        }
        if let Some(val) = lookup("AUTORUN_LOG") {
            self.logging.filter = val;
        }
        if let Some(val) = lookup("RUST_LOG") {
            self.logging.filter = val;
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.runner.tick_ms == 0 {
            return Err(ConfigError::Validation("tick_ms must be non-zero".to_string()));
        }
        if self.runner.actions_per_tick == 0 {
            return Err(ConfigError::Validation(
                "actions_per_tick must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|err: T::Err| ConfigError::Env(key, err.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML parse failure.
    #[error("failed to parse config file")]
    Parse(#[from] toml::de::Error),
    /// File I/O failure.
    #[error("failed to read config file")]
    Io(#[from] std::io::Error),
    /// An environment override could not be parsed.
    #[error("invalid value for {0}: {1}")]
    Env(&'static str, String),
    /// Semantic validation failure.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use autorun_app::config::ExecutionStrategy;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn should_produce_sensible_defaults() {
        let config = Config::default();
        assert!(config.runner.enabled);
        assert_eq!(config.runner.tick_ms, 600);
        assert_eq!(config.simulation.target, "Man");
        assert_eq!(config.logging.filter, "autorund=info,autorun_app=info");
    }

    #[test]
    fn should_parse_minimal_toml() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.runner.actions_per_tick, 1);
    }

    #[test]
    fn should_parse_full_toml() {
        let toml = "
            [runner]
            enabled = false
            strategy = 'interception'
            actions_per_tick = 3
            consume_when_idle = true
            tick_ms = 100

            [runner.breaks]
            enabled = true
            interval_ticks = 50
            duration_ticks = 5

            [logging]
            filter = 'debug'

            [simulation]
            target = 'Guard'
            food = 'Cake'
            success_percent = 60
            seed = 42
        ";
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.runner.enabled);
        assert_eq!(config.runner.strategy, ExecutionStrategy::Interception);
        assert_eq!(config.runner.actions_per_tick, 3);
        assert!(config.runner.consume_when_idle);
        assert_eq!(config.runner.tick_ms, 100);
        assert!(config.runner.breaks.enabled);
        assert_eq!(config.runner.breaks.interval_ticks, 50);
        assert_eq!(config.logging.filter, "debug");
        assert_eq!(config.simulation.target, "Guard");
        assert_eq!(config.simulation.seed, Some(42));
        assert_eq!(config.simulation.food_count, 10);
    }

    #[test]
    fn should_return_default_when_file_not_found() {
        let config = Config::from_file("nonexistent.toml").unwrap();
        assert_eq!(config.runner.tick_ms, 600);
    }

    #[test]
    fn should_apply_env_overrides() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[
                ("AUTORUN_ENABLED", "false"),
                ("AUTORUN_STRATEGY", "interception"),
                ("AUTORUN_ACTIONS_PER_TICK", "4"),
                ("AUTORUN_TICK_MS", "250"),
                ("AUTORUN_LOG", "warn"),
            ]))
            .unwrap();
        assert!(!config.runner.enabled);
        assert_eq!(config.runner.strategy, ExecutionStrategy::Interception);
        assert_eq!(config.runner.actions_per_tick, 4);
        assert_eq!(config.runner.tick_ms, 250);
        assert_eq!(config.logging.filter, "warn");
    }

    #[test]
    fn should_prefer_rust_log_over_autorun_log() {
        let mut config = Config::default();
        config
            .apply_overrides(env(&[("AUTORUN_LOG", "warn"), ("RUST_LOG", "trace")]))
            .unwrap();
        assert_eq!(config.logging.filter, "trace");
    }

    #[test]
    fn should_reject_unparsable_override() {
        let mut config = Config::default();
        let result = config.apply_overrides(env(&[("AUTORUN_TICK_MS", "fast")]));
        assert!(matches!(result, Err(ConfigError::Env("AUTORUN_TICK_MS", _))));
    }

    #[test]
    fn should_reject_zero_tick_length() {
        let mut config = Config::default();
        config.runner.tick_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_reject_zero_action_budget() {
        let mut config = Config::default();
        config.runner.actions_per_tick = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn should_report_parse_error_for_invalid_toml() {
        let result: Result<Config, _> = toml::from_str("invalid {{{");
        assert!(result.is_err());
    }
}
