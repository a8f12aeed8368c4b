//! Runner configuration — the options the coordinator reads on every trigger.
//!
//! Every field has a default so a partial (or absent) configuration section
//! still yields a working autonomous runner.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How interactions leave the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    /// The runner fires interactions itself.
    #[default]
    Autonomous,
    /// The runner waits for a matching external event to consume them.
    Interception,
}

impl FromStr for ExecutionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autonomous" => Ok(Self::Autonomous),
            "interception" => Ok(Self::Interception),
            other => Err(format!("unknown execution strategy `{other}`")),
        }
    }
}

/// Options read by the [`Runner`](crate::coordinator::Runner).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Gates all resolution and execution.
    pub enabled: bool,
    pub strategy: ExecutionStrategy,
    /// Upper bound on executions within one time step.
    pub actions_per_tick: u32,
    /// In interception mode, swallow observed events while not ready.
    pub consume_when_idle: bool,
    /// Resolve on every time step.
    pub process_on_tick: bool,
    /// Resolve after every observed event.
    pub process_on_event: bool,
    /// Length of one time step in milliseconds.
    pub tick_ms: u64,
    pub breaks: BreakConfig,
}

impl RunnerConfig {
    #[must_use]
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            strategy: ExecutionStrategy::Autonomous,
            actions_per_tick: 1,
            consume_when_idle: false,
            process_on_tick: true,
            process_on_event: true,
            tick_ms: 600,
            breaks: BreakConfig::default(),
        }
    }
}

/// Settings forwarded to the break gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakConfig {
    pub enabled: bool,
    /// Ticks of work between two breaks.
    pub interval_ticks: u32,
    /// Ticks each break lasts.
    pub duration_ticks: u32,
}

impl Default for BreakConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // Roughly one hour of 600ms ticks, then five minutes off.
            interval_ticks: 6000,
            duration_ticks: 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_default_to_single_action_autonomous_runner() {
        let config = RunnerConfig::default();
        assert!(config.enabled);
        assert_eq!(config.strategy, ExecutionStrategy::Autonomous);
        assert_eq!(config.actions_per_tick, 1);
        assert!(config.process_on_tick);
        assert!(config.process_on_event);
        assert!(!config.breaks.enabled);
        assert_eq!(config.tick_duration(), Duration::from_millis(600));
    }

    #[test]
    fn should_fill_missing_fields_with_defaults() {
        let config: RunnerConfig = serde_json::from_str(
            r#"{"strategy": "interception", "breaks": {"enabled": true}}"#,
        )
        .unwrap();
        assert_eq!(config.strategy, ExecutionStrategy::Interception);
        assert!(config.breaks.enabled);
        assert_eq!(config.breaks.interval_ticks, 6000);
        assert_eq!(config.tick_ms, 600);
    }

    #[test]
    fn should_parse_strategy_case_insensitively() {
        assert_eq!(
            "Interception".parse::<ExecutionStrategy>(),
            Ok(ExecutionStrategy::Interception)
        );
        assert_eq!(
            " autonomous ".parse::<ExecutionStrategy>(),
            Ok(ExecutionStrategy::Autonomous)
        );
        assert!("manual".parse::<ExecutionStrategy>().is_err());
    }
}
