//! Statistics — named counters with per-hour and percentage views.
//!
//! Domain code bumps counters with [`StatisticTracker::add`]; the runner calls
//! [`StatisticTracker::tick`] once per active time step, which is also what
//! per-hour rates are measured against. Session time is counted in ticks, so
//! rates are deterministic for a given tick length.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// How a statistic should be rendered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StatisticDisplay {
    /// Raw accumulated value.
    Value { name: String },
    /// Accumulated value extrapolated to one hour.
    PerHour { name: String },
    /// Share of `name` among the sum of `of`.
    Percentage { name: String, of: Vec<String> },
}

/// One rendered statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticLine {
    pub label: String,
    pub value: String,
}

/// Accumulators plus the display configuration chosen by the rule catalog.
#[derive(Debug, Clone)]
pub struct StatisticTracker {
    tick_duration: Duration,
    ticks: u64,
    values: BTreeMap<String, i64>,
    per_hour: BTreeMap<String, f64>,
    displays: Vec<StatisticDisplay>,
}

impl StatisticTracker {
    /// Create an empty tracker where one tick lasts `tick_duration`.
    #[must_use]
    pub fn new(tick_duration: Duration) -> Self {
        Self {
            tick_duration,
            ticks: 0,
            values: BTreeMap::new(),
            per_hour: BTreeMap::new(),
            displays: Vec::new(),
        }
    }

    /// Add `delta` to the named counter, creating it at zero.
    pub fn add(&mut self, name: &str, delta: i64) {
        let value = self.values.entry(name.to_string()).or_insert(0);
        *value = value.saturating_add(delta);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> i64 {
        self.values.get(name).copied().unwrap_or(0)
    }

    /// Ticks counted since the session started or was last cleared.
    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Advance the session clock by one tick and recompute hourly rates.
    #[allow(clippy::cast_precision_loss)]
    pub fn tick(&mut self) {
        self.ticks = self.ticks.saturating_add(1);
        let elapsed_ms = self.ticks as f64 * self.tick_duration.as_secs_f64() * 1000.0;
        self.per_hour = self
            .values
            .iter()
            .map(|(name, value)| {
                let rate = if elapsed_ms > 0.0 {
                    *value as f64 * MILLIS_PER_HOUR / elapsed_ms
                } else {
                    0.0
                };
                (name.clone(), rate)
            })
            .collect();
    }

    /// Hourly rate as of the last [`tick`](Self::tick).
    #[must_use]
    pub fn per_hour(&self, name: &str) -> f64 {
        self.per_hour.get(name).copied().unwrap_or(0.0)
    }

    /// Share of `name` among the sum of `of`, in percent. `None` when the
    /// sum is zero.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self, name: &str, of: &[String]) -> Option<f64> {
        let total: i64 = of.iter().map(|n| self.get(n)).sum();
        (total != 0).then(|| self.get(name) as f64 * 100.0 / total as f64)
    }

    /// Reset every counter and the session clock. Displays are kept.
    pub fn clear(&mut self) {
        self.values.clear();
        self.per_hour.clear();
        self.ticks = 0;
    }

    /// Forget the display configuration, e.g. before a catalog re-runs setup.
    pub fn clear_displays(&mut self) {
        self.displays.clear();
    }

    pub fn add_displays<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.displays.extend(names.into_iter().map(|name| StatisticDisplay::Value {
            name: name.to_string(),
        }));
    }

    pub fn add_per_hour_displays<'a>(&mut self, names: impl IntoIterator<Item = &'a str>) {
        self.displays.extend(names.into_iter().map(|name| StatisticDisplay::PerHour {
            name: name.to_string(),
        }));
    }

    pub fn add_percentage_display<'a>(
        &mut self,
        name: &str,
        of: impl IntoIterator<Item = &'a str>,
    ) {
        self.displays.push(StatisticDisplay::Percentage {
            name: name.to_string(),
            of: of.into_iter().map(str::to_string).collect(),
        });
    }

    #[must_use]
    pub fn displays(&self) -> &[StatisticDisplay] {
        &self.displays
    }

    /// Render every configured display.
    #[must_use]
    pub fn lines(&self) -> Vec<StatisticLine> {
        self.displays
            .iter()
            .map(|display| match display {
                StatisticDisplay::Value { name } => StatisticLine {
                    label: name.clone(),
                    value: self.get(name).to_string(),
                },
                StatisticDisplay::PerHour { name } => StatisticLine {
                    label: format!("{name}/hr"),
                    value: format!("{:.0}", self.per_hour(name)),
                },
                StatisticDisplay::Percentage { name, of } => StatisticLine {
                    label: format!("{name} %"),
                    value: self
                        .percentage(name, of)
                        .map_or_else(|| "-".to_string(), |p| format!("{p:.1}%")),
                },
            })
            .collect()
    }
}

impl Default for StatisticTracker {
    fn default() -> Self {
        Self::new(Duration::from_millis(600))
    }
}
