//! Run-wide report configuration.

use crate::error::{CoreError, Result};
use serde::{Deserialize, Serialize};

/// Which keys survive the stream merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeMode {
    /// Impressions define the universe of groups; clicks and payments
    /// without a same-key impression are dropped.
    #[default]
    ImpressionsDriven,

    /// Every key seen in any of the three streams is kept.
    FullOuter,
}

impl std::fmt::Display for MergeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeMode::ImpressionsDriven => write!(f, "impressions_driven"),
            MergeMode::FullOuter => write!(f, "full_outer"),
        }
    }
}

/// How trailing-window sums are computed. Both produce identical output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowStrategy {
    /// Partition by `(user_id, value_prop)`, then a two-pointer pass per partition.
    #[default]
    SlidingWindow,

    /// Self-join on `(user_id, value_prop)` followed by a date-range filter.
    SelfJoin,
}

impl std::fmt::Display for WindowStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowStrategy::SlidingWindow => write!(f, "sliding_window"),
            WindowStrategy::SelfJoin => write!(f, "self_join"),
        }
    }
}

impl std::str::FromStr for WindowStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "sliding_window" | "sliding" => Ok(WindowStrategy::SlidingWindow),
            "self_join" => Ok(WindowStrategy::SelfJoin),
            _ => Err(format!("Unknown window strategy: {}", s)),
        }
    }
}

/// Configuration passed into [`crate::pipeline::run`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Days in one reporting period.
    #[serde(default = "default_period")]
    pub period: u32,

    /// Number of periods the trailing window spans.
    #[serde(default = "default_lookback_periods")]
    pub lookback_periods: u32,

    /// Keep only rows from the most recent period.
    #[serde(default = "default_filter_output")]
    pub filter_output: bool,

    #[serde(default)]
    pub merge: MergeMode,

    #[serde(default)]
    pub strategy: WindowStrategy,
}

fn default_period() -> u32 {
    7
}

fn default_lookback_periods() -> u32 {
    3
}

fn default_filter_output() -> bool {
    true
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            lookback_periods: default_lookback_periods(),
            filter_output: default_filter_output(),
            merge: MergeMode::default(),
            strategy: WindowStrategy::default(),
        }
    }
}

impl ReportConfig {
    /// Lookback window length `W` in days.
    pub fn window_days(&self) -> i64 {
        i64::from(self.period) * i64::from(self.lookback_periods)
    }

    pub fn validate(&self) -> Result<()> {
        if self.period == 0 {
            return Err(CoreError::config("period must be at least one day"));
        }
        if self.lookback_periods == 0 {
            return Err(CoreError::config("lookback_periods must be at least 1"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_days_is_period_times_lookback() {
        let config = ReportConfig::default();
        assert_eq!(config.window_days(), 21);
    }

    #[test]
    fn test_zero_period_rejected() {
        let config = ReportConfig {
            period: 0,
            ..ReportConfig::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config { .. })));
    }

    #[test]
    fn test_defaults_from_yaml() {
        let config: ReportConfig = serde_yaml::from_str("period: 14\n").unwrap();
        assert_eq!(config.period, 14);
        assert_eq!(config.lookback_periods, 3);
        assert!(config.filter_output);
        assert_eq!(config.merge, MergeMode::ImpressionsDriven);
    }

    #[test]
    fn test_merge_mode_yaml() {
        let config: ReportConfig = serde_yaml::from_str("merge: full_outer\nstrategy: self_join\n").unwrap();
        assert_eq!(config.merge, MergeMode::FullOuter);
        assert_eq!(config.strategy, WindowStrategy::SelfJoin);
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("sliding".parse::<WindowStrategy>(), Ok(WindowStrategy::SlidingWindow));
        assert_eq!("self-join".parse::<WindowStrategy>(), Ok(WindowStrategy::SelfJoin));
        assert!("hash".parse::<WindowStrategy>().is_err());
    }
}
