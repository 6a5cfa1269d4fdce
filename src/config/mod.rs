//! Configuration management for the arbitrage engine.
//!
//! Loads settings from an optional config file and environment variables.
//! With neither present, the defaults reproduce the compiled-in constants.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// The two share classes being traded
    #[serde(default)]
    pub instruments: InstrumentsConfig,
    /// Position and hedge limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Opportunity detection and trade sizing
    #[serde(default)]
    pub strategy: StrategyConfig,
    /// Control loop cadence
    #[serde(default)]
    pub runtime: RuntimeConfig,
    /// Simulated venue used for paper trading
    #[serde(default)]
    pub paper: PaperConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentsConfig {
    #[serde(default = "default_instrument_a")]
    pub a: String,
    #[serde(default = "default_instrument_b")]
    pub b: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Absolute position cap per instrument (symmetric for long and short)
    #[serde(default = "default_max_position")]
    pub max_position: i64,
    /// Dead band on the combined position with no corrective action
    #[serde(default = "default_hedge_tolerance")]
    pub hedge_tolerance: i64,
    /// Combined position beyond which correction is urgent
    #[serde(default = "default_hedge_action_limit")]
    pub hedge_action_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Price gap the cross-instrument spread must strictly exceed
    #[serde(default = "default_min_spread")]
    pub min_spread: Decimal,
    /// Base number of units per order
    #[serde(default = "default_trade_size")]
    pub trade_size: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Sleep between iterations in milliseconds
    #[serde(default = "default_sleep_ms")]
    pub sleep_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    #[serde(default = "default_paper_base_mid")]
    pub base_mid: Decimal,
    #[serde(default = "default_paper_amplitude")]
    pub amplitude: Decimal,
    #[serde(default = "default_paper_half_spread")]
    pub half_spread: Decimal,
    #[serde(default = "default_paper_period")]
    pub period: u64,
    #[serde(default = "default_paper_depth")]
    pub depth: i64,
}

// Default value functions
fn default_instrument_a() -> String {
    "PHILIPS_A".to_string()
}

fn default_instrument_b() -> String {
    "PHILIPS_B".to_string()
}

fn default_max_position() -> i64 {
    200
}

fn default_hedge_tolerance() -> i64 {
    3
}

fn default_hedge_action_limit() -> i64 {
    9
}

fn default_min_spread() -> Decimal {
    Decimal::new(2, 1) // 0.2
}

fn default_trade_size() -> i64 {
    10
}

fn default_sleep_ms() -> u64 {
    500
}

fn default_paper_base_mid() -> Decimal {
    Decimal::new(30, 0)
}

fn default_paper_amplitude() -> Decimal {
    Decimal::new(20, 2) // 0.20, gap peaks at 0.40
}

fn default_paper_half_spread() -> Decimal {
    Decimal::new(5, 2) // 0.05
}

fn default_paper_period() -> u64 {
    8
}

fn default_paper_depth() -> i64 {
    25
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::Environment::default().separator("__").prefix("DLA"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.instruments.a.is_empty() && !self.instruments.b.is_empty(),
            "instrument identifiers must not be empty"
        );

        anyhow::ensure!(
            self.instruments.a != self.instruments.b,
            "instruments a and b must differ"
        );

        anyhow::ensure!(self.limits.max_position > 0, "max_position must be > 0");

        anyhow::ensure!(
            self.limits.hedge_tolerance >= 0
                && self.limits.hedge_tolerance < self.limits.hedge_action_limit,
            "hedge_tolerance must be >= 0 and < hedge_action_limit"
        );

        anyhow::ensure!(
            self.strategy.min_spread >= Decimal::ZERO,
            "min_spread must be >= 0"
        );

        anyhow::ensure!(self.strategy.trade_size > 0, "trade_size must be > 0");

        anyhow::ensure!(
            self.paper.period >= 2 && self.paper.depth > 0,
            "paper period must be >= 2 and depth > 0"
        );

        Ok(())
    }

    pub fn sleep_interval(&self) -> Duration {
        Duration::from_millis(self.runtime.sleep_ms)
    }
}

impl Default for InstrumentsConfig {
    fn default() -> Self {
        Self {
            a: default_instrument_a(),
            b: default_instrument_b(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_position: default_max_position(),
            hedge_tolerance: default_hedge_tolerance(),
            hedge_action_limit: default_hedge_action_limit(),
        }
    }
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            min_spread: default_min_spread(),
            trade_size: default_trade_size(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sleep_ms: default_sleep_ms(),
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            base_mid: default_paper_base_mid(),
            amplitude: default_paper_amplitude(),
            half_spread: default_paper_half_spread(),
            period: default_paper_period(),
            depth: default_paper_depth(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_match_compiled_constants() {
        let config = Config::default();
        assert_eq!(config.instruments.a, "PHILIPS_A");
        assert_eq!(config.instruments.b, "PHILIPS_B");
        assert_eq!(config.limits.max_position, 200);
        assert_eq!(config.limits.hedge_tolerance, 3);
        assert_eq!(config.limits.hedge_action_limit, 9);
        assert_eq!(config.strategy.min_spread, dec!(0.2));
        assert_eq!(config.strategy.trade_size, 10);
        assert_eq!(config.sleep_interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_tolerance_must_be_below_action_limit() {
        let mut config = Config::default();
        config.limits.hedge_tolerance = 9;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_spread_rejected() {
        let mut config = Config::default();
        config.strategy.min_spread = dec!(-0.01);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                "[limits]\nmax_position = 50\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.limits.max_position, 50);
        assert_eq!(config.limits.hedge_action_limit, 9);
        assert_eq!(config.instruments.b, "PHILIPS_B");
    }
}
