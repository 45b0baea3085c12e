//! Spending ceiling and alert threshold.

use chronicler_error::ConfigError;
use serde::{Deserialize, Serialize};

/// Advisory cost budget for a simulation session.
///
/// # Examples
///
/// ```
/// use chronicler_usage::BudgetConfig;
///
/// let budget = BudgetConfig::default().with_limit_usd(5.0);
/// assert_eq!(budget.alert_at_usd(), 4.0);
/// assert!(budget.validate().is_ok());
/// ```
#[derive(
    Debug,
    Clone,
    PartialEq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_setters::Setters,
    derive_builder::Builder,
)]
#[serde(deny_unknown_fields)]
#[setters(prefix = "with_")]
#[builder(default)]
pub struct BudgetConfig {
    /// Session spending ceiling in USD
    #[serde(default = "default_limit_usd")]
    limit_usd: f64,

    /// Fraction of the ceiling at which an alert fires (0.0-1.0, default 0.8)
    #[serde(default = "default_alert_threshold")]
    alert_threshold: f64,
}

fn default_limit_usd() -> f64 {
    10.0
}

fn default_alert_threshold() -> f64 {
    0.8
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            limit_usd: default_limit_usd(),
            alert_threshold: default_alert_threshold(),
        }
    }
}

impl BudgetConfig {
    /// Cost at which the alert fires.
    pub fn alert_at_usd(&self) -> f64 {
        self.limit_usd * self.alert_threshold
    }

    /// Validates the ceiling is non-negative and the threshold is in (0.0, 1.0].
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.limit_usd.is_nan() || self.limit_usd < 0.0 {
            return Err(ConfigError::new(format!(
                "Budget limit must be >= 0.0, got {}",
                self.limit_usd
            )));
        }
        if self.alert_threshold <= 0.0 || self.alert_threshold > 1.0 {
            return Err(ConfigError::new(format!(
                "Budget alert threshold must be in (0.0, 1.0], got {}",
                self.alert_threshold
            )));
        }
        Ok(())
    }
}
