//! Per-model token pricing.

use chronicler_core::TokenUsage;
use serde::{Deserialize, Serialize};

/// USD rates per thousand tokens for one model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Rate per 1,000 prompt tokens
    pub input_per_1k: f64,
    /// Rate per 1,000 completion tokens
    pub completion_per_1k: f64,
}

impl ModelPricing {
    /// Create a pricing entry.
    pub fn new(input_per_1k: f64, completion_per_1k: f64) -> Self {
        Self {
            input_per_1k,
            completion_per_1k,
        }
    }

    /// Pricing for models that cost nothing, such as the offline templates.
    pub fn free() -> Self {
        Self::default()
    }

    /// Cost of a call in USD.
    ///
    /// ```
    /// use chronicler_core::TokenUsage;
    /// use chronicler_usage::ModelPricing;
    ///
    /// let pricing = ModelPricing::new(0.5, 1.5);
    /// let cost = pricing.cost(TokenUsage::new(2000, 1000));
    /// assert!((cost - 2.5).abs() < 1e-9);
    /// ```
    pub fn cost(&self, usage: TokenUsage) -> f64 {
        usage.input_tokens as f64 / 1000.0 * self.input_per_1k
            + usage.completion_tokens as f64 / 1000.0 * self.completion_per_1k
    }
}
