use std::{env, fmt::Display, str::FromStr};

use log::*;
use serde::{Deserialize, Serialize};
use settlement_common::{Credits, Ugx};
use thiserror::Error;

pub const DEFAULT_SHIPPING_UGX: i64 = 5_000;
pub const DEFAULT_SHIPPING_CREDITS: i64 = 0;
pub const DEFAULT_MAX_CREDIT_PERCENTAGE: i64 = 50;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid conversion rate: {0}")]
pub struct ConversionRateError(String);

/// The UGX value of one credit, as a positive rational number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionRate {
    numerator: i64,
    denominator: i64,
}

impl Default for ConversionRate {
    fn default() -> Self {
        Self { numerator: 1, denominator: 1 }
    }
}

impl ConversionRate {
    pub fn new(numerator: i64, denominator: i64) -> Result<Self, ConversionRateError> {
        if numerator <= 0 || denominator <= 0 {
            return Err(ConversionRateError(format!("{numerator}/{denominator} is not a positive rate")));
        }
        Ok(Self { numerator, denominator })
    }

    pub fn numerator(&self) -> i64 {
        self.numerator
    }

    pub fn denominator(&self) -> i64 {
        self.denominator
    }

    /// Converts credits to UGX, rounding down. Negative amounts convert to zero and the result saturates.
    pub fn to_ugx(&self, credits: Credits) -> Ugx {
        let credits = i128::from(credits.value().max(0));
        let ugx = credits * i128::from(self.numerator) / i128::from(self.denominator);
        Ugx::from(i64::try_from(ugx).unwrap_or(i64::MAX))
    }
}

impl Display for ConversionRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.denominator == 1 {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl FromStr for ConversionRate {
    type Err = ConversionRateError;

    /// Accepts `"n"` or `"n/d"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |v: &str| v.trim().parse::<i64>().map_err(|e| ConversionRateError(format!("{s}: {e}")));
        match s.split_once('/') {
            Some((n, d)) => Self::new(parse(n)?, parse(d)?),
            None => Self::new(parse(s)?, 1),
        }
    }
}

/// The platform pricing constants. Built once at startup and handed to the order and payment APIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingPolicy {
    /// Shipping charged when an order does not specify its own
    pub default_shipping_ugx: Ugx,
    pub default_shipping_credits: Credits,
    /// The largest share (in percent of the UGX total) that may be covered by credits
    pub max_credit_percentage: i64,
    pub conversion_rate: ConversionRate,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            default_shipping_ugx: Ugx::from(DEFAULT_SHIPPING_UGX),
            default_shipping_credits: Credits::from(DEFAULT_SHIPPING_CREDITS),
            max_credit_percentage: DEFAULT_MAX_CREDIT_PERCENTAGE,
            conversion_rate: ConversionRate::default(),
        }
    }
}

impl PricingPolicy {
    pub fn with_max_credit_percentage(mut self, pct: i64) -> Self {
        self.max_credit_percentage = pct.clamp(0, 100);
        self
    }

    pub fn with_conversion_rate(mut self, rate: ConversionRate) -> Self {
        self.conversion_rate = rate;
        self
    }

    pub fn with_default_shipping(mut self, ugx: Ugx, credits: Credits) -> Self {
        self.default_shipping_ugx = ugx;
        self.default_shipping_credits = credits;
        self
    }

    /// Tax hook. No tax rules are applied on the platform, so this is always zero.
    pub fn tax_ugx(&self, _subtotal: Ugx) -> Ugx {
        Ugx::zero()
    }

    /// Tax hook for the credits breakdown. Always zero.
    pub fn tax_credits(&self, _subtotal: Credits) -> Credits {
        Credits::zero()
    }

    /// Reads `SE_DEFAULT_SHIPPING_UGX`, `SE_DEFAULT_SHIPPING_CREDITS`, `SE_MAX_CREDIT_PERCENTAGE` and
    /// `SE_CREDIT_CONVERSION_RATE`. Missing or invalid values fall back to the defaults.
    pub fn from_env_or_default() -> Self {
        let defaults = Self::default();
        let default_shipping_ugx = env_amount("SE_DEFAULT_SHIPPING_UGX", DEFAULT_SHIPPING_UGX, 0..=i64::MAX);
        let default_shipping_credits =
            env_amount("SE_DEFAULT_SHIPPING_CREDITS", DEFAULT_SHIPPING_CREDITS, 0..=i64::MAX);
        let max_credit_percentage = env_amount("SE_MAX_CREDIT_PERCENTAGE", DEFAULT_MAX_CREDIT_PERCENTAGE, 0..=100);
        let conversion_rate = env::var("SE_CREDIT_CONVERSION_RATE")
            .ok()
            .map(|s| {
                s.parse::<ConversionRate>().unwrap_or_else(|e| {
                    warn!("🪛️ {e}. SE_CREDIT_CONVERSION_RATE must be 'n' or 'n/d'. Using the default of 1 instead.");
                    defaults.conversion_rate
                })
            })
            .unwrap_or(defaults.conversion_rate);
        let policy = Self {
            default_shipping_ugx: Ugx::from(default_shipping_ugx),
            default_shipping_credits: Credits::from(default_shipping_credits),
            max_credit_percentage,
            conversion_rate,
        };
        info!(
            "🪛️ Pricing policy: shipping {} / {}, credit cap {}%, 1 CR = {} UGX",
            policy.default_shipping_ugx,
            policy.default_shipping_credits,
            policy.max_credit_percentage,
            policy.conversion_rate
        );
        policy
    }
}

fn env_amount(name: &str, default: i64, range: std::ops::RangeInclusive<i64>) -> i64 {
    env::var(name)
        .ok()
        .map(|s| match s.trim().parse::<i64>() {
            Ok(v) if range.contains(&v) => v,
            Ok(v) => {
                warn!("🪛️ {v} is out of range for {name}. Using the default, {default}, instead.");
                default
            },
            Err(e) => {
                warn!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
                default
            },
        })
        .unwrap_or(default)
}
