use serde::{Deserialize, Serialize};
use std::fmt;
use crate::types::money::Amount;
use crate::RATE_MULTIPLIER;

const RATE_DECIMALS: u32 = 8;

/// Exchange rate as fixed-point (rate * 10^8): units of the debit currency paid
/// per one unit of the credit currency.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExchangeRate {
    value: i64,
}

impl ExchangeRate {
    /// Rate implied by the two legs of an exchange, e.g. 32550 TWD for 1000 USD
    /// gives 32.55. `None` when the credited amount is zero.
    pub fn implied(debit: Amount, credit: Amount) -> Option<Self> {
        if credit.to_minor() == 0 {
            return None;
        }
        // Use i128 to prevent overflow during scaling
        let scaled = debit.to_minor() as i128 * RATE_MULTIPLIER as i128 / credit.to_minor() as i128;
        i64::try_from(scaled).ok().map(|value| ExchangeRate { value })
    }

    /// Create from floating-point value (for older file formats only)
    pub fn from_f64(value: f64) -> Self {
        ExchangeRate {
            value: (value * RATE_MULTIPLIER as f64).round() as i64,
        }
    }

    pub fn from_raw(value: i64) -> Self {
        ExchangeRate { value }
    }

    pub fn raw_value(&self) -> i64 {
        self.value
    }

    /// Convert to f64 for display purposes only
    pub fn to_f64(&self) -> f64 {
        self.value as f64 / RATE_MULTIPLIER as f64
    }
}

impl fmt::Display for ExchangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let multiplier = RATE_MULTIPLIER.unsigned_abs();
        let abs = self.value.unsigned_abs();
        let sign = if self.value < 0 { "-" } else { "" };
        let fraction = format!("{:0width$}", abs % multiplier, width = RATE_DECIMALS as usize);
        let fraction = fraction.trim_end_matches('0');
        if fraction.is_empty() {
            write!(f, "{}{}", sign, abs / multiplier)
        } else {
            write!(f, "{}{}.{}", sign, abs / multiplier, fraction)
        }
    }
}
