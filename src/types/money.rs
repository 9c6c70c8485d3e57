use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use num_traits::Zero;
use crate::error::{Error, Result};

/// Fixed-point money in minor units (two decimal places).
///
/// All ledger arithmetic runs on the integer representation, so applying and
/// reversing an entry never loses precision. The operators saturate at the
/// `i64` bounds instead of panicking; use the `checked_*` forms where an
/// out-of-range result must be reported.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const DECIMALS: u32 = 2;
    const MULTIPLIER: i64 = 100;  // 10^2

    pub fn from_minor(value: i64) -> Self {
        Amount(value)
    }

    pub fn to_minor(&self) -> i64 {
        self.0
    }

    /// Whole units. Saturates when `value` does not fit in minor units.
    pub fn from_major(value: i64) -> Self {
        Amount(value.saturating_mul(Self::MULTIPLIER))
    }

    pub fn checked_from_major(value: i64) -> Result<Self> {
        value
            .checked_mul(Self::MULTIPLIER)
            .map(Amount)
            .ok_or_else(|| Error::validation(format!("amount out of range: {}", value)))
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Lossy conversion for amounts stored as floats by older file formats.
    /// Rounds to the nearest minor unit once, at decode time.
    pub fn from_f64_lossy(value: f64) -> Self {
        Amount((value * Self::MULTIPLIER as f64).round() as i64)
    }

    /// For display purposes only
    pub fn to_f64(&self) -> f64 {
        self.0 as f64 / Self::MULTIPLIER as f64
    }

    pub fn zero() -> Self {
        Amount(0)
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn abs(&self) -> Self {
        Amount(self.0.saturating_abs())
    }

    /// Parses an exact decimal string such as `"32550"`, `"-12.5"` or `"0.07"`.
    /// More than two fractional digits are rejected rather than rounded.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
        };

        let (whole, fraction) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty())
            || !all_digits(whole)
            || !all_digits(fraction)
        {
            return Err(Error::validation(format!("invalid amount: {:?}", input)));
        }
        if fraction.len() > Self::DECIMALS as usize {
            return Err(Error::validation(format!(
                "amount {:?} has more than {} decimal places",
                input,
                Self::DECIMALS
            )));
        }

        let overflow = || Error::validation(format!("amount out of range: {:?}", input));
        let whole_value: i64 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| overflow())?
        };
        let mut fraction_value: i64 = if fraction.is_empty() {
            0
        } else {
            fraction.parse().map_err(|_| overflow())?
        };
        for _ in fraction.len()..Self::DECIMALS as usize {
            fraction_value *= 10;
        }

        let minor = whole_value
            .checked_mul(Self::MULTIPLIER)
            .and_then(|v| v.checked_add(fraction_value))
            .ok_or_else(overflow)?;

        Ok(Amount(if negative { -minor } else { minor }))
    }
}

impl FromStr for Amount {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Amount::parse(s)
    }
}

impl Add for Amount {
    type Output = Amount;
    fn add(self, other: Amount) -> Amount {
        Amount(self.0.saturating_add(other.0))
    }
}

impl Sub for Amount {
    type Output = Amount;
    fn sub(self, other: Amount) -> Amount {
        Amount(self.0.saturating_sub(other.0))
    }
}

impl AddAssign for Amount {
    fn add_assign(&mut self, other: Amount) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl SubAssign for Amount {
    fn sub_assign(&mut self, other: Amount) {
        self.0 = self.0.saturating_sub(other.0);
    }
}

impl Neg for Amount {
    type Output = Amount;
    fn neg(self) -> Amount {
        Amount(self.0.saturating_neg())
    }
}

impl Zero for Amount {
    fn zero() -> Self {
        Amount(0)
    }

    fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Sum for Amount {
    fn sum<I: Iterator<Item = Amount>>(iter: I) -> Self {
        iter.fold(Amount(0), |acc, x| acc + x)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let multiplier = Self::MULTIPLIER as u64;
        write!(f, "{}{}.{:02}", sign, abs / multiplier, abs % multiplier)
    }
}

/// ISO-4217 style currency code, stored upper-case.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        let valid_len = (3..=8).contains(&code.len());
        if !valid_len || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::validation(format!("invalid currency code: {:?}", code)));
        }
        Ok(Currency(code.to_ascii_uppercase()))
    }

    pub fn code(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
