//! # Decimal peso amounts
//!
//! Fiscal documents are byte-sensitive: every amount must render as a fixed
//! two-decimal string, and two renders of the same payload must be
//! byte-identical. [`Money`] wraps [`rust_decimal::Decimal`] and owns that
//! rendering, so no caller ever formats an amount with `{:.2}` on a float.

use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// A peso amount with exact decimal semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// The zero amount.
    pub const ZERO: Money = Money(Decimal::ZERO);

    /// Wrap a decimal amount.
    pub fn new(value: Decimal) -> Self {
        Self(value)
    }

    /// Parse from a decimal string (e.g. `"9831.42"`).
    pub fn parse(s: &str) -> Result<Self, rust_decimal::Error> {
        s.parse::<Decimal>().map(Self)
    }

    /// The underlying decimal value.
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Absolute value.
    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Whether this amount is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Round to two decimal places, away from zero on midpoints, which is
    /// what SAT amount fields expect.
    pub fn rounded(&self) -> Self {
        Self(
            self.0
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        )
    }

    /// Fixed two-decimal string form used in document attributes
    /// (`67200` renders as `"67200.00"`).
    pub fn to_cfdi_string(&self) -> String {
        let rounded = self.rounded().0;
        format!("{:.2}", rounded)
    }

    /// Divide by an integer divisor (used for the daily-wage split).
    pub fn div_int(&self, divisor: i64) -> Self {
        Self(self.0 / Decimal::from(divisor))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Money {
        Money(self.0 - rhs.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_cfdi_string())
    }
}
