use serde::{Deserialize, Serialize};
use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

/// Hundredths of a percent that make up a whole (100.00%).
const FULL_HUNDREDTHS: i64 = 10_000;

/// Signed currency amount stored as **integer cents**.
///
/// Every monetary value inside the ledger (totals, split costs, balances) uses
/// this type. Floats only appear at the HTTP boundary, where
/// [`Cents::from_decimal`] rejects anything finer than the minor unit.
///
/// ```rust
/// use tripledger::core::money::Cents;
///
/// let amount = Cents::new(12_34);
/// assert_eq!(amount.to_string(), "12.34");
/// assert_eq!(Cents::from_decimal(66.67), Some(Cents::new(6667)));
/// assert_eq!(Cents::from_decimal(1.005), None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cents(i64);

impl Cents {
    pub const ZERO: Cents = Cents(0);

    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub const fn abs(self) -> Cents {
        Cents(self.0.abs())
    }

    /// Checked addition (returns `None` on overflow).
    #[must_use]
    pub fn checked_add(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_add(rhs.0).map(Cents)
    }

    /// Checked subtraction (returns `None` on overflow).
    #[must_use]
    pub fn checked_sub(self, rhs: Cents) -> Option<Cents> {
        self.0.checked_sub(rhs.0).map(Cents)
    }

    /// Parses a decimal amount with at most two fractional digits.
    ///
    /// Returns `None` for non-finite input, sub-cent precision or values that
    /// do not fit in an `i64` of cents.
    #[must_use]
    pub fn from_decimal(value: f64) -> Option<Cents> {
        scale_decimal(value).map(Cents)
    }

    #[must_use]
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `self x percentage / 100`, rounded half-to-even to the cent.
    #[must_use]
    pub fn share(self, percentage: Percentage) -> Option<Cents> {
        let numerator = i128::from(self.0) * i128::from(percentage.0);
        let rounded = div_round_half_even(numerator, i128::from(FULL_HUNDREDTHS));
        i64::try_from(rounded).ok().map(Cents)
    }

    /// Splits `self` into `parts` truncated shares; the last share absorbs the
    /// remainder so the shares always add back up to `self`.
    #[must_use]
    pub fn split_evenly(self, parts: usize) -> Vec<Cents> {
        split_evenly(self.0, parts).into_iter().map(Cents).collect()
    }
}

impl fmt::Display for Cents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}", abs / 100, abs % 100)
    }
}

impl Add for Cents {
    type Output = Cents;

    fn add(self, rhs: Cents) -> Self::Output {
        Cents(self.0 + rhs.0)
    }
}

impl AddAssign for Cents {
    fn add_assign(&mut self, rhs: Cents) {
        self.0 += rhs.0;
    }
}

impl Sub for Cents {
    type Output = Cents;

    fn sub(self, rhs: Cents) -> Self::Output {
        Cents(self.0 - rhs.0)
    }
}

impl SubAssign for Cents {
    fn sub_assign(&mut self, rhs: Cents) {
        self.0 -= rhs.0;
    }
}

impl Neg for Cents {
    type Output = Cents;

    fn neg(self) -> Self::Output {
        Cents(-self.0)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Cents>>(iter: I) -> Self {
        iter.fold(Cents::ZERO, |acc, c| acc + c)
    }
}

/// Share of a whole expressed in **hundredths of a percent** (`10_000` is
/// 100.00%).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(i64);

impl Percentage {
    pub const ZERO: Percentage = Percentage(0);
    pub const FULL: Percentage = Percentage(FULL_HUNDREDTHS);

    #[must_use]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Self(hundredths)
    }

    #[must_use]
    pub const fn hundredths(self) -> i64 {
        self.0
    }

    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[must_use]
    pub fn checked_add(self, rhs: Percentage) -> Option<Percentage> {
        self.0.checked_add(rhs.0).map(Percentage)
    }

    /// Parses a percentage such as `33.33`; same precision rules as
    /// [`Cents::from_decimal`].
    #[must_use]
    pub fn from_decimal(value: f64) -> Option<Percentage> {
        scale_decimal(value).map(Percentage)
    }

    #[must_use]
    pub fn to_decimal(self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// `part / whole x 100`, rounded half-to-even to two decimals.
    /// `None` when `whole` is not positive.
    #[must_use]
    pub fn of_ratio(part: Cents, whole: Cents) -> Option<Percentage> {
        if whole.0 <= 0 {
            return None;
        }
        let numerator = i128::from(part.0) * i128::from(FULL_HUNDREDTHS);
        let rounded = div_round_half_even(numerator, i128::from(whole.0));
        i64::try_from(rounded).ok().map(Percentage)
    }

    /// Equal shares of 100.00% for `parts` members, last one absorbing the
    /// remainder.
    #[must_use]
    pub fn split_evenly(parts: usize) -> Vec<Percentage> {
        split_evenly(FULL_HUNDREDTHS, parts)
            .into_iter()
            .map(Percentage)
            .collect()
    }
}

impl fmt::Display for Percentage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{sign}{}.{:02}%", abs / 100, abs % 100)
    }
}

impl Add for Percentage {
    type Output = Percentage;

    fn add(self, rhs: Percentage) -> Self::Output {
        Percentage(self.0 + rhs.0)
    }
}

impl Sub for Percentage {
    type Output = Percentage;

    fn sub(self, rhs: Percentage) -> Self::Output {
        Percentage(self.0 - rhs.0)
    }
}

impl Sum for Percentage {
    fn sum<I: Iterator<Item = Percentage>>(iter: I) -> Self {
        iter.fold(Percentage::ZERO, |acc, p| acc + p)
    }
}

fn scale_decimal(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = value * 100.0;
    let rounded = scaled.round();
    if (scaled - rounded).abs() > 1e-6 {
        return None;
    }
    // i64::MAX as f64 rounds up, so compare against a safely representable bound.
    if rounded.abs() >= 9.0e18 {
        return None;
    }
    Some(rounded as i64)
}

fn split_evenly(total: i64, parts: usize) -> Vec<i64> {
    if parts == 0 {
        return Vec::new();
    }
    let count = parts as i64;
    let base = total / count;
    let mut shares = vec![base; parts];
    if let Some(last) = shares.last_mut() {
        *last = total - base * (count - 1);
    }
    shares
}

/// Integer division rounding to nearest, ties to even. `denominator` must be
/// positive.
pub(crate) fn div_round_half_even(numerator: i128, denominator: i128) -> i128 {
    let quotient = numerator.div_euclid(denominator);
    let remainder = numerator.rem_euclid(denominator);
    let twice = remainder * 2;
    if twice > denominator || (twice == denominator && quotient % 2 != 0) {
        quotient + 1
    } else {
        quotient
    }
}
