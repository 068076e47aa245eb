use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

/// The label used for wallet balances and in operator messages.
pub const FCFA_CURRENCY_CODE: &str = "FCFA";
/// ISO 4217 code for the Central African CFA franc.
pub const FCFA_ISO_CODE: &str = "XAF";

//--------------------------------------        Fcfa         ---------------------------------------------------------
/// An amount of money in whole CFA francs.
///
/// The franc has no subunit in circulation, so all arithmetic is integral. Amounts are signed: wallet purchases are
/// recorded as negative movements.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Fcfa(i64);

op!(binary Fcfa, Add, add);
op!(binary Fcfa, Sub, sub);
op!(inplace Fcfa, AddAssign, add_assign);
op!(inplace Fcfa, SubAssign, sub_assign);
op!(unary Fcfa, Neg, neg);

impl Sum for Fcfa {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in FCFA: {0}")]
pub struct FcfaConversionError(String);

impl From<i64> for Fcfa {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl TryFrom<u64> for Fcfa {
    type Error = FcfaConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        i64::try_from(value).map(Self).map_err(|_| FcfaConversionError(format!("{value} is too large")))
    }
}

impl Display for Fcfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {FCFA_CURRENCY_CODE}", self.0)
    }
}

impl Fcfa {
    pub fn value(&self) -> i64 {
        self.0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// The absolute difference between two amounts, capped at the largest representable amount.
    pub fn distance(&self, other: Fcfa) -> Fcfa {
        Self(i64::try_from(self.0.abs_diff(other.0)).unwrap_or(i64::MAX))
    }

    pub fn abs(&self) -> Fcfa {
        Self(self.0.saturating_abs())
    }

    pub fn checked_add(self, rhs: Fcfa) -> Option<Fcfa> {
        self.0.checked_add(rhs.0).map(Self)
    }

    pub fn checked_sub(self, rhs: Fcfa) -> Option<Fcfa> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    pub fn checked_mul(self, rhs: i64) -> Option<Fcfa> {
        self.0.checked_mul(rhs).map(Self)
    }

    pub fn saturating_add(self, rhs: Fcfa) -> Fcfa {
        Self(self.0.saturating_add(rhs.0))
    }

    pub fn saturating_sub(self, rhs: Fcfa) -> Fcfa {
        Self(self.0.saturating_sub(rhs.0))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Fcfa::from(5_000);
        let b = Fcfa::from(150);
        assert_eq!(a + b, Fcfa::from(5_150));
        assert_eq!(a - b, Fcfa::from(4_850));
        assert_eq!(-b, Fcfa::from(-150));
        let mut c = a;
        c -= b;
        c += Fcfa::from(1);
        assert_eq!(c, Fcfa::from(4_851));
    }

    #[test]
    fn distance_is_symmetric() {
        let a = Fcfa::from(5_000);
        let b = Fcfa::from(5_100);
        assert_eq!(a.distance(b), Fcfa::from(100));
        assert_eq!(b.distance(a), Fcfa::from(100));
    }

    #[test]
    fn sum_and_display() {
        let total: Fcfa = [1_000, 2_500, -500].into_iter().map(Fcfa::from).sum();
        assert_eq!(total.value(), 3_000);
        assert_eq!(total.to_string(), "3000 FCFA");
    }

    #[test]
    fn serializes_as_a_plain_number() {
        let json = serde_json::to_string(&Fcfa::from(5150)).unwrap();
        assert_eq!(json, "5150");
        let back: Fcfa = serde_json::from_str("42").unwrap();
        assert_eq!(back, Fcfa::from(42));
    }

    #[test]
    fn checked_and_saturating_arithmetic() {
        let max = Fcfa::from(i64::MAX);
        assert_eq!(max.checked_add(Fcfa::from(1)), None);
        assert_eq!(Fcfa::from(i64::MIN).checked_sub(Fcfa::from(1)), None);
        assert_eq!(Fcfa::from(1 << 62).checked_mul(4), None);
        assert_eq!(Fcfa::from(250).checked_mul(4), Some(Fcfa::from(1_000)));
        assert_eq!(max.saturating_add(Fcfa::from(100)), max);
        assert_eq!(Fcfa::from(i64::MIN).saturating_sub(Fcfa::from(100)), Fcfa::from(i64::MIN));
        assert_eq!(max.distance(Fcfa::from(-5)), max);
        assert_eq!(Fcfa::from(i64::MIN).abs(), max);
    }

    #[test]
    fn u64_conversion() {
        assert!(Fcfa::try_from(u64::MAX).is_err());
        assert_eq!(Fcfa::try_from(10u64).unwrap(), Fcfa::from(10));
    }
}
