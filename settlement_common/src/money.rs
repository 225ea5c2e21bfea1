use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const UGX_CURRENCY_CODE: &str = "UGX";
pub const CREDITS_CODE: &str = "CR";

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a minor-unit amount: {0}")]
pub struct MoneyConversionError(String);

/// Generates the arithmetic and conversion boilerplate shared by the two settlement currencies.
/// Both are whole minor units stored as `i64`, so all arithmetic is exact.
macro_rules! minor_unit {
    ($name:ident, $code:expr) => {
        op!(binary $name, Add, add);
        op!(binary $name, Sub, sub);
        op!(inplace $name, AddAssign, add_assign);
        op!(inplace $name, SubAssign, sub_assign);
        op!(unary $name, Neg, neg);

        impl Mul<i64> for $name {
            type Output = Self;

            fn mul(self, rhs: i64) -> Self::Output {
                Self::from(self.value() * rhs)
            }
        }

        impl Sum for $name {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self::default(), Add::add)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl TryFrom<u64> for $name {
            type Error = MoneyConversionError;

            fn try_from(value: u64) -> Result<Self, Self::Error> {
                i64::try_from(value).map(Self).map_err(|_| {
                    MoneyConversionError(format!("{value} is too large to convert to {}", stringify!($name)))
                })
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{} {}", self.0, $code)
            }
        }

        impl $name {
            pub const fn zero() -> Self {
                Self(0)
            }

            pub fn value(&self) -> i64 {
                self.0
            }

            pub fn is_zero(&self) -> bool {
                self.0 == 0
            }

            pub fn is_positive(&self) -> bool {
                self.0 > 0
            }

            pub fn is_negative(&self) -> bool {
                self.0 < 0
            }

            /// Clamps negative amounts to zero.
            pub fn non_negative(self) -> Self {
                Self(self.0.max(0))
            }

            pub fn saturating_add(self, rhs: Self) -> Self {
                Self(self.0.saturating_add(rhs.0))
            }

            pub fn saturating_sub(self, rhs: Self) -> Self {
                Self(self.0.saturating_sub(rhs.0))
            }

            pub fn saturating_mul(self, rhs: i64) -> Self {
                Self(self.0.saturating_mul(rhs))
            }

            pub fn checked_mul(self, rhs: i64) -> Option<Self> {
                self.0.checked_mul(rhs).map(Self)
            }
        }
    };
}

//--------------------------------------        Ugx          ---------------------------------------------------------
/// An amount of Ugandan shillings. The shilling has no minor unit in circulation, so one unit is one shilling.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Ugx(i64);

minor_unit!(Ugx, UGX_CURRENCY_CODE);

//--------------------------------------      Credits        ---------------------------------------------------------
/// An amount of platform credits.
#[derive(Debug, Clone, Copy, Default, Type, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct Credits(i64);

minor_unit!(Credits, CREDITS_CODE);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic_is_exact() {
        let subtotal = Ugx::from(10_000) * 2;
        let total = subtotal + Ugx::from(5_000) - Ugx::from(0);
        assert_eq!(total, Ugx::from(25_000));
        let sum: Credits = [Credits::from(3), Credits::from(4), Credits::from(5)].into_iter().sum();
        assert_eq!(sum.value(), 12);
    }

    #[test]
    fn clamping_and_saturation() {
        assert_eq!(Ugx::from(-5).non_negative(), Ugx::zero());
        assert_eq!(Ugx::from(i64::MAX).saturating_add(Ugx::from(1)), Ugx::from(i64::MAX));
        assert!(Credits::from(i64::MAX).checked_mul(2).is_none());
        assert!(Credits::try_from(u64::MAX).is_err());
        assert_eq!(Credits::try_from(42u64).unwrap(), Credits::from(42));
    }

    #[test]
    fn display_and_serde() {
        assert_eq!(Ugx::from(25_000).to_string(), "25000 UGX");
        assert_eq!(Credits::from(100).to_string(), "100 CR");
        let json = serde_json::to_string(&Credits::from(150)).unwrap();
        assert_eq!(json, "150");
        let back: Ugx = serde_json::from_str("19900").unwrap();
        assert_eq!(back, Ugx::from(19_900));
    }
}
