//! Salary type for cap and contract calculations

use serde::{Deserialize, Serialize};
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// Salary represents a contract value or cap amount in whole league dollars
///
/// Negative values only appear as intermediate results (e.g. a team that is
/// over the cap has a negative `available_cap`).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Salary {
    pub dollars: i64,
}

impl Salary {
    pub const ZERO: Salary = Salary { dollars: 0 };

    /// Create a salary from whole dollars
    pub const fn from_dollars(dollars: i64) -> Self {
        Self { dollars }
    }

    /// Get the value in whole dollars
    pub fn to_dollars(self) -> i64 {
        self.dollars
    }

    /// Check if salary is zero
    pub fn is_zero(self) -> bool {
        self.dollars == 0
    }

    /// Check if salary is negative
    pub fn is_negative(self) -> bool {
        self.dollars < 0
    }

    /// Safe subtraction that returns zero if result would be negative
    pub fn safe_sub(self, other: Self) -> Self {
        Self { dollars: (self.dollars - other.dollars).max(0) }
    }
}

impl Add for Salary {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self { dollars: self.dollars + other.dollars }
    }
}

impl AddAssign for Salary {
    fn add_assign(&mut self, other: Self) {
        self.dollars += other.dollars;
    }
}

impl Sub for Salary {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self { dollars: self.dollars - other.dollars }
    }
}

impl Neg for Salary {
    type Output = Self;

    fn neg(self) -> Self {
        Self { dollars: -self.dollars }
    }
}

impl Sum for Salary {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Salary::ZERO, |acc, s| acc + s)
    }
}

impl<'a> Sum<&'a Salary> for Salary {
    fn sum<I: Iterator<Item = &'a Salary>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl std::fmt::Display for Salary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.dollars < 0 {
            write!(f, "-${}", -self.dollars)
        } else {
            write!(f, "${}", self.dollars)
        }
    }
}
