use std::iter::Sum;
use std::ops::{Add, AddAssign};

/// Service reported cost of an operation, expressed in request units (RU).
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd)]
pub struct RequestCharge(f64);

impl RequestCharge {
    pub fn new(value: f64) -> Self {
        Self(value.max(0.0))
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Parses the value of a request charge header. Missing or malformed
    /// values count as a zero charge.
    pub fn from_header(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.trim().parse::<f64>().ok())
            .map(Self::new)
            .unwrap_or_default()
    }
}

impl Add for RequestCharge {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for RequestCharge {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sum for RequestCharge {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, c| acc + c)
    }
}

impl std::fmt::Display for RequestCharge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
