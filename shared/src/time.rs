use std::fmt::Debug;

use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

/// Errors produced by logical time arithmetic.
///
/// These abort only the operation that triggered them; callers validate
/// arithmetic before committing any state change.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum TimeArithmeticError {
    /// Adding an interval to a time overflowed the time representation
    #[error("logical time addition overflowed: {time} + {interval}")]
    AdditionOverflow { time: String, interval: String },

    /// Subtracting an interval from a time overflowed the time representation
    #[error("logical time subtraction overflowed: {time} - {interval}")]
    SubtractionOverflow { time: String, interval: String },

    /// The arithmetic result fell outside the [initial, final] time range
    #[error("logical time arithmetic result {result} is outside the valid time range")]
    OutOfRange { result: String },
}

/// An interval between two logical times.
pub trait LogicalTimeInterval: Clone + PartialEq + Debug + Send + Sync + 'static {
    fn is_zero(&self) -> bool;

    fn is_positive(&self) -> bool;
}

/// An opaque, totally ordered logical time.
///
/// The coordination server never inspects time values beyond comparison and
/// interval addition, so federations are free to plug in their own
/// representation. [`Integer64Time`] is the stock implementation.
pub trait LogicalTime: Ord + Clone + Debug + Send + Sync + 'static {
    type Interval: LogicalTimeInterval;

    /// The smallest representable time; every federate starts here.
    fn initial() -> Self;

    /// The largest representable time, used as the identity for min-folds.
    fn latest() -> Self;

    /// The smallest representable nonzero interval.
    fn epsilon() -> Self::Interval;

    fn add(&self, interval: &Self::Interval) -> Result<Self, TimeArithmeticError>;

    fn subtract(&self, interval: &Self::Interval) -> Result<Self, TimeArithmeticError>;
}

// Integer64Time

/// Logical time backed by a signed 64-bit tick count.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Integer64Time(i64);

impl Integer64Time {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// Interval companion to [`Integer64Time`].
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Integer64Interval(i64);

impl Integer64Interval {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl LogicalTimeInterval for Integer64Interval {
    fn is_zero(&self) -> bool {
        self.0 == 0
    }

    fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl LogicalTime for Integer64Time {
    type Interval = Integer64Interval;

    fn initial() -> Self {
        Self(0)
    }

    fn latest() -> Self {
        Self(i64::MAX)
    }

    fn epsilon() -> Self::Interval {
        Integer64Interval(1)
    }

    fn add(&self, interval: &Self::Interval) -> Result<Self, TimeArithmeticError> {
        let result = self.0.checked_add(interval.0).ok_or_else(|| {
            TimeArithmeticError::AdditionOverflow {
                time: self.0.to_string(),
                interval: interval.0.to_string(),
            }
        })?;
        Ok(Self(result))
    }

    fn subtract(&self, interval: &Self::Interval) -> Result<Self, TimeArithmeticError> {
        let result = self.0.checked_sub(interval.0).ok_or_else(|| {
            TimeArithmeticError::SubtractionOverflow {
                time: self.0.to_string(),
                interval: interval.0.to_string(),
            }
        })?;
        if result < Self::initial().0 {
            return Err(TimeArithmeticError::OutOfRange {
                result: result.to_string(),
            });
        }
        Ok(Self(result))
    }
}
