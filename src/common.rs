use std::ops::Deref;

use crate::TollgateError;

/// Sustained refill rate, in tokens per second.
///
/// Must be strictly positive and finite. Fractional rates are allowed: a rate of
/// `0.5` adds one token every two seconds of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct RateLimit(f64);

impl RateLimit {
    /// A rate large enough that any non-zero elapsed time refills past the burst.
    ///
    /// Mostly useful for benchmarks that want to exercise the admit path only.
    pub fn max() -> Self {
        Self(f64::MAX / 1e3)
    }
}

impl Deref for RateLimit {
    type Target = f64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<f64> for RateLimit {
    type Error = TollgateError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        if !value.is_finite() {
            Err(TollgateError::InvalidRateLimit(
                "Rate limit must be finite".to_string(),
            ))
        } else if value <= 0f64 {
            Err(TollgateError::InvalidRateLimit(
                "Rate limit must be greater than 0".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}

/// Token capacity of a bucket.
///
/// Also the threshold above which an admission is granted without consulting the
/// normal branch; see [`TokenBucket::allow`](crate::TokenBucket::allow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BurstSize(u64);

impl Default for BurstSize {
    /// A burst of one token: no bursting beyond the sustained rate.
    fn default() -> Self {
        Self(1)
    }
}

impl Deref for BurstSize {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TryFrom<u64> for BurstSize {
    type Error = TollgateError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value == 0 {
            Err(TollgateError::InvalidBurstSize(
                "Burst size must be at least 1".to_string(),
            ))
        } else {
            Ok(Self(value))
        }
    }
}
