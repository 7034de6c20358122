/// Error type for this crate.
///
/// Every variant is a configuration error raised while building a
/// [`TokenBucket`](crate::TokenBucket); admission checks themselves never fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TollgateError {
    /// The refill rate is not a positive, finite number.
    #[error("invalid rate limit: {0}")]
    InvalidRateLimit(String),
    /// The burst size is zero.
    #[error("invalid burst size: {0}")]
    InvalidBurstSize(String),
}
