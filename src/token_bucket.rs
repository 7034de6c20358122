use std::time::Instant;

use parking_lot::Mutex;

use crate::{BurstSize, Clock, RateLimit, StdClock, TollgateError};

/// Configuration for a [`TokenBucket`].
///
/// Both fields are fixed for the lifetime of the bucket.
#[derive(Clone, Copy, Debug)]
pub struct TokenBucketOptions {
    /// Tokens replenished per second of elapsed time.
    pub rate: RateLimit,
    /// Initial token count and over-capacity threshold.
    pub burst: BurstSize,
}

struct BucketState {
    tokens: u64,
    last_check: Instant,
}

/// Thread-safe token-bucket rate limiter.
///
/// The bucket starts full (`tokens = burst`) and refills at `rate` tokens per
/// second, measured from the previous admission check. Each admitted event
/// consumes one token.
///
/// # Algorithm
///
/// Every call to [`allow`](Self::allow) runs the following under the bucket's lock:
///
/// 1. **Clock read:** `elapsed = now - last_check`, then `last_check = now`
/// 2. **Refill:** `tokens += floor(elapsed_secs × rate)`, with no clamping to `burst`
/// 3. **Over capacity:** if `tokens > burst`, admit and decrement
/// 4. **Normal:** else if `tokens > 0`, admit and decrement
/// 5. **Deny:** otherwise, leave `tokens` untouched
///
/// # Semantics & Limitations
///
/// **No clamping:**
/// - Idle time keeps accumulating tokens past `burst`
/// - A long idle period therefore allows a burst longer than `burst`
/// - The surplus drains one token per admitted call
///
/// **Fractional refill is discarded:**
/// - `last_check` advances on every call, including denials
/// - The fractional part of `elapsed × rate` is lost each time
/// - Callers polling faster than `1 / rate` seconds can starve the refill
///
/// # Thread Safety
///
/// - A single [`parking_lot::Mutex`] guards `(tokens, last_check)`
/// - The clock is read inside the critical section, so `last_check` never moves
///   backward even under contention
///
/// # Examples
///
/// ```
/// use tollgate::TokenBucket;
///
/// // 5 tokens per second, burst of 10
/// let bucket = TokenBucket::try_new(5.0, 10).unwrap();
///
/// for _ in 0..10 {
///     assert!(bucket.allow());
/// }
/// assert!(!bucket.allow());
/// ```
pub struct TokenBucket<C = StdClock> {
    rate: RateLimit,
    burst: BurstSize,
    clock: C,
    state: Mutex<BucketState>,
}

impl TokenBucket<StdClock> {
    /// Create a bucket driven by the process monotonic clock.
    pub fn new(options: TokenBucketOptions) -> Self {
        Self::with_clock(options, StdClock)
    }

    /// Validate `rate` and `burst`, then create a bucket.
    ///
    /// # Errors
    ///
    /// - [`TollgateError::InvalidRateLimit`] if `rate` is not positive and finite
    /// - [`TollgateError::InvalidBurstSize`] if `burst` is zero
    pub fn try_new(rate: f64, burst: u64) -> Result<Self, TollgateError> {
        Ok(Self::new(TokenBucketOptions {
            rate: RateLimit::try_from(rate)?,
            burst: BurstSize::try_from(burst)?,
        }))
    }
}

impl<C: Clock> TokenBucket<C> {
    /// Create a bucket that reads time from `clock`.
    ///
    /// ```
    /// use std::time::Duration;
    /// use tollgate::{BurstSize, ManualClock, RateLimit, TokenBucket, TokenBucketOptions};
    ///
    /// let clock = ManualClock::new();
    /// let bucket = TokenBucket::with_clock(
    ///     TokenBucketOptions {
    ///         rate: RateLimit::try_from(4.0).unwrap(),
    ///         burst: BurstSize::try_from(1).unwrap(),
    ///     },
    ///     clock.clone(),
    /// );
    ///
    /// assert!(bucket.allow());
    /// assert!(!bucket.allow());
    ///
    /// clock.advance(Duration::from_millis(250));
    /// assert!(bucket.allow());
    /// ```
    pub fn with_clock(options: TokenBucketOptions, clock: C) -> Self {
        let last_check = clock.now();

        tracing::debug!(
            rate = *options.rate,
            burst = *options.burst,
            "tollgate.bucket.created"
        );

        Self {
            rate: options.rate,
            burst: options.burst,
            clock,
            state: Mutex::new(BucketState {
                tokens: *options.burst,
                last_check,
            }),
        }
    } // end constructor

    /// Configured refill rate.
    pub fn rate(&self) -> RateLimit {
        self.rate
    }

    /// Configured burst size.
    pub fn burst(&self) -> BurstSize {
        self.burst
    }

    /// Decide whether one event is admitted, consuming a token if it is.
    ///
    /// Returns `true` when admitted. Never blocks beyond acquiring the bucket's
    /// lock and never fails.
    pub fn allow(&self) -> bool {
        let mut state = self.state.lock();

        let now = self.clock.now();
        let elapsed = now.saturating_duration_since(state.last_check);
        state.last_check = state.last_check.max(now);

        // `as` truncates toward zero and saturates on overflow.
        let refill = (elapsed.as_secs_f64() * *self.rate) as u64;
        state.tokens = state.tokens.saturating_add(refill);

        if state.tokens > *self.burst {
            state.tokens -= 1;
            tracing::trace!(refill, tokens = state.tokens, "tollgate.allow.over_capacity");
            return true;
        }

        if state.tokens > 0 {
            state.tokens -= 1;
            tracing::trace!(refill, tokens = state.tokens, "tollgate.allow.admitted");
            return true;
        }

        tracing::trace!(refill, "tollgate.allow.denied");
        false
    } // end method allow

    pub(crate) fn tokens(&self) -> u64 {
        self.state.lock().tokens
    }

    pub(crate) fn last_check(&self) -> Instant {
        self.state.lock().last_check
    }
} // end of impl
