use crate::{BurstSize, RateLimit, TokenBucket, TollgateError};

#[test]
fn rate_limit_try_from_validates_positive() {
    let rl = RateLimit::try_from(1f64).unwrap();
    assert_eq!(*rl, 1f64);

    let rl = RateLimit::try_from(0.5f64).unwrap();
    assert_eq!(*rl, 0.5f64);

    assert_eq!(
        RateLimit::try_from(0f64).unwrap_err(),
        TollgateError::InvalidRateLimit("Rate limit must be greater than 0".to_string())
    );
    assert_eq!(
        RateLimit::try_from(-1f64).unwrap_err(),
        TollgateError::InvalidRateLimit("Rate limit must be greater than 0".to_string())
    );

    assert!(*RateLimit::max() > 0f64);
}

#[test]
fn rate_limit_try_from_rejects_non_finite() {
    for value in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
        assert_eq!(
            RateLimit::try_from(value).unwrap_err(),
            TollgateError::InvalidRateLimit("Rate limit must be finite".to_string())
        );
    }
}

#[test]
fn burst_size_try_from_validates_min_1() {
    let b = BurstSize::try_from(1u64).unwrap();
    assert_eq!(*b, 1u64);

    assert_eq!(*BurstSize::default(), 1u64);

    assert_eq!(
        BurstSize::try_from(0u64).unwrap_err(),
        TollgateError::InvalidBurstSize("Burst size must be at least 1".to_string())
    );
}

#[test]
fn try_new_reports_the_first_invalid_field() {
    assert!(matches!(
        TokenBucket::try_new(0.0, 0),
        Err(TollgateError::InvalidRateLimit(_))
    ));
    assert!(matches!(
        TokenBucket::try_new(1.0, 0),
        Err(TollgateError::InvalidBurstSize(_))
    ));

    let bucket = TokenBucket::try_new(5.0, 10).unwrap();
    assert_eq!(*bucket.rate(), 5.0);
    assert_eq!(*bucket.burst(), 10);
}

#[test]
fn error_display_includes_reason() {
    let err = BurstSize::try_from(0u64).unwrap_err();
    assert_eq!(
        err.to_string(),
        "invalid burst size: Burst size must be at least 1"
    );
}
