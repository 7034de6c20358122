use std::{num::NonZeroU32, sync::Arc};

use governor::{Quota, RateLimiter};

use tollgate::TokenBucketOptions;

use crate::{Args, drive};

/// Same workload against governor's GCRA limiter.
///
/// Governor only accepts whole-number rates, so the configured rate is rounded up
/// to at least 1/s.
pub(crate) fn run(args: &Args, options: TokenBucketOptions) {
    let per_second = (*options.rate).ceil().min(u32::MAX as f64) as u32;
    let burst = (*options.burst).min(u32::MAX as u64) as u32;

    let (Some(per_second), Some(burst)) = (NonZeroU32::new(per_second), NonZeroU32::new(burst))
    else {
        eprintln!("error: governor needs a rate and burst of at least 1");
        std::process::exit(2);
    };

    let limiter = RateLimiter::direct(Quota::per_second(per_second).allow_burst(burst));
    drive(args, Arc::new(move || limiter.check().is_ok()));
}
