use std::{
    sync::{Arc, Barrier},
    thread,
    time::Duration,
};

use crate::{BurstSize, ManualClock, RateLimit, StdClock, TokenBucket, TokenBucketOptions};

fn options(rate: f64, burst: u64) -> TokenBucketOptions {
    TokenBucketOptions {
        rate: RateLimit::try_from(rate).unwrap(),
        burst: BurstSize::try_from(burst).unwrap(),
    }
}

fn race_once(bucket: &Arc<TokenBucket<ManualClock>>, callers: usize) -> usize {
    let barrier = Arc::new(Barrier::new(callers));

    let threads: Vec<_> = (0..callers)
        .map(|_| {
            let bucket = bucket.clone();
            let barrier = barrier.clone();

            thread::spawn(move || {
                barrier.wait();
                bucket.allow()
            })
        })
        .collect();

    threads
        .into_iter()
        .map(|t| t.join().expect("thread panicked"))
        .filter(|admitted| *admitted)
        .count()
}

#[test]
fn concurrent_callers_spend_exactly_the_available_tokens() {
    let callers = 16;
    let burst = 8;

    for k in 0..=burst {
        let clock = ManualClock::new();
        let bucket = Arc::new(TokenBucket::with_clock(options(5.0, burst), clock));

        for _ in 0..(burst - k) {
            assert!(bucket.allow());
        }
        assert_eq!(bucket.tokens(), k);

        let admitted = race_once(&bucket, callers);

        assert_eq!(admitted as u64, k, "k = {k}");
        assert_eq!(bucket.tokens(), 0);
    }
}

#[test]
fn concurrent_callers_on_empty_bucket_are_all_denied() {
    let clock = ManualClock::new();
    let bucket = Arc::new(TokenBucket::with_clock(options(5.0, 3), clock));
    while bucket.allow() {}

    assert_eq!(race_once(&bucket, 32), 0);
}

#[test]
fn concurrent_load_never_admits_more_than_refilled() {
    let clock = ManualClock::new();
    let bucket = Arc::new(TokenBucket::with_clock(options(100.0, 10), clock.clone()));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let bucket = bucket.clone();
            let clock = clock.clone();

            thread::spawn(move || {
                let mut admitted = 0u64;
                for _ in 0..250 {
                    clock.advance(Duration::from_millis(1));
                    if bucket.allow() {
                        admitted += 1;
                    }
                }
                admitted
            })
        })
        .collect();

    let admitted: u64 = threads
        .into_iter()
        .map(|t| t.join().expect("thread panicked"))
        .sum();

    // 2s of simulated time at 100/s on top of the initial burst is an upper bound;
    // discarded fractions can only lower it.
    let ceiling = 10 + (clock.elapsed().as_secs_f64() * 100.0) as u64;
    assert!(admitted <= ceiling, "admitted {admitted} > ceiling {ceiling}");
    assert!(admitted >= 10);
}

#[test]
fn last_check_never_moves_backward_under_contention() {
    let bucket = Arc::new(TokenBucket::with_clock(options(1000.0, 50), StdClock));

    let threads: Vec<_> = (0..8)
        .map(|_| {
            let bucket = bucket.clone();

            thread::spawn(move || {
                let mut previous = bucket.last_check();
                for _ in 0..500 {
                    bucket.allow();
                    let current = bucket.last_check();
                    assert!(current >= previous);
                    previous = current;
                }
            })
        })
        .collect();

    for t in threads {
        t.join().expect("thread panicked");
    }
}

#[test]
fn bucket_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}

    assert_send_sync::<TokenBucket>();
    assert_send_sync::<TokenBucket<ManualClock>>();
}
