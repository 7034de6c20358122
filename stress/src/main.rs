use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use clap::{Parser, ValueEnum};
use hdrhistogram::Histogram;
use tracing_subscriber::EnvFilter;

use tollgate::{BurstSize, RateLimit, TokenBucket, TokenBucketOptions, TollgateError};

mod governor_compare;

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Mode {
    Max,
    TargetQps,
}

#[derive(Clone, Copy, Debug, PartialEq, ValueEnum)]
enum Limiter {
    /// Use the tollgate token bucket.
    Tollgate,
    /// Use governor's direct (unkeyed) GCRA limiter.
    Governor,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tollgate-stress",
    about = "Load test / benchmark harness for tollgate"
)]
struct Args {
    #[arg(long, value_enum, default_value_t = Limiter::Tollgate)]
    limiter: Limiter,

    #[arg(long, value_enum, default_value_t = Mode::Max)]
    mode: Mode,

    #[arg(long, default_value_t = 8)]
    threads: usize,

    #[arg(long, default_value_t = 10)]
    duration_s: u64,

    /// Tokens per second.
    #[arg(long, default_value_t = 1000.0)]
    rate: f64,

    #[arg(long, default_value_t = 100)]
    burst: u64,

    #[arg(long, default_value_t = 100)]
    sample_every: u64,

    /// Per-thread request rate; only used with `--mode target-qps`.
    #[arg(long)]
    target_qps: Option<u64>,
}

#[derive(Default)]
struct Counts {
    allowed: AtomicU64,
    rejected: AtomicU64,
}

struct Sampler {
    hist: Histogram<u64>,
    every: u64,
    i: u64,
}

impl Sampler {
    fn new(every: u64) -> Self {
        Self {
            hist: new_histogram(),
            every,
            i: 0,
        }
    }

    /// Run `f`, recording its latency every `every` calls.
    fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        self.i = self.i.wrapping_add(1);
        if self.every > 1 && !self.i.is_multiple_of(self.every) {
            return f();
        }

        let t0 = Instant::now();
        let out = f();
        let us = t0.elapsed().as_micros() as u64;
        let _ = self.hist.record(us.max(1));
        out
    }
}

fn new_histogram() -> Histogram<u64> {
    // 1us..60s at 3 significant figures; the bounds are constant and valid.
    Histogram::<u64>::new_with_bounds(1, 60_000_000, 3).unwrap()
}

/// Sleep until the next slot when pacing to `--target-qps`.
struct Pacer {
    per_op: Option<Duration>,
    next_deadline: Instant,
}

impl Pacer {
    fn new(args: &Args) -> Self {
        let per_op = match (args.mode, args.target_qps) {
            (Mode::TargetQps, Some(qps)) => Some(Duration::from_nanos(
                1_000_000_000u64 / qps.max(1),
            )),
            _ => None,
        };

        Self {
            per_op,
            next_deadline: Instant::now(),
        }
    }

    fn wait(&mut self) {
        let Some(per_op) = self.per_op else {
            return;
        };

        let now = Instant::now();
        if now < self.next_deadline {
            std::thread::sleep(self.next_deadline - now);
        }
        self.next_deadline += per_op;
    }
}

fn build_options(args: &Args) -> Result<TokenBucketOptions, TollgateError> {
    Ok(TokenBucketOptions {
        rate: RateLimit::try_from(args.rate)?,
        burst: BurstSize::try_from(args.burst)?,
    })
}

fn print_results(args: &Args, elapsed: Duration, hist: &Histogram<u64>, counts: &Counts) {
    let allowed = counts.allowed.load(Ordering::Relaxed);
    let rejected = counts.rejected.load(Ordering::Relaxed);
    let ops = allowed + rejected;
    let secs = elapsed.as_secs_f64();

    println!("limiter={:?} mode={:?}", args.limiter, args.mode);
    println!(
        "threads={} duration_s={} rate={} burst={}",
        args.threads, args.duration_s, args.rate, args.burst
    );
    println!(
        "elapsed_s={:.3} ops={} ops_per_s={:.0}",
        secs,
        ops,
        ops as f64 / secs
    );
    println!(
        "allowed={} rejected={} allowed_per_s={:.1} ceiling={:.1}",
        allowed,
        rejected,
        allowed as f64 / secs,
        (args.burst as f64 + secs * args.rate) / secs
    );
    if !hist.is_empty() {
        println!(
            "lat_us p50={} p95={} p99={} p999={} max={}",
            hist.value_at_quantile(0.50),
            hist.value_at_quantile(0.95),
            hist.value_at_quantile(0.99),
            hist.value_at_quantile(0.999),
            hist.max()
        );
        println!("sample_every={} samples={}", args.sample_every, hist.len());
    } else {
        println!("no latency samples collected");
    }
}

/// Spawn `args.threads` workers that call `allow` until `args.duration_s` elapses.
pub(crate) fn drive<F>(args: &Args, allow: Arc<F>)
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    let stop = Arc::new(AtomicBool::new(false));
    let counts = Arc::new(Counts::default());

    let started = Instant::now();
    let deadline = started + Duration::from_secs(args.duration_s);

    let mut handles = Vec::with_capacity(args.threads);
    for _ in 0..args.threads {
        let allow = Arc::clone(&allow);
        let stop = Arc::clone(&stop);
        let counts = Arc::clone(&counts);
        let args = args.clone();

        handles.push(std::thread::spawn(move || {
            let mut sampler = Sampler::new(args.sample_every);
            let mut pacer = Pacer::new(&args);

            while !stop.load(Ordering::Relaxed) && Instant::now() < deadline {
                pacer.wait();

                if sampler.measure(|| (*allow)()) {
                    counts.allowed.fetch_add(1, Ordering::Relaxed);
                } else {
                    counts.rejected.fetch_add(1, Ordering::Relaxed);
                }
            }

            sampler.hist
        }));
    }

    std::thread::sleep(Duration::from_secs(args.duration_s));
    stop.store(true, Ordering::Relaxed);

    let mut merged = new_histogram();
    for h in handles {
        match h.join() {
            Ok(hist) => {
                let _ = merged.add(&hist);
            }
            Err(_) => eprintln!("worker thread panicked"),
        }
    }

    print_results(args, started.elapsed(), &merged, &counts);
}

fn run_tollgate(args: &Args, options: TokenBucketOptions) {
    let bucket = TokenBucket::new(options);
    drive(args, Arc::new(move || bucket.allow()));
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    if args.mode == Mode::TargetQps && args.target_qps.is_none() {
        eprintln!("note: --mode target-qps without --target-qps behaves like --mode max");
    }

    let options = match build_options(&args) {
        Ok(options) => options,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(2);
        }
    };

    match args.limiter {
        Limiter::Tollgate => run_tollgate(&args, options),
        Limiter::Governor => governor_compare::run(&args, options),
    }
}
