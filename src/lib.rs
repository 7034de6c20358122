#![doc = include_str!("../README.md")]
#![deny(missing_docs)]
#![forbid(unsafe_code)]

mod token_bucket;
pub use token_bucket::*;

mod clock;
pub use clock::*;

mod error;
pub use error::*;

mod common;
pub use common::{BurstSize, RateLimit};

#[cfg(test)]
mod tests;
