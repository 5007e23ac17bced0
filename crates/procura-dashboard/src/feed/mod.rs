//! Synthetic market feed: a bounded random-walk price plus static supplier
//! and demand reference data.

mod generator;
pub mod reference;

pub use generator::{FeedConfig, FeedGenerator, next_price};
