//! Shard merging.
//!
//! The aggregator folds shard reports into a single merged result.

pub mod aggregator;

pub use aggregator::*;
