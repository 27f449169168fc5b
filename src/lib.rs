//! Batch CSV matcher: filter rows of one or more CSV files on a regular
//! expression against a chosen column, print the matches, and report the
//! top occurring values for selected columns.

pub mod config;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod report;
pub mod source;
pub mod stats;

pub use config::{Args, Config, FilterSpec};
pub use error::{Error, Result};
pub use matcher::Matcher;
pub use pipeline::{Pipeline, RunOutcome};
pub use stats::RankAggregator;
