//! Types for working with in-memory local aggregations

mod timing_samples;

pub use timing_samples::{SampleTimer, TimingAggregator, TimingSummary};
pub(crate) use timing_samples::time_millis;
