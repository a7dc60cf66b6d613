//! Named, typed, in-process metrics with a live terminal dashboard.
//!
//! [`Registry`] is a concurrent map from identifiers to metrics. A metric is
//! either a fixed value that you replace over time, or a provider closure that
//! is invoked whenever the metric is read. Values are anything `Display +
//! Send + Sync + 'static`; reads name the type they expect.
//!
//! [`Dashboard`] renders a registry's visible metrics to a terminal on a
//! background thread, repainting only what changed between frames.
//!
//! [`TimingAggregator`] collects elapsed-millisecond samples. Register one as
//! a metric and time work into it with [`Registry::measure_and_record`].
//!
//! # Examples
//!
//! ```
//! # use std::sync::Arc;
//! # use codealytics::{Dashboard, Registry, TimingAggregator};
//! let registry = Arc::new(Registry::new());
//! registry.add_value("status", "starting", false)?;
//! registry.add_value("frame_times", TimingAggregator::new(), false)?;
//!
//! registry.measure_and_record("frame_times", || {
//!     // work
//! })?;
//! registry.update_value("status", "running", None)?;
//!
//! let dashboard = Dashboard::new(registry.clone());
//! print!("{}", dashboard.snapshot());
//! # Ok::<(), codealytics::AnalyticsError>(())
//! ```
//!
//! # Logging
//!
//! This crate logs through [`log`]. Registration shows up at `debug`, lost
//! update races at `debug`, unresolvable metrics on the dashboard at `warn`
//! and terminal failures at `error`.

pub mod aggregation;
pub mod dashboard;
pub mod error;
pub mod poller;
pub mod registry;
pub mod types;

pub use aggregation::{SampleTimer, TimingAggregator, TimingSummary};
pub use dashboard::{Dashboard, DashboardConfiguration, MemoryTerminal, Terminal};
pub use error::{AnalyticsError, Result};
pub use poller::{register_load_metrics, LoadPoller, Percent};
pub use registry::{Registry, GENERATED_TIMING_PREFIX};
pub use types::{check_identifier, Identifier, MetricValue};
