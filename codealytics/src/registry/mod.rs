//! The metric registry: named values and providers, shared across threads.

use std::{
    collections::{btree_map::Entry, BTreeMap},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};

use crate::{
    aggregation::{time_millis, TimingAggregator},
    error::{AnalyticsError, Result},
    types::{check_identifier, Identifier, MetricValue},
};

mod metric;

pub(crate) use metric::MetricRecord;
use metric::{downcast_cloned, MetricSlot, Representation};

/// Prefix of the identifiers `measure_and_record_new()` generates.
pub const GENERATED_TIMING_PREFIX: &str = "RuntimePerformanceInformation_";

/// A concurrent map of named metrics.
///
/// Share it with an `Arc`. Every operation touches exactly one identifier:
/// operations on different identifiers never wait on each other beyond the
/// brief map lock taken to find the metric's slot.
///
/// Updates are optimistic. An update reads the metric, computes the
/// replacement and swaps it in only if nobody else replaced the metric in the
/// meantime; otherwise it fails with [`AnalyticsError::Conflict`] and you
/// decide whether to retry. For hot metrics, wrap the update in a loop that
/// retries on `Conflict`.
///
/// ```
/// # use codealytics::Registry;
/// let registry = Registry::new();
/// registry.add_value("requests", 0_u64, false)?;
/// registry.update_with("requests", |requests: u64| requests + 1, None)?;
/// assert_eq!(1, registry.get::<u64>("requests")?);
/// # Ok::<(), codealytics::AnalyticsError>(())
/// ```
#[derive(Debug)]
pub struct Registry {
    metrics: RwLock<BTreeMap<Identifier, Arc<MetricSlot>>>,
    dashboard_dirty: AtomicBool,
    next_timing_sequence: AtomicU64,
}

impl Default for Registry {
    fn default() -> Self {
        Self {
            metrics: Default::default(),
            // A fresh dashboard always starts with a full repaint.
            dashboard_dirty: AtomicBool::new(true),
            next_timing_sequence: AtomicU64::new(0),
        }
    }
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a fixed value.
    ///
    /// Hidden metrics can be read with `get()` but are left off the dashboard.
    pub fn add_value<T>(&self, id: impl Into<Identifier>, value: T, hidden: bool) -> Result<()>
    where
        T: MetricValue,
    {
        self.insert(id.into(), Representation::value(value), hidden)
    }

    /// Register a provider. It is invoked on every `get()` and every
    /// dashboard frame; nothing is cached.
    pub fn add_provider<T, F>(
        &self,
        id: impl Into<Identifier>,
        provider: F,
        hidden: bool,
    ) -> Result<()>
    where
        T: MetricValue,
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.insert(id.into(), Representation::provider(provider), hidden)
    }

    /// Resolve a metric as `T`.
    ///
    /// Providers are invoked synchronously on the calling thread. A provider
    /// that panics, or a stored value that is not a `T`, is
    /// [`AnalyticsError::Unresolvable`].
    pub fn get<T>(&self, id: &str) -> Result<T>
    where
        T: MetricValue + Clone,
    {
        let (id, slot) = self.slot(id)?;
        let value = slot.load().representation.resolve(&id)?;
        downcast_cloned(&id, &*value)
    }

    /// Replace a metric with a fixed value.
    ///
    /// `hidden: None` keeps the current visibility.
    pub fn update_value<T>(&self, id: &str, value: T, hidden: Option<bool>) -> Result<()>
    where
        T: MetricValue,
    {
        let (id, slot) = self.slot(id)?;
        let current = slot.load();
        let visible = hidden.map_or(current.visible, |hidden| !hidden);
        self.swap(&id, &slot, &current, Representation::value(value), visible)
    }

    /// Replace a metric with `transform` applied to its current value.
    ///
    /// A provider is resolved first; the metric becomes a fixed value.
    /// `hidden: None` keeps the current visibility.
    pub fn update_with<T, F>(&self, id: &str, transform: F, hidden: Option<bool>) -> Result<()>
    where
        T: MetricValue + Clone,
        F: FnOnce(T) -> T,
    {
        let (id, slot) = self.slot(id)?;
        let current = slot.load();
        let resolved = current.representation.resolve(&id)?;
        let value = transform(downcast_cloned::<T>(&id, &*resolved)?);
        let visible = hidden.map_or(current.visible, |hidden| !hidden);
        self.swap(&id, &slot, &current, Representation::value(value), visible)
    }

    /// Replace a metric with a provider, keeping its visibility.
    pub fn update_provider<T, F>(&self, id: &str, provider: F) -> Result<()>
    where
        T: MetricValue,
        F: Fn() -> T + Send + Sync + 'static,
    {
        let (id, slot) = self.slot(id)?;
        let current = slot.load();
        let visible = current.visible;
        self.swap(&id, &slot, &current, Representation::provider(provider), visible)
    }

    /// Whether a metric is registered. Providers are not invoked.
    pub fn exists(&self, id: &str) -> Result<bool> {
        check_identifier(id)?;
        Ok(self.read_metrics().contains_key(id))
    }

    /// Run `action` once and record its elapsed milliseconds in the
    /// [`TimingAggregator`] registered under `id`.
    ///
    /// The aggregator is resolved before `action` runs, so a bad `id` never
    /// runs the action. The sample is then appended with `update_with()`,
    /// retried on `Conflict` so concurrent measurements are all kept exactly
    /// once. The action itself never reruns.
    pub fn measure_and_record(&self, id: &str, action: impl FnOnce()) -> Result<u64> {
        let _: TimingAggregator = self.get(id)?;
        let elapsed_ms = time_millis(action);
        loop {
            let appended = self.update_with(
                id,
                |mut aggregator: TimingAggregator| {
                    aggregator.add_result(elapsed_ms);
                    aggregator
                },
                None,
            );
            match appended {
                Err(AnalyticsError::Conflict { .. }) => continue,
                result => return result.map(|()| elapsed_ms),
            }
        }
    }

    /// Like `measure_and_record()`, but into a new visible aggregator under a
    /// generated `RuntimePerformanceInformation_<n>` identifier.
    ///
    /// Returns the generated identifier so later measurements can target the
    /// same aggregator.
    pub fn measure_and_record_new(&self, action: impl FnOnce()) -> Result<(Identifier, u64)> {
        let mut aggregator = TimingAggregator::new();
        let elapsed_ms = aggregator.measure(action);
        let id = self.register_generated_timing(&aggregator)?;
        Ok((id, elapsed_ms))
    }

    /// Number of registered metrics, hidden ones included
    pub fn len(&self) -> usize {
        self.read_metrics().len()
    }

    /// True before anything was registered
    pub fn is_empty(&self) -> bool {
        self.read_metrics().is_empty()
    }

    /// All registered identifiers in rendering order
    pub fn identifiers(&self) -> Vec<Identifier> {
        self.read_metrics().keys().cloned().collect()
    }

    /// Request a full dashboard repaint on the next frame.
    pub fn mark_dashboard_dirty(&self) {
        self.dashboard_dirty.store(true, Ordering::Release);
    }

    /// Read and clear the full-repaint request in one step.
    pub fn take_dashboard_dirty(&self) -> bool {
        self.dashboard_dirty.swap(false, Ordering::AcqRel)
    }

    /// Visible metrics in identifier order, as of this call.
    pub(crate) fn visible_records(&self) -> Vec<(Identifier, Arc<MetricRecord>)> {
        let slots: Vec<(Identifier, Arc<MetricSlot>)> = self
            .read_metrics()
            .iter()
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .collect();
        slots
            .into_iter()
            .map(|(id, slot)| (id, slot.load()))
            .filter(|(_, record)| record.visible)
            .collect()
    }

    fn insert(&self, id: Identifier, representation: Representation, hidden: bool) -> Result<()> {
        check_identifier(id.as_str())?;
        match self.write_metrics().entry(id) {
            Entry::Occupied(occupied) => {
                return Err(AnalyticsError::AlreadyExists {
                    id: occupied.key().clone(),
                })
            }
            Entry::Vacant(vacant) => {
                log::debug!("registered metric {} (hidden: {hidden})", vacant.key());
                vacant.insert(Arc::new(MetricSlot::new(MetricRecord {
                    representation,
                    visible: !hidden,
                })));
            }
        }
        // Only after the row exists, so a renderer cannot consume the flag too early.
        if !hidden {
            self.mark_dashboard_dirty();
        }
        Ok(())
    }

    fn register_generated_timing(&self, aggregator: &TimingAggregator) -> Result<Identifier> {
        loop {
            let sequence = self.next_timing_sequence.fetch_add(1, Ordering::Relaxed);
            let id = Identifier::from(format!("{GENERATED_TIMING_PREFIX}{sequence}"));
            match self.insert(id.clone(), Representation::value(aggregator.clone()), false) {
                Ok(()) => return Ok(id),
                Err(AnalyticsError::AlreadyExists { id }) => {
                    log::debug!("generated identifier {id} is taken, trying the next one")
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn slot(&self, id: &str) -> Result<(Identifier, Arc<MetricSlot>)> {
        check_identifier(id)?;
        self.read_metrics()
            .get_key_value(id)
            .map(|(id, slot)| (id.clone(), slot.clone()))
            .ok_or_else(|| AnalyticsError::NotFound { id: id.to_owned() })
    }

    fn swap(
        &self,
        id: &Identifier,
        slot: &MetricSlot,
        current: &Arc<MetricRecord>,
        representation: Representation,
        visible: bool,
    ) -> Result<()> {
        if !slot.swap_if_current(
            current,
            MetricRecord {
                representation,
                visible,
            },
        ) {
            log::debug!("lost an update race on {id}");
            return Err(AnalyticsError::Conflict { id: id.clone() });
        }
        if visible != current.visible {
            self.mark_dashboard_dirty();
        }
        Ok(())
    }

    fn read_metrics(&self) -> RwLockReadGuard<'_, BTreeMap<Identifier, Arc<MetricSlot>>> {
        // Map mutations are single inserts, so a poisoned map is still consistent.
        self.metrics.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_metrics(&self) -> RwLockWriteGuard<'_, BTreeMap<Identifier, Arc<MetricSlot>>> {
        self.metrics.write().unwrap_or_else(PoisonError::into_inner)
    }
}
