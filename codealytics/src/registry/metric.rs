use std::{
    any::{type_name, Any},
    fmt::Debug,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};

use arc_swap::ArcSwap;

use crate::{
    error::{AnalyticsError, Result},
    types::{downcast_value, Identifier, MetricValue},
};

pub(crate) type Provider = Arc<dyn Fn() -> Arc<dyn MetricValue> + Send + Sync>;

/// How a metric produces its value: stored once, or pulled on every read.
#[derive(Clone)]
pub(crate) enum Representation {
    Value(Arc<dyn MetricValue>),
    Provider(Provider),
}

impl Debug for Representation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Representation::Value(value) => {
                f.debug_tuple("Value").field(&value.to_string()).finish()
            }
            Representation::Provider(_) => f.write_str("Provider"),
        }
    }
}

impl Representation {
    pub(crate) fn value<T: MetricValue>(value: T) -> Self {
        Representation::Value(Arc::new(value))
    }

    pub(crate) fn provider<T, F>(provider: F) -> Self
    where
        T: MetricValue,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Representation::Provider(Arc::new(move || Arc::new(provider()) as Arc<dyn MetricValue>))
    }

    /// Produce the current value, invoking the provider if there is one.
    ///
    /// A panicking provider is reported as unresolvable rather than taking
    /// the calling thread down with it.
    pub(crate) fn resolve(&self, id: &Identifier) -> Result<Arc<dyn MetricValue>> {
        match self {
            Representation::Value(value) => Ok(value.clone()),
            Representation::Provider(provider) => {
                panic::catch_unwind(AssertUnwindSafe(|| provider())).map_err(|payload| {
                    AnalyticsError::Unresolvable {
                        id: id.clone(),
                        reason: format!("provider panicked: {}", panic_message(&*payload)),
                    }
                })
            }
        }
    }

    /// Produce the current value as text.
    ///
    /// Formatting runs user `Display` code, so a panic there is caught and
    /// reported like a panicking provider.
    pub(crate) fn render(&self, id: &Identifier) -> Result<String> {
        let value = self.resolve(id)?;
        panic::catch_unwind(AssertUnwindSafe(|| value.to_string())).map_err(|payload| {
            AnalyticsError::Unresolvable {
                id: id.clone(),
                reason: format!("formatting panicked: {}", panic_message(&*payload)),
            }
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        *message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.as_str()
    } else {
        "unknown panic payload"
    }
}

/// Clone a resolved value out as the caller's declared type.
pub(crate) fn downcast_cloned<T>(id: &Identifier, value: &dyn MetricValue) -> Result<T>
where
    T: MetricValue + Clone,
{
    downcast_value::<T>(value)
        .cloned()
        .ok_or_else(|| AnalyticsError::Unresolvable {
            id: id.clone(),
            reason: format!("value `{value}` is not a {}", type_name::<T>()),
        })
}

/// Everything the registry knows about one metric. Replaced as a unit, so
/// representation and visibility can never disagree.
#[derive(Debug)]
pub(crate) struct MetricRecord {
    pub(crate) representation: Representation,
    pub(crate) visible: bool,
}

/// The swappable cell behind one identifier.
#[derive(Debug)]
pub(crate) struct MetricSlot {
    record: ArcSwap<MetricRecord>,
}

impl MetricSlot {
    pub(crate) fn new(record: MetricRecord) -> Self {
        Self {
            record: ArcSwap::from_pointee(record),
        }
    }

    pub(crate) fn load(&self) -> Arc<MetricRecord> {
        self.record.load_full()
    }

    /// Install `next` only if the slot still holds `current`.
    ///
    /// Returns false when another writer got there first.
    pub(crate) fn swap_if_current(&self, current: &Arc<MetricRecord>, next: MetricRecord) -> bool {
        let previous = self.record.compare_and_swap(current, Arc::new(next));
        Arc::ptr_eq(&*previous, current)
    }
}
