//! Host load readings as dashboard metrics.
//!
//! Reading CPU and memory load is platform specific, so it sits behind
//! [`LoadPoller`]. Implement it with whatever your platform offers and hand it
//! to [`register_load_metrics`].

use std::{fmt::Display, sync::Arc};

use crate::{error::Result, registry::Registry};

/// Identifier of the CPU load metric
pub const CPU_METRIC: &str = "CPU";
/// Identifier of the memory load metric
pub const RAM_METRIC: &str = "RAM";

/// A source of host load readings, in percent.
pub trait LoadPoller: Send + Sync {
    /// Current processor load, 0 to 100
    fn cpu_percent(&self) -> f32;

    /// Current memory usage, 0 to 100
    fn ram_percent(&self) -> f32;
}

/// A percentage that renders rounded, with a `%` suffix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Percent(pub f32);

impl Display for Percent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.0}%", self.0)
    }
}

/// Register visible `CPU` and `RAM` provider metrics that read `poller` on
/// every access.
///
/// Fails like [`Registry::add_provider`], for example when either identifier
/// is already taken. `CPU` is registered first, so a taken `RAM` leaves `CPU`
/// in place.
pub fn register_load_metrics(registry: &Registry, poller: Arc<dyn LoadPoller>) -> Result<()> {
    let cpu = poller.clone();
    registry.add_provider(CPU_METRIC, move || Percent(cpu.cpu_percent()), false)?;
    registry.add_provider(RAM_METRIC, move || Percent(poller.ram_percent()), false)
}
