use std::{fmt::Display, time::Instant};

/// Collects elapsed-time samples, in whole milliseconds, and derives
/// statistics from them on every read.
///
/// A TimingAggregator is a plain value: a clone owns its own copy of the
/// samples. Recording into the copy you got from `Registry::get()` changes
/// nothing in the registry until you write it back with an update, which is
/// what `Registry::measure_and_record()` does for you.
///
/// Samples are never evicted. If you measure something forever, memory grows
/// forever.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingAggregator {
    samples: Vec<u64>,
}

/// Statistics over one consistent set of samples.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingSummary {
    /// Number of samples
    pub count: usize,
    /// Sum of all samples, in milliseconds. Wide enough that no run of `u64`
    /// samples overflows it.
    pub total_ms: u128,
    /// Arithmetic mean, `None` without samples
    pub mean_ms: Option<f64>,
    /// Population variance (divisor = count), `None` without samples
    pub variance: Option<f64>,
    /// Square root of the population variance, `None` without samples
    pub standard_deviation: Option<f64>,
}

impl TimingSummary {
    fn from_samples(samples: &[u64]) -> Self {
        let count = samples.len();
        let total_ms: u128 = samples.iter().map(|sample| u128::from(*sample)).sum();
        if count == 0 {
            return Self {
                count,
                total_ms,
                mean_ms: None,
                variance: None,
                standard_deviation: None,
            };
        }
        let mean = total_ms as f64 / count as f64;
        let variance = samples
            .iter()
            .map(|sample| {
                let deviation = *sample as f64 - mean;
                deviation * deviation
            })
            .sum::<f64>()
            / count as f64;
        Self {
            count,
            total_ms,
            mean_ms: Some(mean),
            variance: Some(variance),
            standard_deviation: Some(variance.sqrt()),
        }
    }
}

impl Display for TimingSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (self.mean_ms, self.standard_deviation) {
            (Some(mean), Some(standard_deviation)) => write!(
                f,
                "runs: {}, total: {}ms, mean: {mean:.2}ms, std dev: {standard_deviation:.2}ms",
                self.count, self.total_ms
            ),
            _ => f.write_str("runs: 0"),
        }
    }
}

impl TimingAggregator {
    /// Create an empty aggregator
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one elapsed-time result. Never rejects a sample.
    pub fn add_result(&mut self, elapsed_ms: u64) {
        self.samples.push(elapsed_ms);
    }

    /// Run `action` once and record how many whole milliseconds it took.
    pub fn measure(&mut self, action: impl FnOnce()) -> u64 {
        let elapsed_ms = time_millis(action);
        self.add_result(elapsed_ms);
        elapsed_ms
    }

    /// Start timing a scope. The sample is recorded when the timer drops.
    pub fn start_timer(&mut self) -> SampleTimer<'_> {
        SampleTimer {
            aggregator: self,
            start: Instant::now(),
        }
    }

    /// Compute every statistic from the same set of samples.
    pub fn summary(&self) -> TimingSummary {
        TimingSummary::from_samples(&self.samples)
    }

    /// Number of recorded samples
    pub fn count(&self) -> usize {
        self.samples.len()
    }

    /// Sum of all recorded samples
    pub fn total_ms(&self) -> u128 {
        self.summary().total_ms
    }

    /// Mean elapsed milliseconds
    pub fn mean_ms(&self) -> Option<f64> {
        self.summary().mean_ms
    }

    /// Population variance of the samples
    pub fn variance(&self) -> Option<f64> {
        self.summary().variance
    }

    /// Standard deviation of the samples
    pub fn standard_deviation(&self) -> Option<f64> {
        self.summary().standard_deviation
    }

    /// The samples in recording order
    pub fn samples(&self) -> &[u64] {
        &self.samples
    }
}

impl Display for TimingAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.summary().fmt(f)
    }
}

/// Records the time since it was started into its aggregator when dropped.
#[derive(Debug)]
pub struct SampleTimer<'a> {
    aggregator: &'a mut TimingAggregator,
    start: Instant,
}

impl SampleTimer<'_> {
    /// Whole milliseconds since the timer started
    pub fn elapsed_ms(&self) -> u64 {
        millis_since(self.start)
    }
}

impl Drop for SampleTimer<'_> {
    fn drop(&mut self) {
        let elapsed_ms = millis_since(self.start);
        self.aggregator.add_result(elapsed_ms);
    }
}

/// Run `action` once and return its elapsed whole milliseconds.
pub(crate) fn time_millis(action: impl FnOnce()) -> u64 {
    let start = Instant::now();
    action();
    millis_since(start)
}

fn millis_since(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
