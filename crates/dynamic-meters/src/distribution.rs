use std::sync::atomic::{AtomicU64, Ordering};

/// Running count, sum and maximum of the values recorded into a histogram.
///
/// Only the aggregates are kept, so recording and reading are both O(1).
/// Negative and NaN values are ignored.
#[derive(Debug, Default)]
pub struct Distribution {
    count: AtomicU64,
    sum: AtomicU64,
    max: AtomicU64,
}

impl Distribution {
    pub fn record(&self, value: f64) {
        if value.is_nan() || value < 0.0 {
            return;
        }
        update_f64(&self.sum, |sum| sum + value);
        update_f64(&self.max, |max| max.max(value));
        self.count.fetch_add(1, Ordering::Release);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Acquire)
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Acquire))
    }

    pub fn max(&self) -> f64 {
        f64::from_bits(self.max.load(Ordering::Acquire))
    }
}

impl metrics::HistogramFn for Distribution {
    fn record(&self, value: f64) {
        Distribution::record(self, value);
    }
}

fn update_f64(atomic: &AtomicU64, f: impl Fn(f64) -> f64) {
    // The closure never returns None, so the update always succeeds.
    let _ = atomic.fetch_update(Ordering::AcqRel, Ordering::Acquire, |bits| {
        Some(f(f64::from_bits(bits)).to_bits())
    });
}
