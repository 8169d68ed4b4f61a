use dashmap::DashMap;
use metrics::{Key, KeyName, Metadata, Recorder, SharedString, Unit};
use metrics_util::registry::{AtomicStorage, Registry as MetricsRegistry};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use crate::distribution::Distribution;
use crate::gauge::GaugeFn;

#[derive(Debug, Clone, Default)]
struct Description {
    text: Option<String>,
    base_unit: Option<String>,
}

#[derive(Clone)]
pub struct Registry {
    inner: Arc<MetricsRegistry<Key, AtomicStorage>>,
    gauge_fns: Arc<DashMap<Key, GaugeFn>>,
    histograms: Arc<DashMap<Key, Arc<Distribution>>>,
    descriptions: Arc<DashMap<String, Description>>,
    registered_at: Arc<DashMap<u64, SystemTime>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MetricsRegistry::atomic()),
            gauge_fns: Arc::new(DashMap::new()),
            histograms: Arc::new(DashMap::new()),
            descriptions: Arc::new(DashMap::new()),
            registered_at: Arc::new(DashMap::new()),
        }
    }

    /// Attach a description and base unit to every meter with the given name.
    /// Fields that are already set are kept.
    pub fn describe(&self, name: &str, description: Option<&str>, base_unit: Option<&str>) {
        if description.is_none() && base_unit.is_none() {
            return;
        }
        let mut entry = self.descriptions.entry(name.to_string()).or_default();
        if entry.text.is_none() {
            entry.text = description.map(str::to_string);
        }
        if entry.base_unit.is_none() {
            entry.base_unit = base_unit.map(str::to_string);
        }
    }

    pub(crate) fn counter(&self, key: &Key) -> Arc<AtomicU64> {
        self.record_first_seen(key);
        self.inner.get_or_create_counter(key, |c| c.clone())
    }

    /// Registers a gauge polled through `value_fn`. If the key is already
    /// registered the existing function is kept and returned.
    pub(crate) fn gauge(&self, key: &Key, value_fn: GaugeFn) -> GaugeFn {
        self.record_first_seen(key);
        self.gauge_fns
            .entry(key.clone())
            .or_insert(value_fn)
            .value()
            .clone()
    }

    pub(crate) fn histogram(&self, key: &Key) -> Arc<Distribution> {
        self.record_first_seen(key);
        self.histograms
            .entry(key.clone())
            .or_default()
            .value()
            .clone()
    }

    /// Number of distinct meters registered so far. A key registered both as a
    /// polled gauge and through the metrics facade counts once.
    pub fn len(&self) -> usize {
        let mut keys: HashSet<Key> = HashSet::new();
        self.inner.visit_counters(|key, _| {
            keys.insert(key.clone());
        });
        self.inner.visit_gauges(|key, _| {
            keys.insert(key.clone());
        });
        keys.extend(self.gauge_fns.iter().map(|entry| entry.key().clone()));
        keys.extend(self.histograms.iter().map(|entry| entry.key().clone()));
        keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn collect(&self) -> Vec<CollectedMetric> {
        let mut collected_metrics = Vec::new();
        let timestamp = SystemTime::now();

        // Collect counters
        self.inner.visit_counters(|key, counter| {
            let value = MetricValue::Counter(counter.load(Ordering::Acquire));
            collected_metrics.push(self.collected(key, value, timestamp));
        });

        // Collect gauges set through the metrics facade, unless a polled gauge
        // owns the same key
        self.inner.visit_gauges(|key, gauge| {
            if self.gauge_fns.contains_key(key) {
                return;
            }
            let value = MetricValue::Gauge(f64::from_bits(gauge.load(Ordering::Acquire)));
            collected_metrics.push(self.collected(key, value, timestamp));
        });

        // Collect polled gauges
        for entry in self.gauge_fns.iter() {
            let value = MetricValue::Gauge((entry.value())());
            collected_metrics.push(self.collected(entry.key(), value, timestamp));
        }

        // Collect histograms
        for entry in self.histograms.iter() {
            let distribution = entry.value();
            let value = MetricValue::Histogram {
                count: distribution.count(),
                sum: distribution.sum(),
                max: distribution.max(),
            };
            collected_metrics.push(self.collected(entry.key(), value, timestamp));
        }

        collected_metrics
    }

    fn collected(&self, key: &Key, value: MetricValue, timestamp: SystemTime) -> CollectedMetric {
        let description = self.descriptions.get(key.name());
        CollectedMetric {
            name: key.name().to_string(),
            tags: key
                .labels()
                .map(|label| (label.key().to_string(), label.value().to_string()))
                .collect(),
            value,
            description: description.as_ref().and_then(|d| d.text.clone()),
            base_unit: description.as_ref().and_then(|d| d.base_unit.clone()),
            registered_at: self
                .registered_at
                .get(&key.get_hash())
                .map(|t| *t)
                .unwrap_or(timestamp),
            key: key.clone(),
        }
    }

    /// Record the first registration time for a timeseries ID (only if not already registered)
    fn record_first_seen(&self, key: &Key) {
        self.registered_at
            .entry(key.get_hash())
            .or_insert_with(SystemTime::now);
    }
}

// Implement the metrics Recorder trait so the `metrics` macros can record into the registry
impl Recorder for Registry {
    fn describe_counter(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.describe(key.as_str(), Some(&*description), unit.map(|u| u.as_str()));
    }

    fn describe_gauge(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.describe(key.as_str(), Some(&*description), unit.map(|u| u.as_str()));
    }

    fn describe_histogram(&self, key: KeyName, unit: Option<Unit>, description: SharedString) {
        self.describe(key.as_str(), Some(&*description), unit.map(|u| u.as_str()));
    }

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> metrics::Counter {
        metrics::Counter::from_arc(self.counter(key))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> metrics::Gauge {
        self.record_first_seen(key);
        let gauge_handle = self.inner.get_or_create_gauge(key, |g| g.clone());
        metrics::Gauge::from_arc(gauge_handle)
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> metrics::Histogram {
        metrics::Histogram::from_arc(self.histogram(key))
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MetricValue {
    Counter(u64),
    Gauge(f64),
    Histogram { count: u64, sum: f64, max: f64 },
}

#[derive(Debug, Clone)]
pub struct CollectedMetric {
    pub name: String,
    pub tags: Vec<(String, String)>,
    pub value: MetricValue,
    pub description: Option<String>,
    pub base_unit: Option<String>,
    pub registered_at: SystemTime,
    pub key: Key,
}
