use metrics::Key;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::{
    Customizer, DynamicKind, DynamicMeterBuilder, MeterBuilder, MeterOptions,
    ParameterlessDynamicMeter, Pipeline, Registry, Result,
};

/// A monotonically increasing counter registered in a [`Registry`].
#[derive(Debug, Clone)]
pub struct Counter {
    key: Key,
    atomic: Arc<AtomicU64>,
}

impl Counter {
    pub fn id(&self) -> &Key {
        &self.key
    }

    pub fn increment(&self) {
        self.increment_by(1);
    }

    pub fn increment_by(&self, value: u64) {
        self.atomic.fetch_add(value, Ordering::Release);
    }

    pub fn count(&self) -> u64 {
        self.atomic.load(Ordering::Acquire)
    }
}

impl PartialEq for Counter {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.atomic, &other.atomic)
    }
}

#[derive(Debug, Clone)]
pub struct CounterBuilder {
    options: MeterOptions,
}

impl CounterBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            options: MeterOptions::new(name),
        }
    }

    pub fn register(self, registry: &Registry) -> Counter {
        let opts = &self.options;
        registry.describe(opts.name(), opts.description(), opts.base_unit());
        let key = opts.key();
        let atomic = registry.counter(&key);
        Counter { key, atomic }
    }
}

impl MeterBuilder for CounterBuilder {
    fn options(&self) -> &MeterOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut MeterOptions {
        &mut self.options
    }
}

/// Registers a [`Counter`] per distinct set of tag values.
pub struct DynamicCounter {
    inner: ParameterlessDynamicMeter<Registry, CounterBuilder, Counter>,
}

impl DynamicCounter {
    pub fn builder(registry: Arc<Registry>, name: impl Into<String>) -> DynamicMeterBuilder<Self> {
        DynamicMeterBuilder::new(registry, name)
    }

    /// Returns the counter for `tag_values`, registering it on first use.
    pub fn get_or_create(&self, tag_values: &[&str]) -> Result<Counter> {
        self.inner.get_or_create(tag_values)
    }

    pub fn get(&self, tag_values: &[&str]) -> Result<Option<Counter>> {
        self.inner.get(tag_values)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tag_keys(&self) -> &[String] {
        self.inner.tag_keys()
    }
}

impl DynamicKind for DynamicCounter {
    type State = CounterBuilder;

    fn assemble(
        registry: Arc<Registry>,
        name: String,
        customizers: Vec<Customizer<CounterBuilder>>,
        tag_keys: Vec<String>,
    ) -> Self {
        let pipeline = Pipeline::parameterless(
            |name| Ok(CounterBuilder::new(name)),
            |b: CounterBuilder, tags| Ok(b.tags(tags)),
            |registry: &Registry, b: CounterBuilder| Ok(b.register(registry)),
        );
        Self {
            inner: ParameterlessDynamicMeter::new(registry, name, pipeline, customizers, tag_keys),
        }
    }
}
