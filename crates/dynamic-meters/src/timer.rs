use metrics::Key;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::distribution::Distribution;
use crate::{
    Customizer, DynamicKind, DynamicMeterBuilder, MeterBuilder, MeterOptions,
    ParameterlessDynamicMeter, Pipeline, Registry, Result,
};

/// Records durations, stored in seconds.
#[derive(Clone)]
pub struct Timer {
    key: Key,
    distribution: Arc<Distribution>,
}

impl Timer {
    pub fn id(&self) -> &Key {
        &self.key
    }

    pub fn record(&self, duration: Duration) {
        self.distribution.record(duration.as_secs_f64());
    }

    /// Runs `f` and records how long it took.
    pub fn time<T>(&self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.record(start.elapsed());
        result
    }

    pub fn count(&self) -> u64 {
        self.distribution.count()
    }

    pub fn total_time(&self) -> Duration {
        Duration::from_secs_f64(self.distribution.sum())
    }

    pub fn max(&self) -> Duration {
        Duration::from_secs_f64(self.distribution.max())
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.distribution, &other.distribution)
    }
}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer").field("key", &self.key).finish()
    }
}

#[derive(Debug, Clone)]
pub struct TimerBuilder {
    options: MeterOptions,
}

impl TimerBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        let mut options = MeterOptions::new(name);
        options.base_unit = Some("seconds".to_string());
        Self { options }
    }

    pub fn register(self, registry: &Registry) -> Timer {
        let opts = &self.options;
        registry.describe(opts.name(), opts.description(), opts.base_unit());
        let key = opts.key();
        let distribution = registry.histogram(&key);
        Timer { key, distribution }
    }
}

impl MeterBuilder for TimerBuilder {
    fn options(&self) -> &MeterOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut MeterOptions {
        &mut self.options
    }
}

/// Registers a [`Timer`] per distinct set of tag values.
pub struct DynamicTimer {
    inner: ParameterlessDynamicMeter<Registry, TimerBuilder, Timer>,
}

impl DynamicTimer {
    pub fn builder(registry: Arc<Registry>, name: impl Into<String>) -> DynamicMeterBuilder<Self> {
        DynamicMeterBuilder::new(registry, name)
    }

    pub fn get_or_create(&self, tag_values: &[&str]) -> Result<Timer> {
        self.inner.get_or_create(tag_values)
    }

    pub fn get(&self, tag_values: &[&str]) -> Result<Option<Timer>> {
        self.inner.get(tag_values)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tag_keys(&self) -> &[String] {
        self.inner.tag_keys()
    }
}

impl DynamicKind for DynamicTimer {
    type State = TimerBuilder;

    fn assemble(
        registry: Arc<Registry>,
        name: String,
        customizers: Vec<Customizer<TimerBuilder>>,
        tag_keys: Vec<String>,
    ) -> Self {
        let pipeline = Pipeline::parameterless(
            |name| Ok(TimerBuilder::new(name)),
            |b: TimerBuilder, tags| Ok(b.tags(tags)),
            |registry: &Registry, b: TimerBuilder| Ok(b.register(registry)),
        );
        Self {
            inner: ParameterlessDynamicMeter::new(registry, name, pipeline, customizers, tag_keys),
        }
    }
}
