use metrics::Key;
use std::fmt;
use std::sync::Arc;

use crate::distribution::Distribution;
use crate::{
    Customizer, DynamicKind, DynamicMeterBuilder, MeterBuilder, MeterOptions,
    ParameterlessDynamicMeter, Pipeline, Registry, Result,
};

/// Tracks the distribution of recorded amounts.
#[derive(Clone)]
pub struct DistributionSummary {
    key: Key,
    distribution: Arc<Distribution>,
    scale: f64,
}

impl DistributionSummary {
    pub fn id(&self) -> &Key {
        &self.key
    }

    /// Records `amount`, multiplied by the configured scale. Negative amounts
    /// are ignored.
    pub fn record(&self, amount: f64) {
        if amount < 0.0 {
            return;
        }
        self.distribution.record(amount * self.scale);
    }

    pub fn count(&self) -> u64 {
        self.distribution.count()
    }

    pub fn total_amount(&self) -> f64 {
        self.distribution.sum()
    }

    pub fn max(&self) -> f64 {
        self.distribution.max()
    }
}

impl PartialEq for DistributionSummary {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.distribution, &other.distribution)
    }
}

impl fmt::Debug for DistributionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributionSummary")
            .field("key", &self.key)
            .field("scale", &self.scale)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct DistributionSummaryBuilder {
    options: MeterOptions,
    scale: f64,
}

impl DistributionSummaryBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            options: MeterOptions::new(name),
            scale: 1.0,
        }
    }

    /// Multiplier applied to every recorded amount.
    pub fn scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn register(self, registry: &Registry) -> DistributionSummary {
        let opts = &self.options;
        registry.describe(opts.name(), opts.description(), opts.base_unit());
        let key = opts.key();
        let distribution = registry.histogram(&key);
        DistributionSummary {
            key,
            distribution,
            scale: self.scale,
        }
    }
}

impl MeterBuilder for DistributionSummaryBuilder {
    fn options(&self) -> &MeterOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut MeterOptions {
        &mut self.options
    }
}

/// Registers a [`DistributionSummary`] per distinct set of tag values.
pub struct DynamicDistributionSummary {
    inner: ParameterlessDynamicMeter<Registry, DistributionSummaryBuilder, DistributionSummary>,
}

impl DynamicDistributionSummary {
    pub fn builder(registry: Arc<Registry>, name: impl Into<String>) -> DynamicMeterBuilder<Self> {
        DynamicMeterBuilder::new(registry, name)
    }

    pub fn get_or_create(&self, tag_values: &[&str]) -> Result<DistributionSummary> {
        self.inner.get_or_create(tag_values)
    }

    pub fn get(&self, tag_values: &[&str]) -> Result<Option<DistributionSummary>> {
        self.inner.get(tag_values)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tag_keys(&self) -> &[String] {
        self.inner.tag_keys()
    }
}

impl DynamicKind for DynamicDistributionSummary {
    type State = DistributionSummaryBuilder;

    fn assemble(
        registry: Arc<Registry>,
        name: String,
        customizers: Vec<Customizer<DistributionSummaryBuilder>>,
        tag_keys: Vec<String>,
    ) -> Self {
        let pipeline = Pipeline::parameterless(
            |name| Ok(DistributionSummaryBuilder::new(name)),
            |b: DistributionSummaryBuilder, tags| Ok(b.tags(tags)),
            |registry: &Registry, b: DistributionSummaryBuilder| Ok(b.register(registry)),
        );
        Self {
            inner: ParameterlessDynamicMeter::new(registry, name, pipeline, customizers, tag_keys),
        }
    }
}
