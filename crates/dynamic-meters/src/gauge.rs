use metrics::Key;
use std::fmt;
use std::sync::Arc;

use crate::{
    Customizer, DynamicKind, DynamicMeter, DynamicMeterBuilder, MeterBuilder, MeterOptions,
    Pipeline, Registry, Result,
};

/// The function a gauge is polled with whenever its value is read.
pub type GaugeFn = Arc<dyn Fn() -> f64 + Send + Sync>;

/// A gauge reporting the current value of a function.
#[derive(Clone)]
pub struct Gauge {
    key: Key,
    value_fn: GaugeFn,
}

impl Gauge {
    pub fn id(&self) -> &Key {
        &self.key
    }

    pub fn value(&self) -> f64 {
        (self.value_fn)()
    }
}

impl PartialEq for Gauge {
    fn eq(&self, other: &Self) -> bool {
        Arc::as_ptr(&self.value_fn).cast::<()>() == Arc::as_ptr(&other.value_fn).cast::<()>()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("key", &self.key)
            .field("value", &self.value())
            .finish()
    }
}

#[derive(Clone)]
pub struct GaugeBuilder {
    options: MeterOptions,
    value_fn: GaugeFn,
}

impl GaugeBuilder {
    pub fn new<F>(name: impl Into<String>, value_fn: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self {
            options: MeterOptions::new(name),
            value_fn: Arc::new(value_fn),
        }
    }

    /// Registers the gauge. If a gauge with the same name and tags already
    /// exists in the registry, the existing one is returned.
    pub fn register(self, registry: &Registry) -> Gauge {
        let opts = &self.options;
        registry.describe(opts.name(), opts.description(), opts.base_unit());
        let key = opts.key();
        let value_fn = registry.gauge(&key, self.value_fn);
        Gauge { key, value_fn }
    }
}

impl MeterBuilder for GaugeBuilder {
    fn options(&self) -> &MeterOptions {
        &self.options
    }

    fn options_mut(&mut self) -> &mut MeterOptions {
        &mut self.options
    }
}

/// An object observed by a gauge, together with the function extracting its value.
pub struct GaugeParams<T> {
    obj: Arc<T>,
    to_f64: Box<dyn Fn(&T) -> f64 + Send + Sync>,
}

impl<T: Send + Sync + 'static> GaugeParams<T> {
    pub fn new<F>(obj: Arc<T>, to_f64: F) -> Self
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        Self {
            obj,
            to_f64: Box::new(to_f64),
        }
    }

    fn into_builder(self, name: &str) -> GaugeBuilder {
        let GaugeParams { obj, to_f64 } = self;
        GaugeBuilder::new(name, move || to_f64(&obj))
    }
}

fn gauge_tagger(b: GaugeBuilder, tags: Vec<crate::Tag>) -> anyhow::Result<GaugeBuilder> {
    Ok(b.tags(tags))
}

fn gauge_registrar(registry: &Registry, b: GaugeBuilder) -> anyhow::Result<Gauge> {
    Ok(b.register(registry))
}

/// Registers a [`Gauge`] observing an object of type `T` per distinct set of tag values.
pub struct DynamicGauge<T> {
    inner: DynamicMeter<Registry, GaugeParams<T>, GaugeBuilder, Gauge>,
}

impl<T: Send + Sync + 'static> DynamicGauge<T> {
    pub fn builder(registry: Arc<Registry>, name: impl Into<String>) -> DynamicMeterBuilder<Self> {
        DynamicMeterBuilder::new(registry, name)
    }

    /// Returns the gauge for `tag_values`, registering it on first use.
    ///
    /// Once a gauge exists for the tag values, later calls return it unchanged:
    /// the object and function given the first time keep being used.
    pub fn get_or_create<F>(&self, obj: Arc<T>, to_f64: F, tag_values: &[&str]) -> Result<Gauge>
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        self.inner
            .get_or_create(GaugeParams::new(obj, to_f64), tag_values)
    }

    pub fn get(&self, tag_values: &[&str]) -> Result<Option<Gauge>> {
        self.inner.get(tag_values)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tag_keys(&self) -> &[String] {
        self.inner.tag_keys()
    }
}

impl<T: Send + Sync + 'static> DynamicKind for DynamicGauge<T> {
    type State = GaugeBuilder;

    fn assemble(
        registry: Arc<Registry>,
        name: String,
        customizers: Vec<Customizer<GaugeBuilder>>,
        tag_keys: Vec<String>,
    ) -> Self {
        let pipeline = Pipeline::new(
            |name: &str, params: GaugeParams<T>| Ok(params.into_builder(name)),
            gauge_tagger,
            gauge_registrar,
        );
        Self {
            inner: DynamicMeter::new(registry, name, pipeline, customizers, tag_keys),
        }
    }
}

/// Registers a [`Gauge`] backed by a value supplier per distinct set of tag values.
pub struct SupplierDynamicGauge {
    inner: DynamicMeter<Registry, GaugeFn, GaugeBuilder, Gauge>,
}

impl SupplierDynamicGauge {
    pub fn builder(registry: Arc<Registry>, name: impl Into<String>) -> DynamicMeterBuilder<Self> {
        DynamicMeterBuilder::new(registry, name)
    }

    /// Returns the gauge for `tag_values`, registering it on first use.
    /// If the gauge already exists the supplier given the first time is kept.
    pub fn get_or_create<F>(&self, supplier: F, tag_values: &[&str]) -> Result<Gauge>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        self.inner.get_or_create(Arc::new(supplier), tag_values)
    }

    pub fn get(&self, tag_values: &[&str]) -> Result<Option<Gauge>> {
        self.inner.get(tag_values)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tag_keys(&self) -> &[String] {
        self.inner.tag_keys()
    }
}

impl DynamicKind for SupplierDynamicGauge {
    type State = GaugeBuilder;

    fn assemble(
        registry: Arc<Registry>,
        name: String,
        customizers: Vec<Customizer<GaugeBuilder>>,
        tag_keys: Vec<String>,
    ) -> Self {
        let pipeline = Pipeline::new(
            |name: &str, supplier: GaugeFn| {
                Ok(GaugeBuilder {
                    options: MeterOptions::new(name),
                    value_fn: supplier,
                })
            },
            gauge_tagger,
            gauge_registrar,
        );
        Self {
            inner: DynamicMeter::new(registry, name, pipeline, customizers, tag_keys),
        }
    }
}
