use dashmap::DashMap;
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::tags::zip_tags;
use crate::{Error, Result, Tag};

/// A transform applied to a builder state before tags are attached.
pub type Customizer<B> = Box<dyn Fn(B) -> anyhow::Result<B> + Send + Sync>;

type NewBuilderFn<P, B> = Box<dyn Fn(&str, P) -> anyhow::Result<B> + Send + Sync>;
type TaggerFn<B> = Box<dyn Fn(B, Vec<Tag>) -> anyhow::Result<B> + Send + Sync>;
type RegistrarFn<R, B, H> = Box<dyn Fn(&R, B) -> anyhow::Result<H> + Send + Sync>;

/// The functions that turn a name, build params and tags into a registered meter.
///
/// `R` is the registry handed to the registrar, `P` the per-call build params,
/// `B` the builder state and `H` the registered handle.
pub struct Pipeline<R, P, B, H> {
    new_builder: NewBuilderFn<P, B>,
    tagger: TaggerFn<B>,
    registrar: RegistrarFn<R, B, H>,
}

impl<R, P, B, H> Pipeline<R, P, B, H> {
    pub fn new<N, T, G>(new_builder: N, tagger: T, registrar: G) -> Self
    where
        N: Fn(&str, P) -> anyhow::Result<B> + Send + Sync + 'static,
        T: Fn(B, Vec<Tag>) -> anyhow::Result<B> + Send + Sync + 'static,
        G: Fn(&R, B) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        Self {
            new_builder: Box::new(new_builder),
            tagger: Box::new(tagger),
            registrar: Box::new(registrar),
        }
    }
}

impl<R, B, H> Pipeline<R, (), B, H> {
    /// A pipeline for meters whose builders need nothing but the name.
    pub fn parameterless<N, T, G>(new_builder: N, tagger: T, registrar: G) -> Self
    where
        N: Fn(&str) -> anyhow::Result<B> + Send + Sync + 'static,
        T: Fn(B, Vec<Tag>) -> anyhow::Result<B> + Send + Sync + 'static,
        G: Fn(&R, B) -> anyhow::Result<H> + Send + Sync + 'static,
    {
        Self::new(move |name, ()| new_builder(name), tagger, registrar)
    }
}

/// Folds the customizers into a single transform applying them in order.
pub(crate) fn reduce_customizers<B: 'static>(
    customizers: impl IntoIterator<Item = Customizer<B>>,
) -> Option<Customizer<B>> {
    customizers
        .into_iter()
        .reduce(|first, then| -> Customizer<B> {
            Box::new(move |builder: B| then(first(builder)?))
        })
}

/// A meter with a fixed name and tag keys, registering one underlying meter
/// per distinct combination of tag values the first time it is requested.
///
/// The construction pipeline runs at most once per combination, also when
/// many threads ask for the same one at the same time. The pipeline must not
/// call back into the same meter for the combination it is building.
pub struct DynamicMeter<R, P, B, H> {
    registry: Arc<R>,
    name: String,
    pipeline: Pipeline<R, P, B, H>,
    customizer: Option<Customizer<B>>,
    tag_keys: Vec<String>,
    meters: DashMap<Vec<String>, Arc<OnceCell<H>>>,
}

impl<R, P, B, H> DynamicMeter<R, P, B, H>
where
    B: 'static,
    H: Clone,
{
    pub fn new<K>(
        registry: Arc<R>,
        name: impl Into<String>,
        pipeline: Pipeline<R, P, B, H>,
        customizers: impl IntoIterator<Item = Customizer<B>>,
        tag_keys: impl IntoIterator<Item = K>,
    ) -> Self
    where
        K: Into<String>,
    {
        Self {
            registry,
            name: name.into(),
            pipeline,
            customizer: reduce_customizers(customizers),
            tag_keys: tag_keys.into_iter().map(Into::into).collect(),
            meters: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag_keys(&self) -> &[String] {
        &self.tag_keys
    }

    pub fn registry(&self) -> &Arc<R> {
        &self.registry
    }

    /// Returns the meter registered for `tag_values`, registering it first if
    /// this is the first request for that combination. `params` is only used
    /// when a new meter is built.
    pub fn get_or_create(&self, params: P, tag_values: &[&str]) -> Result<H> {
        self.validate(tag_values)?;
        let key = cache_key(tag_values);
        if let Some(handle) = self.lookup(&key) {
            return Ok(handle);
        }

        let mut params = Some(params);
        loop {
            let slot = Arc::clone(self.meters.entry(key.clone()).or_default().value());
            let result = slot.get_or_try_init(|| {
                // A failed build unmaps its slot; callers still holding it start over.
                if !self.is_mapped(&key, &slot) {
                    return Err(InitError::Unmapped);
                }
                let params = params
                    .take()
                    .ok_or_else(|| InitError::Failed(anyhow::anyhow!("build params already used")))?;
                match self.create(params, tag_values) {
                    Ok(handle) => {
                        log::debug!(
                            "registered meter '{}' for tag values {:?}",
                            self.name,
                            tag_values
                        );
                        Ok(handle)
                    }
                    Err(err) => {
                        self.meters
                            .remove_if(&key, |_, mapped| Arc::ptr_eq(mapped, &slot));
                        log::trace!(
                            "failed to build meter '{}' for tag values {:?}: {}",
                            self.name,
                            tag_values,
                            err
                        );
                        Err(InitError::Failed(err))
                    }
                }
            });
            match result {
                Ok(handle) => return Ok(handle.clone()),
                Err(InitError::Unmapped) => continue,
                Err(InitError::Failed(err)) => return Err(Error::Pipeline(err)),
            }
        }
    }

    /// Returns the meter previously registered for `tag_values`, if any.
    pub fn get(&self, tag_values: &[&str]) -> Result<Option<H>> {
        self.validate(tag_values)?;
        Ok(self.lookup(&cache_key(tag_values)))
    }

    /// Number of meters registered through this dynamic meter.
    pub fn len(&self) -> usize {
        self.meters
            .iter()
            .filter(|slot| slot.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, key: &[String]) -> Option<H> {
        self.meters
            .get(key)
            .and_then(|slot| slot.value().get().cloned())
    }

    fn is_mapped(&self, key: &[String], slot: &Arc<OnceCell<H>>) -> bool {
        self.meters
            .get(key)
            .is_some_and(|mapped| Arc::ptr_eq(mapped.value(), slot))
    }

    fn validate(&self, tag_values: &[&str]) -> Result<()> {
        if tag_values.len() != self.tag_keys.len() {
            return Err(Error::ArityMismatch {
                expected: self.tag_keys.len(),
                actual: tag_values.len(),
                keys: self.tag_keys.clone(),
            });
        }
        Ok(())
    }

    fn create(&self, params: P, tag_values: &[&str]) -> anyhow::Result<H> {
        let mut builder = (self.pipeline.new_builder)(&self.name, params)?;
        if let Some(customizer) = &self.customizer {
            builder = customizer(builder)?;
        }
        let tags = zip_tags(&self.tag_keys, tag_values);
        let builder = (self.pipeline.tagger)(builder, tags)?;
        (self.pipeline.registrar)(&self.registry, builder)
    }
}

enum InitError {
    Unmapped,
    Failed(anyhow::Error),
}

fn cache_key(tag_values: &[&str]) -> Vec<String> {
    tag_values.iter().map(|v| v.to_string()).collect()
}

/// A [`DynamicMeter`] whose builders take no per-call params.
pub struct ParameterlessDynamicMeter<R, B, H> {
    inner: DynamicMeter<R, (), B, H>,
}

impl<R, B, H> ParameterlessDynamicMeter<R, B, H>
where
    B: 'static,
    H: Clone,
{
    pub fn new<K>(
        registry: Arc<R>,
        name: impl Into<String>,
        pipeline: Pipeline<R, (), B, H>,
        customizers: impl IntoIterator<Item = Customizer<B>>,
        tag_keys: impl IntoIterator<Item = K>,
    ) -> Self
    where
        K: Into<String>,
    {
        Self {
            inner: DynamicMeter::new(registry, name, pipeline, customizers, tag_keys),
        }
    }

    pub fn get_or_create(&self, tag_values: &[&str]) -> Result<H> {
        self.inner.get_or_create((), tag_values)
    }

    pub fn get(&self, tag_values: &[&str]) -> Result<Option<H>> {
        self.inner.get(tag_values)
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn tag_keys(&self) -> &[String] {
        self.inner.tag_keys()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
