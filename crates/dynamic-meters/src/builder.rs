use std::sync::Arc;

use crate::{Customizer, MeterBuilder, MeterConfig, Registry};

/// A dynamic meter kind that can be assembled by [`DynamicMeterBuilder`].
pub trait DynamicKind: Sized {
    /// The builder state the kind's customizers operate on.
    type State: MeterBuilder + 'static;

    fn assemble(
        registry: Arc<Registry>,
        name: String,
        customizers: Vec<Customizer<Self::State>>,
        tag_keys: Vec<String>,
    ) -> Self;
}

/// Collects the name, tag keys and customizers for a dynamic meter of kind `M`.
pub struct DynamicMeterBuilder<M: DynamicKind> {
    registry: Arc<Registry>,
    name: String,
    customizers: Vec<Customizer<M::State>>,
    tag_keys: Vec<String>,
}

impl<M: DynamicKind> DynamicMeterBuilder<M> {
    pub fn new(registry: Arc<Registry>, name: impl Into<String>) -> Self {
        Self {
            registry,
            name: name.into(),
            customizers: Vec::new(),
            tag_keys: Vec::new(),
        }
    }

    /// Start from a configured meter: sets the tag keys and applies the
    /// configured description and base unit before any other customizer.
    pub fn from_config(registry: Arc<Registry>, config: &MeterConfig) -> Self {
        let builder = Self::new(registry, config.name.clone()).tag_keys(config.tag_keys.clone());
        if config.description.is_none() && config.base_unit.is_none() {
            return builder;
        }

        let description = config.description.clone();
        let base_unit = config.base_unit.clone();
        builder.customizer(move |mut state| {
            if let Some(description) = &description {
                state = state.description(description.clone());
            }
            if let Some(base_unit) = &base_unit {
                state = state.base_unit(base_unit.clone());
            }
            state
        })
    }

    pub fn customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(M::State) -> M::State + Send + Sync + 'static,
    {
        self.customizers
            .push(Box::new(move |state| Ok(customizer(state))));
        self
    }

    /// Adds a customizer that may fail; its error is returned from `get_or_create`.
    pub fn try_customizer<F>(mut self, customizer: F) -> Self
    where
        F: Fn(M::State) -> anyhow::Result<M::State> + Send + Sync + 'static,
    {
        self.customizers.push(Box::new(customizer));
        self
    }

    pub fn customizers(mut self, customizers: impl IntoIterator<Item = Customizer<M::State>>) -> Self {
        self.customizers.extend(customizers);
        self
    }

    pub fn tag_key(mut self, tag_key: impl Into<String>) -> Self {
        self.tag_keys.push(tag_key.into());
        self
    }

    pub fn tag_keys<K>(mut self, tag_keys: impl IntoIterator<Item = K>) -> Self
    where
        K: Into<String>,
    {
        self.tag_keys.extend(tag_keys.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> M {
        M::assemble(self.registry, self.name, self.customizers, self.tag_keys)
    }
}
