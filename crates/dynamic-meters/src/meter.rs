use metrics::{Key, Label};

use crate::Tag;

/// Settings shared by every kind of meter builder.
#[derive(Debug, Clone)]
pub struct MeterOptions {
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) base_unit: Option<String>,
    pub(crate) tags: Vec<Tag>,
}

impl MeterOptions {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            base_unit: None,
            tags: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn base_unit(&self) -> Option<&str> {
        self.base_unit.as_deref()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    /// A tag with an existing key replaces the value in place.
    fn push_tag(&mut self, tag: Tag) {
        match self.tags.iter_mut().find(|t| t.key() == tag.key()) {
            Some(existing) => *existing = tag,
            None => self.tags.push(tag),
        }
    }

    pub(crate) fn key(&self) -> Key {
        let labels: Vec<Label> = self.tags.iter().cloned().map(Label::from).collect();
        Key::from_parts(self.name.clone(), labels)
    }
}

/// Fluent setters available on every builder state, mostly used from customizers.
pub trait MeterBuilder: Sized {
    fn options(&self) -> &MeterOptions;

    fn options_mut(&mut self) -> &mut MeterOptions;

    fn description(mut self, description: impl Into<String>) -> Self {
        self.options_mut().description = Some(description.into());
        self
    }

    fn base_unit(mut self, base_unit: impl Into<String>) -> Self {
        self.options_mut().base_unit = Some(base_unit.into());
        self
    }

    fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options_mut().push_tag(Tag::new(key, value));
        self
    }

    fn tags<T>(mut self, tags: impl IntoIterator<Item = T>) -> Self
    where
        T: Into<Tag>,
    {
        for tag in tags {
            self.options_mut().push_tag(tag.into());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plain(MeterOptions);

    impl MeterBuilder for Plain {
        fn options(&self) -> &MeterOptions {
            &self.0
        }

        fn options_mut(&mut self) -> &mut MeterOptions {
            &mut self.0
        }
    }

    #[test]
    fn test_repeated_tag_key_replaces_value() {
        let b = Plain(MeterOptions::new("m"))
            .tag("a", "1")
            .tags([("b", "2"), ("a", "3")]);

        let tags: Vec<_> = b.options().tags().iter().map(|t| (t.key(), t.value())).collect();
        assert_eq!(tags, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_key_keeps_tag_order() {
        let b = Plain(MeterOptions::new("m")).tag("z", "1").tag("a", "2");
        let key = b.options().key();

        assert_eq!(key.name(), "m");
        let labels: Vec<_> = key.labels().map(|l| l.key()).collect();
        assert_eq!(labels, vec!["z", "a"]);
    }
}
