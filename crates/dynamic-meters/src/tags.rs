use std::fmt::{self, Display};

use metrics::Label;

/// A single dimension attached to a meter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Tag {
    key: String,
    value: String,
}

impl Tag {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

impl<K, V> From<(K, V)> for Tag
where
    K: Into<String>,
    V: Into<String>,
{
    fn from((key, value): (K, V)) -> Self {
        Self::new(key, value)
    }
}

impl From<Tag> for Label {
    fn from(tag: Tag) -> Self {
        Label::new(tag.key, tag.value)
    }
}

/// Pairs each declared key with the value at the same position.
pub(crate) fn zip_tags(keys: &[String], values: &[&str]) -> Vec<Tag> {
    keys.iter()
        .zip(values)
        .map(|(key, value)| Tag::new(key.as_str(), *value))
        .collect()
}
