use serde::Deserialize;

/// Declarative description of a dynamic meter, e.g. loaded from a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MeterConfig {
    pub name: String,
    #[serde(default)]
    pub tag_keys: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_unit: Option<String>,
}

impl MeterConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag_keys: Vec::new(),
            description: None,
            base_unit: None,
        }
    }
}
