//! View configuration: the single `lottie_fileName` option.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Attribute key recognised by [`LottieViewConfig::from_attributes`].
pub const FILE_NAME_ATTRIBUTE: &str = "lottie_fileName";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LottieViewConfig {
    /// Animation to load at construction.
    #[serde(rename = "lottie_fileName", default)]
    pub file_name: Option<String>,
}

impl LottieViewConfig {
    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
        }
    }

    /// Builds a config from host style attributes. Unrecognised keys are
    /// ignored; when a key repeats, the last occurrence wins.
    pub fn from_attributes<'a, I>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut config = Self::default();
        for (key, value) in attributes {
            if key == FILE_NAME_ATTRIBUTE {
                config.file_name = Some(value.to_string());
            }
        }
        config
    }

    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }
}
