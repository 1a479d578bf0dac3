use crate::consts::{DEFAULT_DEBOUNCE, MAX_DEBOUNCE, MEMBERSHIP_OPERATOR};
use crate::schema::FilterSchema;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, time::Duration};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComposerConfig {
    pub debounce_ms: u64,
    /// Symbol of the operator that switches value entry into multi-select.
    pub membership_operator: String,
    /// Drop async lookup responses that a newer lookup has superseded.
    pub discard_stale_lookups: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            membership_operator: MEMBERSHIP_OPERATOR.to_string(),
            discard_stale_lookups: true,
        }
    }
}

impl ComposerConfig {
    /// Configured quiet period, clamped to [`MAX_DEBOUNCE`].
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms).min(MAX_DEBOUNCE)
    }
}

/// On-disk shape: builder settings plus the schema they apply to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposerFile {
    #[serde(default)]
    pub composer: ComposerConfig,
    pub schema: FilterSchema,
}

impl ComposerFile {
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ComposerFile = serde_json::from_str(json).context("Parse composer file failed.")?;
        file.schema
            .validate()
            .context("Composer file carries an invalid schema.")?;
        Ok(file)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)
            .with_context(|| format!("read composer file {} failed.", path.display()))?;
        Self::from_json(&json)
    }
}
