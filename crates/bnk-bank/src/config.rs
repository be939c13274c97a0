use std::path::Path;

use bnk_format::DEFAULT_ALIGNMENT;
use serde::{Deserialize, Serialize};

use crate::error::{BankError, BankResult};

/// Settings for loading and saving a bank.
///
/// Passed explicitly into [`crate::BankMutator`]; nothing here is global.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Start alignment of objects inside `DATA`. Must be a power of two.
    pub alignment: u32,
    /// Whether `save` snapshots the existing target to `<path>.NNN` first.
    pub create_backups: bool,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            alignment: DEFAULT_ALIGNMENT,
            create_backups: true,
        }
    }
}

impl BankConfig {
    pub fn with_alignment(mut self, alignment: u32) -> Self {
        self.alignment = alignment;
        self
    }

    pub fn without_backups(mut self) -> Self {
        self.create_backups = false;
        self
    }

    /// Parse from TOML text and validate.
    pub fn from_toml_str(text: &str) -> BankResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| BankError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> BankResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| BankError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> BankResult<()> {
        if !self.alignment.is_power_of_two() {
            return Err(BankError::Config(format!(
                "alignment must be a non-zero power of two, got {}",
                self.alignment
            )));
        }
        Ok(())
    }
}
