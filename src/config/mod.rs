use serde::{Deserialize, Serialize};
use crate::error::{Error, Result};
use crate::types::money::Currency;

pub mod loader;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub storage: StorageConfig,
    pub ledger: LedgerSettings,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Folder in the backing store that holds every day-file.
    pub folder_name: String,
    /// Name written into `signature.signer`. Defaults to the user identity.
    pub signer_id: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            folder_name: "ledger".to_string(),
            signer_id: None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LedgerSettings {
    pub default_currency: String,
    pub history_page_size: usize,
    /// Offset applied to UTC when deciding which calendar day an append
    /// belongs to.
    pub utc_offset_minutes: i32,
    pub legacy_migration: bool,
    pub fallback_to_session_chain: bool,
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            default_currency: "TWD".to_string(),
            history_page_size: 50,
            utc_offset_minutes: 0,
            legacy_migration: true,
            fallback_to_session_chain: true,
        }
    }
}

impl LedgerSettings {
    pub fn default_currency(&self) -> Result<Currency> {
        Currency::new(&self.default_currency)
            .map_err(|e| Error::ConfigError(format!("ledger.default_currency: {}", e)))
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl LedgerConfig {
    /// Parses a single TOML document. Missing sections fall back to defaults.
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: LedgerConfig = toml::from_str(document)
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.ledger.default_currency()?;
        if self.storage.folder_name.trim().is_empty() {
            return Err(Error::ConfigError("storage.folder_name must not be empty".to_string()));
        }
        if self.ledger.history_page_size == 0 {
            return Err(Error::ConfigError("ledger.history_page_size must be at least 1".to_string()));
        }
        // Real-world offsets stay within +/- 14h.
        if self.ledger.utc_offset_minutes.abs() > 14 * 60 {
            return Err(Error::ConfigError(format!(
                "ledger.utc_offset_minutes out of range: {}",
                self.ledger.utc_offset_minutes
            )));
        }
        Ok(())
    }
}
