use config::{Config, Environment, File};
use crate::config::LedgerConfig;
use crate::error::{Error, Result};

impl LedgerConfig {
    /// Layers `config/default`, `config/<env>` and `DAYLEDGER_*` variables
    /// (`DAYLEDGER_LEDGER__DEFAULT_CURRENCY=USD`). Every layer is optional.
    pub fn load(env: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("DAYLEDGER").separator("__"))
            .build()
            .map_err(|e| Error::ConfigError(e.to_string()))?;

        let loaded: LedgerConfig = config.try_deserialize()
            .map_err(|e| Error::ConfigError(e.to_string()))?;
        loaded.validate()?;
        Ok(loaded)
    }
}
