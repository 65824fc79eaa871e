use crate::core::asset::ClassificationRules;
use crate::core::oracle::CurrencyPair;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

fn default_currency() -> String {
    "AUD".to_string()
}

fn default_foreign_currency() -> String {
    "USD".to_string()
}

fn default_max_staleness_days() -> i64 {
    5
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DataConfig {
    /// Ledger CSV with `Date,Ticker,Action,Units,Price,FX_Rate` columns.
    pub ledger: PathBuf,
    /// Directory holding one `Date,Close` CSV per ticker and per currency pair.
    pub prices_dir: PathBuf,
    /// Optional `Date,Index` CSV of the reporting locale's CPI.
    pub cpi: Option<PathBuf>,
    /// Optional daily value history written by `track`.
    pub history: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub data: DataConfig,
    /// Reporting currency.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Currency non-domestic assets are quoted in.
    #[serde(default = "default_foreign_currency")]
    pub foreign_currency: String,
    #[serde(default)]
    pub classification: ClassificationRules,
    #[serde(default = "default_max_staleness_days")]
    pub max_staleness_days: i64,
    pub data_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "foliotrack", "foliotrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "foliotrack", "foliotrack")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Where `track` keeps the value history.
    pub fn history_path(&self) -> Result<PathBuf> {
        match &self.data.history {
            Some(path) => Ok(path.clone()),
            None => Ok(self.default_data_path()?.join("history.csv")),
        }
    }

    /// Rate converting foreign quotes into the reporting currency.
    pub fn currency_pair(&self) -> CurrencyPair {
        CurrencyPair::new(&self.foreign_currency, &self.currency)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        // Relative data paths are relative to the config file.
        if let Some(base) = path.as_ref().parent() {
            config.data.resolve_relative_to(base);
        }
        debug!("Successfully loaded config");
        Ok(config)
    }
}

impl DataConfig {
    fn resolve_relative_to(&mut self, base: &std::path::Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.ledger);
        resolve(&mut self.prices_dir);
        if let Some(cpi) = self.cpi.as_mut() {
            resolve(cpi);
        }
        if let Some(history) = self.history.as_mut() {
            resolve(history);
        }
    }
}
