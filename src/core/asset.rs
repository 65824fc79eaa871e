use serde::{Deserialize, Serialize};
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AssetClass {
    Domestic,
    ForeignEquity,
    Crypto,
}

impl AssetClass {
    pub const ALL: [AssetClass; 3] = [
        AssetClass::Domestic,
        AssetClass::ForeignEquity,
        AssetClass::Crypto,
    ];

    /// Domestic assets are quoted in the reporting currency.
    pub fn forces_unit_fx(&self) -> bool {
        matches!(self, AssetClass::Domestic)
    }

    /// Returns display name and emoji for the class
    pub fn display_info(&self) -> (&'static str, &'static str) {
        match self {
            AssetClass::Domestic => ("Domestic", "🏠"),
            AssetClass::ForeignEquity => ("Foreign Equity", "🌐"),
            AssetClass::Crypto => ("Crypto", "🪙"),
        }
    }
}

impl Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_info().0)
    }
}

/// Ticker naming conventions used to derive an [`AssetClass`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRules {
    #[serde(default = "default_domestic_suffixes")]
    pub domestic_suffixes: Vec<String>,
    #[serde(default = "default_crypto_suffixes")]
    pub crypto_suffixes: Vec<String>,
}

fn default_domestic_suffixes() -> Vec<String> {
    vec![".AX".to_string()]
}

fn default_crypto_suffixes() -> Vec<String> {
    vec!["-USD".to_string()]
}

impl Default for ClassificationRules {
    fn default() -> Self {
        ClassificationRules {
            domestic_suffixes: default_domestic_suffixes(),
            crypto_suffixes: default_crypto_suffixes(),
        }
    }
}

impl ClassificationRules {
    pub fn classify(&self, ticker: &str) -> AssetClass {
        let upper = ticker.to_uppercase();
        let matches = |suffixes: &[String]| {
            suffixes
                .iter()
                .any(|suffix| upper.ends_with(&suffix.to_uppercase()))
        };

        if matches(&self.domestic_suffixes) {
            AssetClass::Domestic
        } else if matches(&self.crypto_suffixes) {
            AssetClass::Crypto
        } else {
            AssetClass::ForeignEquity
        }
    }
}
