//! Core valuation engine

pub mod asset;
pub mod config;
pub mod figure;
pub mod history;
pub mod inflation;
pub mod ledger;
pub mod log;
pub mod oracle;
pub mod portfolio;
pub mod position;
pub mod replay;
pub mod returns;
pub mod series;

// Re-export main types for cleaner imports
pub use asset::{AssetClass, ClassificationRules};
pub use figure::Figure;
pub use ledger::{Action, LedgerError, LedgerRecord};
pub use oracle::{CurrencyPair, MarketData, PriceOracle, SeriesSource};
pub use portfolio::{Partition, PartitionTotals, Portfolio, PortfolioTotals, PositionReport};
pub use position::Position;
pub use replay::{ReplaySettings, Valuation, replay};
