//! Core business logic: pure computation plus the state gateway.

pub mod bucket;
pub mod config;
pub mod fx;
pub mod history;
pub mod ledger;
pub mod log;
pub mod model;
pub mod quote;
pub mod state;
pub mod symbology;
pub mod valuation;

// Re-export main types for cleaner imports
pub use fx::{FxRateTable, RateProvider};
pub use quote::{
    HistoryRange, OhlcBar, PricePoint, Quote, QuoteCache, QuoteProvider, QuoteSnapshot,
};
