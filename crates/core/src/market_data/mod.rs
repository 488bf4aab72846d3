//! Market data module - the price oracle contract.
//!
//! The quote/history fetching and caching layer is an external collaborator;
//! this module only defines the models and the trait it is consumed through.

mod market_data_errors;
mod market_data_model;
mod market_data_traits;

// Re-export the public interface
pub use market_data_errors::MarketDataError;
pub use market_data_model::{Candle, HistoryInterval, HistoryRange, QuoteSnapshot};
pub use market_data_traits::PriceOracleTrait;
