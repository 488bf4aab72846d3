//! Market data error types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("Provider error for {symbol}: {message}")]
    ProviderError { symbol: String, message: String },

    #[error("No price available for symbol {0}")]
    NoPriceAvailable(String),

    #[error("Network error: {0}")]
    NetworkError(String),
}
