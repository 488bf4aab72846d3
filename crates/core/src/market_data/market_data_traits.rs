//! Price oracle trait.

use async_trait::async_trait;

use super::market_data_model::{Candle, HistoryInterval, HistoryRange, QuoteSnapshot};
use crate::errors::Result;

/// The external market-data source supplying quotes and historical candles.
///
/// Implementations cache internally and may fail; callers decide which
/// failures are fatal (a quote for pricing an order) and which degrade
/// softly (a single symbol's history while building context).
#[async_trait]
pub trait PriceOracleTrait: Send + Sync {
    /// Returns the current quote for a symbol.
    async fn get_quote(&self, symbol: &str) -> Result<QuoteSnapshot>;

    /// Returns historical candles, oldest first.
    async fn get_history(
        &self,
        symbol: &str,
        range: HistoryRange,
        interval: HistoryInterval,
    ) -> Result<Vec<Candle>>;
}
