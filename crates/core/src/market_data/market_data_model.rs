//! Market data domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Current quote for a symbol as reported by the price oracle.
///
/// `price` may be null outside market hours or for stale symbols; consumers
/// fall back to `previous_close` where a price is required.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub price: Option<Decimal>,
    pub previous_close: Option<Decimal>,
    pub change: Option<Decimal>,
    pub change_percent: Option<Decimal>,
    pub currency: Option<String>,
    /// Provider market state tag, e.g. "REGULAR", "CLOSED".
    pub market_state: Option<String>,
    pub as_of: DateTime<Utc>,
}

impl QuoteSnapshot {
    /// Best-effort tradable price: current price, else previous close.
    pub fn effective_price(&self) -> Option<Decimal> {
        self.price.or(self.previous_close)
    }
}

/// One historical daily candle. Providers may omit individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candle {
    pub date: NaiveDate,
    pub open: Option<Decimal>,
    pub high: Option<Decimal>,
    pub low: Option<Decimal>,
    pub close: Option<Decimal>,
    pub volume: Option<u64>,
}

/// Lookback window for a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
}

/// Candle resolution for a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HistoryInterval {
    Daily,
    Weekly,
}
