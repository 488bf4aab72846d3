//! Trades module - the append-only trade ledger entries.

mod trades_model;
mod trades_traits;

// Re-export the public interface
pub use trades_model::{NewTrade, Trade, TradeSide};
pub use trades_traits::TradeRepositoryTrait;
