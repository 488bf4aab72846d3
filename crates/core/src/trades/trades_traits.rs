//! Trade repository trait.
//!
//! Read side only: trades are appended by the ledger executor inside its
//! transaction, never through this trait.

use super::trades_model::Trade;
use crate::errors::Result;

pub trait TradeRepositoryTrait: Send + Sync {
    /// Lists all trades of a portfolio, most recent first.
    fn list(&self, portfolio_id: &str) -> Result<Vec<Trade>>;

    /// Lists the most recent trades of a portfolio, newest first.
    fn list_recent(&self, portfolio_id: &str, limit: usize) -> Result<Vec<Trade>>;
}
