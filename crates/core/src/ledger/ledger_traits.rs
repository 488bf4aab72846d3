//! Ledger executor trait.

use async_trait::async_trait;

use super::ledger_model::TradeInstruction;
use crate::errors::Result;
use crate::portfolios::Portfolio;

/// Applies an ordered batch of trade instructions to one portfolio's cash
/// and positions as a single all-or-nothing unit.
///
/// Implementations must serialize mutations per portfolio (single writer at
/// a time) and roll the whole batch back on any rejection, so concurrent
/// plan runs or manual trades never interleave partial updates. A cancelled
/// caller must observe either the fully applied batch or none of it.
#[async_trait]
pub trait LedgerExecutorTrait: Send + Sync {
    /// Executes the batch and returns the refreshed portfolio on success.
    async fn execute_batch(
        &self,
        portfolio_id: &str,
        instructions: Vec<TradeInstruction>,
    ) -> Result<Portfolio>;
}
