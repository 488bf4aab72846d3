//! Ledger domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::trades::TradeSide;

/// A position held by a portfolio, keyed by (portfolio, symbol).
///
/// Quantity is strictly positive while the row exists; a position whose
/// quantity reaches exactly zero is deleted, not retained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub portfolio_id: String,
    pub symbol: String,
    pub quantity: Decimal,
    /// Quantity-weighted average cost basis. SELLs never change it.
    pub average_price: Decimal,
}

/// A priced, normalized order ready for ledger application.
///
/// Produced either from direct user input or from a validated plan order.
/// Ephemeral: not persisted on its own, only as the `Trade` it becomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeInstruction {
    pub symbol: String,
    pub side: TradeSide,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl TradeInstruction {
    /// Trade notional = quantity x price, in exact decimal arithmetic.
    pub fn notional(&self) -> Decimal {
        self.quantity * self.price
    }
}
