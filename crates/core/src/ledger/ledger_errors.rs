//! Ledger error types.

use thiserror::Error;

/// Errors raised while applying trade instructions to a portfolio.
///
/// Any of these aborts the whole batch; the storage layer rolls the
/// enclosing transaction back so no partial state is ever visible.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient cash balance")]
    InsufficientCash,

    #[error("Cannot sell more shares than currently held")]
    Oversell,

    #[error("Cannot sell a position that does not exist")]
    NoPosition,

    #[error("Trade quantity must be positive, got {0}")]
    InvalidQuantity(rust_decimal::Decimal),

    #[error("Trade price must be positive, got {0}")]
    InvalidPrice(rust_decimal::Decimal),
}
