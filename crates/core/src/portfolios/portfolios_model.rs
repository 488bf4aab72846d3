//! Portfolio domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::ledger::Position;
use crate::{Error, Result};

/// Domain model representing a simulated portfolio.
///
/// The cash balance is an exact decimal and is only ever mutated through the
/// ledger executor; it must never go negative as the result of a BUY.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Portfolio {
    pub id: String,
    pub name: String,
    /// ISO 4217 three-letter code, e.g. "USD".
    pub base_currency: String,
    pub cash_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input model for creating a new portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolio {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub base_currency: String,
    pub opening_cash: Decimal,
}

impl NewPortfolio {
    /// Validates the new portfolio data.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Portfolio name cannot be empty".to_string(),
            )));
        }
        if self.base_currency.len() != 3 || !self.base_currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Base currency must be a 3-letter code, got '{}'",
                self.base_currency
            ))));
        }
        if self.opening_cash.is_sign_negative() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Opening cash cannot be negative".to_string(),
            )));
        }
        Ok(())
    }
}

/// Input model for renaming a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioUpdate {
    pub id: String,
    pub name: String,
}

impl PortfolioUpdate {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Portfolio name cannot be empty".to_string(),
            )));
        }
        Ok(())
    }
}

/// A position enriched with live mark-to-market data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingView {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    /// Latest market price; falls back to the average cost when no quote
    /// is available.
    pub market_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
}

impl HoldingView {
    /// Marks a position at the given price, or at cost when none is known.
    pub fn mark(position: &Position, market_price: Option<Decimal>) -> Self {
        let price = market_price.unwrap_or(position.average_price);
        let market_value = position.quantity * price;
        let cost_basis = position.quantity * position.average_price;
        Self {
            symbol: position.symbol.clone(),
            quantity: position.quantity,
            average_price: position.average_price,
            market_price: price,
            market_value,
            unrealized_pnl: market_value - cost_basis,
        }
    }
}

/// A point-in-time view of a portfolio: cash plus marked positions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub portfolio: Portfolio,
    pub holdings: Vec<HoldingView>,
    /// Cash plus the market value of all holdings.
    pub total_equity: Decimal,
    pub as_of: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn new(portfolio: Portfolio, holdings: Vec<HoldingView>) -> Self {
        let positions_value: Decimal = holdings.iter().map(|h| h.market_value).sum();
        let total_equity = portfolio.cash_balance + positions_value;
        Self {
            portfolio,
            holdings,
            total_equity,
            as_of: Utc::now(),
        }
    }

    /// Distinct symbols currently held, in holding order.
    pub fn held_symbols(&self) -> Vec<String> {
        let mut symbols: Vec<String> = Vec::with_capacity(self.holdings.len());
        for holding in &self.holdings {
            if !symbols.contains(&holding.symbol) {
                symbols.push(holding.symbol.clone());
            }
        }
        symbols
    }
}
