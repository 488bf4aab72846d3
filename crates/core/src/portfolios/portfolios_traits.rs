//! Portfolio repository and service traits.
//!
//! These traits define the contract for portfolio operations without any
//! database-specific types, allowing for different storage implementations.

use async_trait::async_trait;

use super::portfolios_model::{NewPortfolio, Portfolio, PortfolioSnapshot, PortfolioUpdate};
use crate::errors::Result;
use crate::ledger::Position;

/// Trait defining the contract for Portfolio repository operations.
///
/// Implementations of this trait handle persistence of portfolio data.
/// Invariants on cash and positions are enforced by the ledger executor,
/// not by the store.
#[async_trait]
pub trait PortfolioRepositoryTrait: Send + Sync {
    /// Creates a new portfolio.
    async fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio>;

    /// Renames an existing portfolio.
    async fn update(&self, update: PortfolioUpdate) -> Result<Portfolio>;

    /// Deletes a portfolio, cascading to its positions and trades.
    async fn delete(&self, portfolio_id: &str) -> Result<usize>;

    /// Deletes all positions and trades and restores the given cash balance.
    async fn reset(&self, portfolio_id: &str, cash_balance: rust_decimal::Decimal) -> Result<Portfolio>;

    /// Retrieves a portfolio by its ID.
    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio>;

    /// Lists all portfolios.
    fn list(&self) -> Result<Vec<Portfolio>>;

    /// Lists the positions belonging to a portfolio.
    fn list_positions(&self, portfolio_id: &str) -> Result<Vec<Position>>;
}

/// Trait defining the contract for Portfolio service operations.
#[async_trait]
pub trait PortfolioServiceTrait: Send + Sync {
    /// Creates a new portfolio with business validation.
    async fn create_portfolio(&self, new_portfolio: NewPortfolio) -> Result<Portfolio>;

    /// Renames an existing portfolio.
    async fn update_portfolio(&self, update: PortfolioUpdate) -> Result<Portfolio>;

    /// Deletes a portfolio and everything belonging to it.
    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<()>;

    /// Clears positions/trades and restores the opening cash balance.
    async fn reset_portfolio(&self, portfolio_id: &str, cash_balance: rust_decimal::Decimal) -> Result<Portfolio>;

    /// Retrieves a portfolio, auto-creating the well-known default when its
    /// identifier is requested for the first time.
    async fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio>;

    /// Lists all portfolios.
    fn list_portfolios(&self) -> Result<Vec<Portfolio>>;

    /// Lists the raw positions of a portfolio.
    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>>;

    /// Builds a mark-to-market snapshot of the portfolio using the price
    /// oracle; symbols without a quote mark at their average cost.
    async fn get_snapshot(&self, portfolio_id: &str) -> Result<PortfolioSnapshot>;
}
