//! Portfolio service.

use std::str::FromStr;
use std::sync::Arc;

use futures::future::join_all;
use log::{debug, warn};
use rust_decimal::Decimal;

use super::portfolios_model::{
    HoldingView, NewPortfolio, Portfolio, PortfolioSnapshot, PortfolioUpdate,
};
use super::portfolios_traits::{PortfolioRepositoryTrait, PortfolioServiceTrait};
use crate::constants::{DEFAULT_BASE_CURRENCY, DEFAULT_OPENING_CASH, DEFAULT_PORTFOLIO_ID, DEFAULT_PORTFOLIO_NAME};
use crate::errors::Result;
use crate::ledger::Position;
use crate::market_data::PriceOracleTrait;
use crate::Error;

/// Service for managing portfolios.
pub struct PortfolioService {
    repository: Arc<dyn PortfolioRepositoryTrait>,
    price_oracle: Arc<dyn PriceOracleTrait>,
}

impl PortfolioService {
    /// Creates a new PortfolioService instance.
    pub fn new(
        repository: Arc<dyn PortfolioRepositoryTrait>,
        price_oracle: Arc<dyn PriceOracleTrait>,
    ) -> Self {
        Self {
            repository,
            price_oracle,
        }
    }

    /// The portfolio that is created implicitly on first access.
    fn default_portfolio() -> NewPortfolio {
        NewPortfolio {
            id: Some(DEFAULT_PORTFOLIO_ID.to_string()),
            name: DEFAULT_PORTFOLIO_NAME.to_string(),
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            // The constant is a valid literal; parsing it cannot fail.
            opening_cash: Decimal::from_str(DEFAULT_OPENING_CASH).unwrap_or(Decimal::ZERO),
        }
    }

    async fn mark_positions(&self, positions: Vec<Position>) -> Vec<HoldingView> {
        let quote_futures = positions.iter().map(|p| {
            let oracle = self.price_oracle.clone();
            let symbol = p.symbol.clone();
            async move { oracle.get_quote(&symbol).await }
        });
        let quotes = join_all(quote_futures).await;

        positions
            .iter()
            .zip(quotes)
            .map(|(position, quote)| match quote {
                Ok(q) => HoldingView::mark(position, q.price),
                Err(e) => {
                    warn!("No quote for {}: {}. Marking at cost.", position.symbol, e);
                    HoldingView::mark(position, None)
                }
            })
            .collect()
    }
}

#[async_trait::async_trait]
impl PortfolioServiceTrait for PortfolioService {
    async fn create_portfolio(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        new_portfolio.validate()?;
        debug!("Creating portfolio '{}'", new_portfolio.name);
        self.repository.create(new_portfolio).await
    }

    async fn update_portfolio(&self, update: PortfolioUpdate) -> Result<Portfolio> {
        update.validate()?;
        self.repository.update(update).await
    }

    async fn delete_portfolio(&self, portfolio_id: &str) -> Result<()> {
        self.repository.delete(portfolio_id).await?;
        Ok(())
    }

    async fn reset_portfolio(&self, portfolio_id: &str, cash_balance: Decimal) -> Result<Portfolio> {
        self.repository.reset(portfolio_id, cash_balance).await
    }

    async fn get_portfolio(&self, portfolio_id: &str) -> Result<Portfolio> {
        match self.repository.get_by_id(portfolio_id) {
            Ok(portfolio) => Ok(portfolio),
            Err(Error::NotFound(_)) | Err(Error::Database(crate::errors::DatabaseError::NotFound(_)))
                if portfolio_id == DEFAULT_PORTFOLIO_ID =>
            {
                debug!("Auto-creating default portfolio on first access");
                self.repository.create(Self::default_portfolio()).await
            }
            Err(e) => Err(e),
        }
    }

    fn list_portfolios(&self) -> Result<Vec<Portfolio>> {
        self.repository.list()
    }

    fn get_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        self.repository.list_positions(portfolio_id)
    }

    async fn get_snapshot(&self, portfolio_id: &str) -> Result<PortfolioSnapshot> {
        let portfolio = self.get_portfolio(portfolio_id).await?;
        let positions = self.repository.list_positions(&portfolio.id)?;
        let holdings = self.mark_positions(positions).await;
        Ok(PortfolioSnapshot::new(portfolio, holdings))
    }
}
