use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use rust_decimal::Decimal;
use std::sync::Arc;

use paperdesk_core::ledger::Position;
use paperdesk_core::portfolios::{
    NewPortfolio, Portfolio, PortfolioRepositoryTrait, PortfolioUpdate,
};
use paperdesk_core::{DatabaseError, Error, Result};

use super::model::{NewPortfolioDB, PortfolioDB, PositionDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::DieselErrorExt;
use crate::schema::{portfolios, positions, trades};

pub struct PortfolioRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PortfolioRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        PortfolioRepository { pool, writer }
    }

    /// Loads a portfolio row inside a write transaction.
    pub(crate) fn get_for_update(
        conn: &mut SqliteConnection,
        portfolio_id: &str,
    ) -> Result<PortfolioDB> {
        portfolios::table
            .find(portfolio_id)
            .first::<PortfolioDB>(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    Error::NotFound(format!("Portfolio '{}' not found", portfolio_id))
                }
                other => other.into_core_error(),
            })
    }
}

#[async_trait]
impl PortfolioRepositoryTrait for PortfolioRepository {
    async fn create(&self, new_portfolio: NewPortfolio) -> Result<Portfolio> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Portfolio> {
                let now = Utc::now().to_rfc3339();
                let row = NewPortfolioDB {
                    id: new_portfolio
                        .id
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    name: new_portfolio.name,
                    base_currency: new_portfolio.base_currency.to_ascii_uppercase(),
                    cash_balance: new_portfolio.opening_cash.to_string(),
                    created_at: now.clone(),
                    updated_at: now,
                };
                let result_db = diesel::insert_into(portfolios::table)
                    .values(&row)
                    .returning(PortfolioDB::as_returning())
                    .get_result(conn)
                    .map_err(|e| e.into_core_error())?;
                Ok(Portfolio::from(result_db))
            })
            .await
    }

    async fn update(&self, update: PortfolioUpdate) -> Result<Portfolio> {
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Portfolio> {
                diesel::update(portfolios::table.find(&update.id))
                    .set((
                        portfolios::name.eq(&update.name),
                        portfolios::updated_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                let result_db = Self::get_for_update(conn, &update.id)?;
                Ok(Portfolio::from(result_db))
            })
            .await
    }

    async fn delete(&self, portfolio_id: &str) -> Result<usize> {
        let portfolio_id = portfolio_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                // Positions and trades cascade via their foreign keys.
                diesel::delete(portfolios::table.find(portfolio_id))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())
            })
            .await
    }

    async fn reset(&self, portfolio_id: &str, cash_balance: Decimal) -> Result<Portfolio> {
        let portfolio_id = portfolio_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Portfolio> {
                Self::get_for_update(conn, &portfolio_id)?;
                diesel::delete(positions::table.filter(positions::portfolio_id.eq(&portfolio_id)))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                diesel::delete(trades::table.filter(trades::portfolio_id.eq(&portfolio_id)))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                diesel::update(portfolios::table.find(&portfolio_id))
                    .set((
                        portfolios::cash_balance.eq(cash_balance.to_string()),
                        portfolios::updated_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                Ok(Portfolio::from(Self::get_for_update(conn, &portfolio_id)?))
            })
            .await
    }

    fn get_by_id(&self, portfolio_id: &str) -> Result<Portfolio> {
        let mut conn = get_connection(&self.pool)?;
        let row = portfolios::table
            .find(portfolio_id)
            .first::<PortfolioDB>(&mut conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => {
                    Error::Database(DatabaseError::NotFound(format!(
                        "Portfolio '{}' not found",
                        portfolio_id
                    )))
                }
                other => other.into_core_error(),
            })?;
        Ok(Portfolio::from(row))
    }

    fn list(&self) -> Result<Vec<Portfolio>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = portfolios::table
            .order(portfolios::created_at.asc())
            .load::<PortfolioDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;
        Ok(rows.into_iter().map(Portfolio::from).collect())
    }

    fn list_positions(&self, portfolio_id: &str) -> Result<Vec<Position>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = positions::table
            .filter(positions::portfolio_id.eq(portfolio_id))
            .order(positions::symbol.asc())
            .load::<PositionDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;
        Ok(rows.into_iter().map(Position::from).collect())
    }
}
