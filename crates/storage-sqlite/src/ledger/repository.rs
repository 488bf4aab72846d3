//! The ledger executor.
//!
//! Applies an ordered batch of trade instructions to one portfolio as a
//! single all-or-nothing unit. The batch runs as one job on the writer
//! actor, i.e. inside one immediate transaction on the sole write
//! connection: mutations on a portfolio are serialized, and any rejection
//! (insufficient cash, oversell, missing position) rolls back every
//! position change, trade row, and the cash update at once.

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use log::debug;
use uuid::Uuid;

use paperdesk_core::ledger::{
    apply_instruction, LedgerExecutorTrait, LedgerState, Position, TradeInstruction,
};
use paperdesk_core::portfolios::Portfolio;
use paperdesk_core::{Error, Result};

use crate::db::WriteHandle;
use crate::errors::DieselErrorExt;
use crate::portfolios::model::PositionDB;
use crate::portfolios::repository::PortfolioRepository;
use crate::schema::{portfolios, positions, trades};
use crate::trades::model::TradeDB;

pub struct LedgerRepository {
    writer: WriteHandle,
}

impl LedgerRepository {
    pub fn new(writer: WriteHandle) -> Self {
        LedgerRepository { writer }
    }

    fn load_positions(conn: &mut SqliteConnection, portfolio_id: &str) -> Result<Vec<Position>> {
        let rows = positions::table
            .filter(positions::portfolio_id.eq(portfolio_id))
            .load::<PositionDB>(conn)
            .map_err(|e| e.into_core_error())?;
        Ok(rows.into_iter().map(Position::from).collect())
    }

    fn persist_state(
        conn: &mut SqliteConnection,
        portfolio_id: &str,
        before: &[Position],
        state: &LedgerState,
    ) -> Result<()> {
        // Positions that were fully sold no longer exist in the state.
        for position in before {
            if !state.positions.contains_key(&position.symbol) {
                diesel::delete(
                    positions::table
                        .filter(positions::portfolio_id.eq(portfolio_id))
                        .filter(positions::symbol.eq(&position.symbol)),
                )
                .execute(conn)
                .map_err(|e| e.into_core_error())?;
            }
        }

        for position in state.positions.values() {
            let row = PositionDB::from(position);
            diesel::insert_into(positions::table)
                .values(&row)
                .on_conflict((positions::portfolio_id, positions::symbol))
                .do_update()
                .set((
                    positions::quantity.eq(&row.quantity),
                    positions::average_price.eq(&row.average_price),
                ))
                .execute(conn)
                .map_err(|e| e.into_core_error())?;
        }

        Ok(())
    }

    fn append_trades(
        conn: &mut SqliteConnection,
        portfolio_id: &str,
        instructions: &[TradeInstruction],
    ) -> Result<()> {
        let executed_at = Utc::now().to_rfc3339();
        let rows: Vec<TradeDB> = instructions
            .iter()
            .map(|instruction| TradeDB {
                id: Uuid::new_v4().to_string(),
                portfolio_id: portfolio_id.to_string(),
                symbol: instruction.symbol.clone(),
                side: instruction.side.to_string(),
                quantity: instruction.quantity.to_string(),
                price: instruction.price.to_string(),
                executed_at: executed_at.clone(),
            })
            .collect();
        diesel::insert_into(trades::table)
            .values(&rows)
            .execute(conn)
            .map_err(|e| e.into_core_error())?;
        Ok(())
    }
}

#[async_trait]
impl LedgerExecutorTrait for LedgerRepository {
    async fn execute_batch(
        &self,
        portfolio_id: &str,
        instructions: Vec<TradeInstruction>,
    ) -> Result<Portfolio> {
        let portfolio_id = portfolio_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<Portfolio> {
                let portfolio_db = PortfolioRepository::get_for_update(conn, &portfolio_id)?;
                let portfolio = Portfolio::from(portfolio_db);
                let before = Self::load_positions(conn, &portfolio_id)?;

                let mut state = LedgerState::new(portfolio.cash_balance, before.clone());
                for instruction in &instructions {
                    apply_instruction(&mut state, &portfolio_id, instruction)
                        .map_err(Error::Ledger)?;
                }

                Self::persist_state(conn, &portfolio_id, &before, &state)?;
                Self::append_trades(conn, &portfolio_id, &instructions)?;

                diesel::update(portfolios::table.find(&portfolio_id))
                    .set((
                        portfolios::cash_balance.eq(state.cash_balance.to_string()),
                        portfolios::updated_at.eq(Utc::now().to_rfc3339()),
                    ))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;

                debug!(
                    "Applied {} trade(s) to portfolio {}, cash now {}",
                    instructions.len(),
                    portfolio_id,
                    state.cash_balance
                );

                let refreshed = PortfolioRepository::get_for_update(conn, &portfolio_id)?;
                Ok(Portfolio::from(refreshed))
            })
            .await
    }
}
