use diesel::prelude::*;
use std::sync::Arc;

use paperdesk_core::trades::{Trade, TradeRepositoryTrait};
use paperdesk_core::Result;

use super::model::TradeDB;
use crate::db::{get_connection, DbPool};
use crate::errors::DieselErrorExt;
use crate::schema::trades;

pub struct TradeRepository {
    pool: Arc<DbPool>,
}

impl TradeRepository {
    pub fn new(pool: Arc<DbPool>) -> Self {
        TradeRepository { pool }
    }
}

impl TradeRepositoryTrait for TradeRepository {
    fn list(&self, portfolio_id: &str) -> Result<Vec<Trade>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = trades::table
            .filter(trades::portfolio_id.eq(portfolio_id))
            .order(trades::executed_at.desc())
            .load::<TradeDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;
        Ok(rows.into_iter().map(Trade::from).collect())
    }

    fn list_recent(&self, portfolio_id: &str, limit: usize) -> Result<Vec<Trade>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = trades::table
            .filter(trades::portfolio_id.eq(portfolio_id))
            .order(trades::executed_at.desc())
            .limit(limit as i64)
            .load::<TradeDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;
        Ok(rows.into_iter().map(Trade::from).collect())
    }
}
