//! Database models for trades.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use paperdesk_core::trades::{Trade, TradeSide};

use crate::portfolios::model::{parse_decimal_column, parse_timestamp_column};

/// Database model for the append-only trade ledger.
#[derive(Insertable, Queryable, Identifiable, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::trades)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct TradeDB {
    pub id: String,
    pub portfolio_id: String,
    pub symbol: String,
    pub side: String,
    pub quantity: String,
    pub price: String,
    pub executed_at: String,
}

impl From<TradeDB> for Trade {
    fn from(db: TradeDB) -> Self {
        Self {
            side: TradeSide::from_str(&db.side).unwrap_or_else(|_| {
                log::error!("Unknown trades.side '{}', treating as BUY", db.side);
                TradeSide::Buy
            }),
            quantity: parse_decimal_column(&db.quantity, "trades.quantity"),
            price: parse_decimal_column(&db.price, "trades.price"),
            executed_at: parse_timestamp_column(&db.executed_at, "trades.executed_at"),
            id: db.id,
            portfolio_id: db.portfolio_id,
            symbol: db.symbol,
        }
    }
}
