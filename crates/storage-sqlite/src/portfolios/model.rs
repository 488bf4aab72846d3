//! Database models for portfolios and positions.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use paperdesk_core::ledger::Position;
use paperdesk_core::portfolios::Portfolio;

/// Parses a TEXT decimal column, falling back to zero on corruption.
pub(crate) fn parse_decimal_column(value: &str, column: &str) -> Decimal {
    Decimal::from_str(value).unwrap_or_else(|e| {
        log::error!("Failed to parse {} '{}' as Decimal: {}", column, value, e);
        Decimal::ZERO
    })
}

/// Parses an RFC 3339 TEXT timestamp column, falling back to the epoch.
pub(crate) fn parse_timestamp_column(value: &str, column: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::error!("Failed to parse {} '{}' as timestamp: {}", column, value, e);
            DateTime::<Utc>::UNIX_EPOCH
        })
}

/// Database model for portfolios.
#[derive(
    Queryable, Identifiable, AsChangeset, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::portfolios)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDB {
    pub id: String,
    pub name: String,
    pub base_currency: String,
    pub cash_balance: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Database model for creating a new portfolio.
#[derive(Insertable, Serialize, Deserialize, Debug, Clone)]
#[diesel(table_name = crate::schema::portfolios)]
#[serde(rename_all = "camelCase")]
pub struct NewPortfolioDB {
    pub id: String,
    pub name: String,
    pub base_currency: String,
    pub cash_balance: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Database model for positions (composite key: portfolio + symbol).
#[derive(
    Insertable, Queryable, Identifiable, AsChangeset, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::positions)]
#[diesel(primary_key(portfolio_id, symbol))]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PositionDB {
    pub portfolio_id: String,
    pub symbol: String,
    pub quantity: String,
    pub average_price: String,
}

// Conversion to domain models

impl From<PortfolioDB> for Portfolio {
    fn from(db: PortfolioDB) -> Self {
        Self {
            cash_balance: parse_decimal_column(&db.cash_balance, "portfolios.cash_balance"),
            created_at: parse_timestamp_column(&db.created_at, "portfolios.created_at"),
            updated_at: parse_timestamp_column(&db.updated_at, "portfolios.updated_at"),
            id: db.id,
            name: db.name,
            base_currency: db.base_currency,
        }
    }
}

impl From<PositionDB> for Position {
    fn from(db: PositionDB) -> Self {
        Self {
            quantity: parse_decimal_column(&db.quantity, "positions.quantity"),
            average_price: parse_decimal_column(&db.average_price, "positions.average_price"),
            portfolio_id: db.portfolio_id,
            symbol: db.symbol,
        }
    }
}

impl From<&Position> for PositionDB {
    fn from(position: &Position) -> Self {
        Self {
            portfolio_id: position.portfolio_id.clone(),
            symbol: position.symbol.clone(),
            quantity: position.quantity.to_string(),
            average_price: position.average_price.to_string(),
        }
    }
}
