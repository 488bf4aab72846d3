//! Plan context building and prompt rendering.
//!
//! Gathers everything the model needs to reason about a trade decision —
//! portfolio snapshot, live quotes, recent history per held symbol, recent
//! trades — and renders it into the system and user prompt strings actually
//! sent. A single symbol's history outage degrades to an empty series; it
//! must never abort the whole context build.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use log::warn;
use std::collections::HashMap;
use std::sync::Arc;

use paperdesk_core::constants::{CONTEXT_MAX_CANDLES, CONTEXT_RECENT_TRADES};
use paperdesk_core::market_data::{Candle, HistoryInterval, HistoryRange, PriceOracleTrait, QuoteSnapshot};
use paperdesk_core::portfolios::{PortfolioServiceTrait, PortfolioSnapshot};
use paperdesk_core::trades::{Trade, TradeRepositoryTrait};

use crate::error::PlanError;
use crate::plan_schema::plan_json_schema;

/// Fixed base instruction prepended to every system prompt.
pub const BASE_SYSTEM_PROMPT: &str = "\
You are a trading assistant for a simulated (paper-trading) portfolio. \
Respond with a single JSON object that validates against the provided plan \
schema. Do not wrap the JSON in code fences and do not add any prose before \
or after it. Propose only trades you can justify from the supplied data. \
Never size BUY orders beyond the available cash balance; leave headroom of \
about 0.10% for fees and slippage. If no action is warranted, return an \
empty arbitrages array.";

/// Built-in user template used when a portfolio has no prompt configured.
pub const DEFAULT_USER_TEMPLATE: &str = "\
Current time: {timestamp}
Base currency: {base_currency}
Cash balance: {cash_balance}

Portfolio snapshot:
{portfolio_json}

Latest quotes for held symbols:
{quotes_json}

Recent daily history per held symbol:
{history_json}

Recent trades:
{trades_json}

Respond with JSON matching this schema:
{schema_json}";

/// Everything gathered for one plan run.
#[derive(Debug, Clone)]
pub struct PlanContext {
    pub snapshot: PortfolioSnapshot,
    pub quotes: HashMap<String, QuoteSnapshot>,
    pub histories: HashMap<String, Vec<Candle>>,
    pub recent_trades: Vec<Trade>,
    pub as_of: DateTime<Utc>,
}

/// Builds plan contexts and renders prompts.
pub struct ContextBuilder {
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    trade_repository: Arc<dyn TradeRepositoryTrait>,
    price_oracle: Arc<dyn PriceOracleTrait>,
}

impl ContextBuilder {
    pub fn new(
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        trade_repository: Arc<dyn TradeRepositoryTrait>,
        price_oracle: Arc<dyn PriceOracleTrait>,
    ) -> Self {
        Self {
            portfolio_service,
            trade_repository,
            price_oracle,
        }
    }

    /// Gathers the full context for a portfolio.
    ///
    /// Quotes and histories for all held symbols are fetched concurrently
    /// and joined before returning.
    pub async fn build(&self, portfolio_id: &str) -> Result<PlanContext, PlanError> {
        let snapshot = self.portfolio_service.get_snapshot(portfolio_id).await?;
        let symbols = snapshot.held_symbols();

        let fetches = symbols.iter().map(|symbol| {
            let oracle = self.price_oracle.clone();
            let symbol = symbol.clone();
            async move {
                let quote = oracle.get_quote(&symbol).await;
                let history = oracle
                    .get_history(&symbol, HistoryRange::ThreeMonths, HistoryInterval::Daily)
                    .await;
                (symbol, quote, history)
            }
        });

        let mut quotes = HashMap::new();
        let mut histories = HashMap::new();
        for (symbol, quote, history) in join_all(fetches).await {
            match quote {
                Ok(q) => {
                    quotes.insert(symbol.clone(), q);
                }
                Err(e) => warn!("Quote fetch failed for {}: {}", symbol, e),
            }
            match history {
                Ok(mut candles) => {
                    if candles.len() > CONTEXT_MAX_CANDLES {
                        candles = candles.split_off(candles.len() - CONTEXT_MAX_CANDLES);
                    }
                    histories.insert(symbol, candles);
                }
                Err(e) => {
                    warn!(
                        "History fetch failed for {}: {}. Substituting empty series.",
                        symbol, e
                    );
                    histories.insert(symbol, Vec::new());
                }
            }
        }

        let recent_trades = self
            .trade_repository
            .list_recent(portfolio_id, CONTEXT_RECENT_TRADES)?;

        Ok(PlanContext {
            snapshot,
            quotes,
            histories,
            recent_trades,
            as_of: Utc::now(),
        })
    }

    /// The system prompt: fixed base instruction plus the portfolio-specific
    /// fragment when one is configured.
    pub fn render_system_prompt(fragment: Option<&str>) -> String {
        match fragment {
            Some(extra) if !extra.trim().is_empty() => {
                format!("{}\n\n{}", BASE_SYSTEM_PROMPT, extra.trim())
            }
            _ => BASE_SYSTEM_PROMPT.to_string(),
        }
    }

    /// Renders a user template by substituting named placeholders.
    ///
    /// Unresolved placeholders are left verbatim.
    pub fn render_user_prompt(
        template: &str,
        context: &PlanContext,
    ) -> Result<String, PlanError> {
        let portfolio = &context.snapshot.portfolio;

        let portfolio_json = to_pretty_json(&context.snapshot)?;
        let quotes_json = to_pretty_json(&context.quotes)?;
        let history_json = to_pretty_json(&context.histories)?;
        let trades_json = to_pretty_json(&context.recent_trades)?;
        let schema_json = serde_json::to_string_pretty(&plan_json_schema())
            .map_err(|e| PlanError::Core(e.into()))?;

        let substitutions: [(&str, String); 8] = [
            ("{timestamp}", context.as_of.to_rfc3339()),
            ("{base_currency}", portfolio.base_currency.clone()),
            ("{cash_balance}", format!("{:.2}", portfolio.cash_balance)),
            ("{portfolio_json}", portfolio_json),
            ("{quotes_json}", quotes_json),
            ("{history_json}", history_json),
            ("{trades_json}", trades_json),
            ("{schema_json}", schema_json),
        ];

        let mut rendered = template.to_string();
        for (placeholder, value) in substitutions {
            rendered = rendered.replace(placeholder, &value);
        }
        Ok(rendered)
    }
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, PlanError> {
    serde_json::to_string_pretty(value).map_err(|e| PlanError::Core(e.into()))
}
