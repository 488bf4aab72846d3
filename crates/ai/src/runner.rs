//! The plan runner: the end-to-end state machine turning "run this
//! portfolio's LLM plan" into either a dry-run result or applied trades.
//!
//! Provider invocation, plan validation, and order pricing run inside a
//! bounded retry loop — LLM calls are flaky and cheap to redo. Execution
//! against the ledger is attempted exactly once per validated plan:
//! re-running the model after a financial-state failure risks
//! double-interpretation of the same intent, so a ledger failure is
//! reported as an unexecuted outcome, never retried.

use log::{info, warn};
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;

use paperdesk_core::ai::{
    LlmProvider, LlmProviderRepositoryTrait, PromptTemplate, PromptTemplateRepositoryTrait,
};
use paperdesk_core::ledger::{LedgerExecutorTrait, TradeInstruction};
use paperdesk_core::market_data::PriceOracleTrait;
use paperdesk_core::portfolios::{PortfolioServiceTrait, PortfolioSnapshot};
use paperdesk_core::trades::TradeSide;
use paperdesk_core::{DatabaseError, Error};

use crate::context::{ContextBuilder, PlanContext};
use crate::error::PlanError;
use crate::plan_schema::{parse_plan, ArbitragePlan, OrderAction, OrderType, PlanOrder};
use crate::providers::{ChatMessage, ChatRequest, ProviderAdapter, ProviderResponse};

/// Maximum provider attempts per run.
pub const MAX_PLAN_ATTEMPTS: u32 = 3;

/// Pause between attempts.
const RETRY_DELAY: Duration = Duration::from_millis(750);

/// Per-run overrides.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit prompt template id; falls back to the portfolio default,
    /// then to the built-in template.
    pub prompt_id: Option<String>,
    /// Explicit provider id; falls back to the prompt's linked provider,
    /// the system default, then the oldest configured provider.
    pub provider_id: Option<String>,
    /// Produce the plan and priced instructions without touching the ledger.
    pub dry_run: bool,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Prompt/response record of one run, returned for audit purposes.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanTranscript {
    pub system_prompt: String,
    pub user_prompt: String,
    pub raw_response: String,
    /// Provider attempts consumed, including the successful one.
    pub attempts: u32,
}

/// Result of a completed run.
///
/// `executed == false` with a populated `execution_error` means a validated,
/// priced plan failed at the ledger — distinct from upstream provider or
/// validation failures, which surface as [`PlanError`] instead.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRunOutcome {
    pub plan: ArbitragePlan,
    pub trades: Vec<TradeInstruction>,
    pub executed: bool,
    pub execution_error: Option<String>,
    /// Fresh snapshot after successful execution.
    pub snapshot: Option<PortfolioSnapshot>,
    pub transcript: PlanTranscript,
}

/// Orchestrates context building, provider invocation, plan validation,
/// pricing, and execution.
pub struct PlanRunner {
    context_builder: ContextBuilder,
    portfolio_service: Arc<dyn PortfolioServiceTrait>,
    provider_repository: Arc<dyn LlmProviderRepositoryTrait>,
    prompt_repository: Arc<dyn PromptTemplateRepositoryTrait>,
    price_oracle: Arc<dyn PriceOracleTrait>,
    ledger: Arc<dyn LedgerExecutorTrait>,
    adapter: Arc<dyn ProviderAdapter>,
}

impl PlanRunner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        context_builder: ContextBuilder,
        portfolio_service: Arc<dyn PortfolioServiceTrait>,
        provider_repository: Arc<dyn LlmProviderRepositoryTrait>,
        prompt_repository: Arc<dyn PromptTemplateRepositoryTrait>,
        price_oracle: Arc<dyn PriceOracleTrait>,
        ledger: Arc<dyn LedgerExecutorTrait>,
        adapter: Arc<dyn ProviderAdapter>,
    ) -> Self {
        Self {
            context_builder,
            portfolio_service,
            provider_repository,
            prompt_repository,
            price_oracle,
            ledger,
            adapter,
        }
    }

    /// Runs the full pipeline for one portfolio.
    pub async fn run_plan(
        &self,
        portfolio_id: &str,
        options: RunOptions,
    ) -> Result<PlanRunOutcome, PlanError> {
        // Fail fast on an unknown portfolio before any provider spend.
        let portfolio = self
            .portfolio_service
            .get_portfolio(portfolio_id)
            .await
            .map_err(|e| match e {
                Error::NotFound(_) | Error::Database(DatabaseError::NotFound(_)) => {
                    PlanError::PortfolioNotFound(portfolio_id.to_string())
                }
                other => PlanError::Core(other),
            })?;

        let context = self.context_builder.build(&portfolio.id).await?;
        let prompt = self.resolve_prompt(&portfolio.id, &options)?;
        let provider = self.resolve_provider(prompt.as_ref(), &options)?;

        let system_prompt = ContextBuilder::render_system_prompt(
            prompt.as_ref().and_then(|p| p.system_prompt.as_deref()),
        );
        let user_template = prompt
            .as_ref()
            .map(|p| p.user_template.as_str())
            .unwrap_or(crate::context::DEFAULT_USER_TEMPLATE);
        let user_prompt = ContextBuilder::render_user_prompt(user_template, &context)?;

        let request = ChatRequest {
            model: provider.model.clone(),
            messages: vec![
                ChatMessage::system(system_prompt.clone()),
                ChatMessage::user(user_prompt.clone()),
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            json_response: true,
        };

        let (plan, trades, response, attempts) =
            self.attempt_plan(&provider, &request, &context).await?;

        let transcript = PlanTranscript {
            system_prompt,
            user_prompt,
            raw_response: response.raw_response,
            attempts,
        };

        if options.dry_run || trades.is_empty() {
            info!(
                "Plan for portfolio {} not executed ({})",
                portfolio.id,
                if options.dry_run { "dry run" } else { "zero orders" }
            );
            return Ok(PlanRunOutcome {
                plan,
                trades,
                executed: false,
                execution_error: None,
                snapshot: None,
                transcript,
            });
        }

        // Execution is one-shot: a ledger rejection is a terminal outcome,
        // never a reason to re-invoke the model.
        match self.ledger.execute_batch(&portfolio.id, trades.clone()).await {
            Ok(_) => {
                let snapshot = self.portfolio_service.get_snapshot(&portfolio.id).await?;
                info!(
                    "Executed {} trade(s) for portfolio {}",
                    trades.len(),
                    portfolio.id
                );
                Ok(PlanRunOutcome {
                    plan,
                    trades,
                    executed: true,
                    execution_error: None,
                    snapshot: Some(snapshot),
                    transcript,
                })
            }
            Err(e) => {
                warn!("Execution failed for portfolio {}: {}", portfolio.id, e);
                Ok(PlanRunOutcome {
                    plan,
                    trades,
                    executed: false,
                    execution_error: Some(e.to_string()),
                    snapshot: None,
                    transcript,
                })
            }
        }
    }

    /// The bounded attempt loop: invoke, validate, price. Any failure
    /// consumes the attempt; exhaustion surfaces the last error.
    async fn attempt_plan(
        &self,
        provider: &LlmProvider,
        request: &ChatRequest,
        context: &PlanContext,
    ) -> Result<(ArbitragePlan, Vec<TradeInstruction>, ProviderResponse, u32), PlanError> {
        let mut last_error = PlanError::NoProviderConfigured;

        for attempt in 1..=MAX_PLAN_ATTEMPTS {
            match self.single_attempt(provider, request, context).await {
                Ok((plan, trades, response)) => {
                    return Ok((plan, trades, response, attempt));
                }
                Err(e) if e.is_retryable() && attempt < MAX_PLAN_ATTEMPTS => {
                    warn!(
                        "Plan attempt {}/{} failed: {}. Retrying.",
                        attempt, MAX_PLAN_ATTEMPTS, e
                    );
                    last_error = e;
                    tokio::time::sleep(RETRY_DELAY).await;
                }
                Err(e) => {
                    warn!(
                        "Plan attempt {}/{} failed terminally: {}",
                        attempt, MAX_PLAN_ATTEMPTS, e
                    );
                    return Err(e);
                }
            }
        }

        Err(last_error)
    }

    async fn single_attempt(
        &self,
        provider: &LlmProvider,
        request: &ChatRequest,
        context: &PlanContext,
    ) -> Result<(ArbitragePlan, Vec<TradeInstruction>, ProviderResponse), PlanError> {
        let response = self.adapter.invoke(provider, request).await?;
        let plan = parse_plan(&response.content)?;
        let trades = self.derive_instructions(&plan, context).await?;
        Ok((plan, trades, response))
    }

    /// Converts validated plan orders into priced trade instructions.
    async fn derive_instructions(
        &self,
        plan: &ArbitragePlan,
        context: &PlanContext,
    ) -> Result<Vec<TradeInstruction>, PlanError> {
        let mut instructions = Vec::with_capacity(plan.arbitrages.len());
        for order in &plan.arbitrages {
            let price = self.resolve_execution_price(order, context).await?;
            instructions.push(TradeInstruction {
                symbol: order.symbol.clone(),
                side: match order.action {
                    OrderAction::Buy => TradeSide::Buy,
                    OrderAction::Sell => TradeSide::Sell,
                },
                quantity: Decimal::from(order.quantity),
                price,
            });
        }
        Ok(instructions)
    }

    /// A limit order executes at its stated price; a market order at the
    /// live quote, falling back to the oracle's last-known value.
    async fn resolve_execution_price(
        &self,
        order: &PlanOrder,
        context: &PlanContext,
    ) -> Result<Decimal, PlanError> {
        if order.order_type == OrderType::Limit {
            return order.limit_price.ok_or_else(|| {
                // Validation already requires this; reaching here means a bug
                // upstream of the trust boundary.
                PlanError::OrderDerivation(format!(
                    "limit order for {} has no limit price",
                    order.symbol
                ))
            });
        }

        if let Some(quote) = context.quotes.get(&order.symbol) {
            if let Some(price) = quote.effective_price() {
                return Ok(price);
            }
        }

        // Symbols outside the held set have no quote in the context.
        let quote = self
            .price_oracle
            .get_quote(&order.symbol)
            .await
            .map_err(|e| PlanError::Pricing(format!("{}: {}", order.symbol, e)))?;
        quote.effective_price().ok_or_else(|| {
            PlanError::Pricing(format!(
                "no price or previous close available for {}",
                order.symbol
            ))
        })
    }

    /// Explicit override, else portfolio default, else the built-in template.
    fn resolve_prompt(
        &self,
        portfolio_id: &str,
        options: &RunOptions,
    ) -> Result<Option<PromptTemplate>, PlanError> {
        if let Some(prompt_id) = &options.prompt_id {
            let prompt = self
                .prompt_repository
                .get_by_id(prompt_id)
                .map_err(|_| PlanError::PromptNotFound(prompt_id.clone()))?;
            return Ok(Some(prompt));
        }
        Ok(self.prompt_repository.get_default_for_portfolio(portfolio_id)?)
    }

    /// Explicit override, else prompt-linked, else system default, else the
    /// oldest configured provider.
    fn resolve_provider(
        &self,
        prompt: Option<&PromptTemplate>,
        options: &RunOptions,
    ) -> Result<LlmProvider, PlanError> {
        if let Some(provider_id) = &options.provider_id {
            return self
                .provider_repository
                .get_by_id(provider_id)
                .map_err(|_| PlanError::ProviderNotFound(provider_id.clone()));
        }
        if let Some(provider_id) = prompt.and_then(|p| p.provider_id.as_deref()) {
            return self
                .provider_repository
                .get_by_id(provider_id)
                .map_err(|_| PlanError::ProviderNotFound(provider_id.to_string()));
        }
        if let Some(provider) = self.provider_repository.get_default()? {
            return Ok(provider);
        }
        self.provider_repository
            .list()?
            .into_iter()
            .next()
            .ok_or(PlanError::NoProviderConfigured)
    }
}
