//! Paperdesk AI - the LLM-driven trade-planning pipeline.
//!
//! This crate turns "run this portfolio's plan" into either a dry-run result
//! or trades applied to the ledger:
//!
//! - `providers`: one call contract across heterogeneous chat-completion
//!   backends (OpenAI-compatible, Gemini-style, Anthropic-style, local)
//! - `plan_schema`: the trust boundary turning untrusted model output into a
//!   validated arbitrage plan
//! - `context`: portfolio/market/trade context gathering and prompt rendering
//! - `runner`: the orchestrator with bounded retries and one-shot execution
//!
//! The pipeline is a pure function with respect to audit records: it returns
//! a [`runner::PlanRunOutcome`]; persisting it is the caller's concern.

pub mod context;
pub mod error;
pub mod plan_schema;
pub mod providers;
pub mod runner;


// Re-export main types for convenience
pub use context::{ContextBuilder, PlanContext, BASE_SYSTEM_PROMPT, DEFAULT_USER_TEMPLATE};
pub use error::PlanError;
pub use plan_schema::{
    extract_json_candidate, parse_plan, plan_json_schema, ArbitragePlan, OrderAction, OrderType,
    PlanOrder, MAX_PLAN_ORDERS, PLAN_SCHEMA_VERSION,
};
pub use providers::{
    build_chat_completions_url, ChatMessage, ChatRequest, ChatRole, ProviderAdapter,
    ProviderInvoker, ProviderResponse,
};
pub use runner::{PlanRunOutcome, PlanRunner, PlanTranscript, RunOptions, MAX_PLAN_ATTEMPTS};
