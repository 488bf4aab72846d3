//! Plan pipeline error types.

use paperdesk_core::Error as CoreError;
use thiserror::Error;

/// Errors raised by the trade-planning pipeline.
///
/// The taxonomy splits along retry behavior: configuration errors surface
/// immediately; provider/extraction/pricing errors are consumed by the
/// runner's bounded attempt loop, since a fresh model attempt may succeed;
/// ledger failures never reach this type — they are reported as an
/// unexecuted outcome so the attempted plan stays visible.
#[derive(Debug, Error)]
pub enum PlanError {
    /// The target portfolio does not exist.
    #[error("Portfolio not found: {0}")]
    PortfolioNotFound(String),

    /// No provider override, prompt-linked provider, default, or configured
    /// provider at all.
    #[error("No LLM provider configured")]
    NoProviderConfigured,

    /// An explicitly requested provider id does not exist.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),

    /// An explicitly requested prompt template id does not exist.
    #[error("Prompt template not found: {0}")]
    PromptNotFound(String),

    /// Transport-level provider failure: network error, non-2xx status, or
    /// an error envelope in the response body. `message` carries the
    /// upstream status and body text verbatim.
    #[error("Provider request failed: {message}")]
    ProviderRequest {
        status: Option<u16>,
        message: String,
    },

    /// The provider answered but with no assistant content.
    #[error("Provider returned no content")]
    EmptyContent,

    /// No JSON payload could be recovered from the model output.
    #[error("Unable to extract JSON payload from model output")]
    Extraction,

    /// The extracted JSON violates the plan schema.
    #[error("Plan validation failed: {0}")]
    Validation(String),

    /// A validated order could not be turned into a trade instruction.
    #[error("Order derivation failed: {0}")]
    OrderDerivation(String),

    /// No usable price for a market order (no quote, no previous close).
    #[error("Pricing failed: {0}")]
    Pricing(String),

    /// Core error from paperdesk-core.
    #[error("Core error: {0}")]
    Core(#[from] CoreError),
}

impl PlanError {
    /// Whether a fresh attempt against the provider may clear the error.
    ///
    /// Configuration errors and core failures are not retryable; everything
    /// the model or the network can do differently next time is.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PlanError::ProviderRequest { .. }
                | PlanError::EmptyContent
                | PlanError::Extraction
                | PlanError::Validation(_)
                | PlanError::OrderDerivation(_)
                | PlanError::Pricing(_)
        )
    }

    /// Error code for programmatic handling by callers.
    pub fn code(&self) -> &'static str {
        match self {
            PlanError::PortfolioNotFound(_) => "PORTFOLIO_NOT_FOUND",
            PlanError::NoProviderConfigured => "NO_PROVIDER_CONFIGURED",
            PlanError::ProviderNotFound(_) => "PROVIDER_NOT_FOUND",
            PlanError::PromptNotFound(_) => "PROMPT_NOT_FOUND",
            PlanError::ProviderRequest { .. } => "PROVIDER_REQUEST_FAILED",
            PlanError::EmptyContent => "PROVIDER_EMPTY_CONTENT",
            PlanError::Extraction => "PLAN_EXTRACTION_FAILED",
            PlanError::Validation(_) => "PLAN_VALIDATION_FAILED",
            PlanError::OrderDerivation(_) => "ORDER_DERIVATION_FAILED",
            PlanError::Pricing(_) => "PRICING_FAILED",
            PlanError::Core(_) => "CORE_ERROR",
        }
    }
}
