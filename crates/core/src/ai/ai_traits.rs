//! Repository traits for AI configuration entities.

use async_trait::async_trait;

use super::ai_provider_model::{LlmProvider, NewLlmProvider};
use super::prompt_template_model::{NewPromptTemplate, PromptTemplate};
use crate::errors::Result;

/// Persistence contract for LLM provider configuration.
///
/// `set_default` clears the flag on all siblings within the same write
/// transaction, so at most one default exists at any time.
#[async_trait]
pub trait LlmProviderRepositoryTrait: Send + Sync {
    async fn create(&self, new_provider: NewLlmProvider) -> Result<LlmProvider>;

    async fn delete(&self, provider_id: &str) -> Result<usize>;

    async fn set_default(&self, provider_id: &str) -> Result<LlmProvider>;

    fn get_by_id(&self, provider_id: &str) -> Result<LlmProvider>;

    /// The provider flagged as default, if any.
    fn get_default(&self) -> Result<Option<LlmProvider>>;

    /// All providers, oldest first.
    fn list(&self) -> Result<Vec<LlmProvider>>;
}

/// Persistence contract for prompt templates.
///
/// The default flag is scoped per portfolio and maintained transactionally
/// like the provider default.
#[async_trait]
pub trait PromptTemplateRepositoryTrait: Send + Sync {
    async fn create(&self, new_template: NewPromptTemplate) -> Result<PromptTemplate>;

    async fn delete(&self, template_id: &str) -> Result<usize>;

    async fn set_default(&self, template_id: &str) -> Result<PromptTemplate>;

    fn get_by_id(&self, template_id: &str) -> Result<PromptTemplate>;

    /// The active default template of a portfolio, if any.
    fn get_default_for_portfolio(&self, portfolio_id: &str) -> Result<Option<PromptTemplate>>;

    fn list_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<PromptTemplate>>;
}
