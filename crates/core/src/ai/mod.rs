//! AI configuration module - LLM provider and prompt template entities.
//!
//! These are configuration entities consumed read-mostly by the planning
//! pipeline; administrative writes go through the repository traits, which
//! keep the single-default invariant inside one transaction.

mod ai_provider_model;
mod ai_traits;
mod prompt_template_model;

// Re-export the public interface
pub use ai_provider_model::{LlmProvider, NewLlmProvider, ProviderFamily};
pub use ai_traits::{LlmProviderRepositoryTrait, PromptTemplateRepositoryTrait};
pub use prompt_template_model::{NewPromptTemplate, PromptTemplate};
