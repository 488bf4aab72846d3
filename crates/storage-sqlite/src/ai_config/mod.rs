pub mod model;
pub mod repository;

pub use model::{LlmProviderDB, PromptTemplateDB};
pub use repository::{LlmProviderRepository, PromptTemplateRepository};
