//! Prompt template domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::{Error, Result};

/// A per-portfolio prompt template.
///
/// The user template carries named `{placeholder}` slots the context builder
/// fills in; the system prompt fragment is appended to the fixed base
/// instruction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplate {
    pub id: String,
    pub portfolio_id: String,
    pub name: String,
    pub system_prompt: Option<String>,
    pub user_template: String,
    /// Preferred provider for runs using this template.
    pub provider_id: Option<String>,
    /// At most one default per portfolio.
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input model for creating a prompt template.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPromptTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub portfolio_id: String,
    pub name: String,
    pub system_prompt: Option<String>,
    pub user_template: String,
    pub provider_id: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
}

impl NewPromptTemplate {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Prompt template name cannot be empty".to_string(),
            )));
        }
        if self.user_template.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Prompt user template cannot be empty".to_string(),
            )));
        }
        Ok(())
    }
}
