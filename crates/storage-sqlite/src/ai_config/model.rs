//! Database models for AI configuration entities.

use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use paperdesk_core::ai::{LlmProvider, PromptTemplate, ProviderFamily};

use crate::portfolios::model::parse_timestamp_column;

/// Database model for configured LLM providers.
#[derive(
    Insertable, Queryable, Identifiable, AsChangeset, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::llm_providers)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct LlmProviderDB {
    pub id: String,
    pub name: String,
    pub family: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
    pub is_default: bool,
    pub created_at: String,
}

impl From<LlmProviderDB> for LlmProvider {
    fn from(db: LlmProviderDB) -> Self {
        Self {
            family: ProviderFamily::from_str(&db.family).unwrap_or_else(|_| {
                log::error!(
                    "Unknown llm_providers.family '{}', treating as openai",
                    db.family
                );
                ProviderFamily::OpenAi
            }),
            max_tokens: db.max_tokens.map(|v| v as u32),
            created_at: parse_timestamp_column(&db.created_at, "llm_providers.created_at"),
            id: db.id,
            name: db.name,
            base_url: db.base_url,
            api_key: db.api_key,
            model: db.model,
            temperature: db.temperature,
            is_default: db.is_default,
        }
    }
}

/// Database model for prompt templates.
#[derive(
    Insertable, Queryable, Identifiable, AsChangeset, Selectable, PartialEq, Serialize, Deserialize, Debug, Clone,
)]
#[diesel(table_name = crate::schema::prompt_templates)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct PromptTemplateDB {
    pub id: String,
    pub portfolio_id: String,
    pub name: String,
    pub system_prompt: Option<String>,
    pub user_template: String,
    pub provider_id: Option<String>,
    pub is_default: bool,
    pub is_active: bool,
    pub created_at: String,
}

impl From<PromptTemplateDB> for PromptTemplate {
    fn from(db: PromptTemplateDB) -> Self {
        Self {
            created_at: parse_timestamp_column(&db.created_at, "prompt_templates.created_at"),
            id: db.id,
            portfolio_id: db.portfolio_id,
            name: db.name,
            system_prompt: db.system_prompt,
            user_template: db.user_template,
            provider_id: db.provider_id,
            is_default: db.is_default,
            is_active: db.is_active,
        }
    }
}
