//! Repositories for AI configuration entities.
//!
//! The single-default invariant is maintained here: setting a default
//! clears the flag on all siblings within the same write transaction
//! (scoped to the whole table for providers, to the owning portfolio for
//! prompt templates).

use async_trait::async_trait;
use chrono::Utc;
use diesel::prelude::*;
use diesel::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

use paperdesk_core::ai::{
    LlmProvider, LlmProviderRepositoryTrait, NewLlmProvider, NewPromptTemplate, PromptTemplate,
    PromptTemplateRepositoryTrait,
};
use paperdesk_core::{DatabaseError, Error, Result};

use super::model::{LlmProviderDB, PromptTemplateDB};
use crate::db::{get_connection, DbPool, WriteHandle};
use crate::errors::DieselErrorExt;
use crate::schema::{llm_providers, prompt_templates};

// ============================================================================
// LLM providers
// ============================================================================

pub struct LlmProviderRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl LlmProviderRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        LlmProviderRepository { pool, writer }
    }

    fn find(conn: &mut SqliteConnection, provider_id: &str) -> Result<LlmProviderDB> {
        llm_providers::table
            .find(provider_id)
            .first::<LlmProviderDB>(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => Error::Database(DatabaseError::NotFound(
                    format!("Provider '{}' not found", provider_id),
                )),
                other => other.into_core_error(),
            })
    }
}

#[async_trait]
impl LlmProviderRepositoryTrait for LlmProviderRepository {
    async fn create(&self, new_provider: NewLlmProvider) -> Result<LlmProvider> {
        new_provider.validate()?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<LlmProvider> {
                if new_provider.is_default {
                    diesel::update(llm_providers::table)
                        .set(llm_providers::is_default.eq(false))
                        .execute(conn)
                        .map_err(|e| e.into_core_error())?;
                }
                let row = LlmProviderDB {
                    id: new_provider
                        .id
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    name: new_provider.name,
                    family: new_provider.family.to_string(),
                    base_url: new_provider.base_url,
                    api_key: new_provider.api_key,
                    model: new_provider.model,
                    temperature: new_provider.temperature,
                    max_tokens: new_provider.max_tokens.map(|v| v as i32),
                    is_default: new_provider.is_default,
                    created_at: Utc::now().to_rfc3339(),
                };
                let result_db = diesel::insert_into(llm_providers::table)
                    .values(&row)
                    .returning(LlmProviderDB::as_returning())
                    .get_result(conn)
                    .map_err(|e| e.into_core_error())?;
                Ok(LlmProvider::from(result_db))
            })
            .await
    }

    async fn delete(&self, provider_id: &str) -> Result<usize> {
        let provider_id = provider_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(llm_providers::table.find(provider_id))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())
            })
            .await
    }

    async fn set_default(&self, provider_id: &str) -> Result<LlmProvider> {
        let provider_id = provider_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<LlmProvider> {
                Self::find(conn, &provider_id)?;
                diesel::update(llm_providers::table)
                    .set(llm_providers::is_default.eq(false))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                diesel::update(llm_providers::table.find(&provider_id))
                    .set(llm_providers::is_default.eq(true))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                Ok(LlmProvider::from(Self::find(conn, &provider_id)?))
            })
            .await
    }

    fn get_by_id(&self, provider_id: &str) -> Result<LlmProvider> {
        let mut conn = get_connection(&self.pool)?;
        Ok(LlmProvider::from(Self::find(&mut conn, provider_id)?))
    }

    fn get_default(&self) -> Result<Option<LlmProvider>> {
        let mut conn = get_connection(&self.pool)?;
        let row = llm_providers::table
            .filter(llm_providers::is_default.eq(true))
            .first::<LlmProviderDB>(&mut conn)
            .optional()
            .map_err(|e| e.into_core_error())?;
        Ok(row.map(LlmProvider::from))
    }

    fn list(&self) -> Result<Vec<LlmProvider>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = llm_providers::table
            .order(llm_providers::created_at.asc())
            .load::<LlmProviderDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;
        Ok(rows.into_iter().map(LlmProvider::from).collect())
    }
}

// ============================================================================
// Prompt templates
// ============================================================================

pub struct PromptTemplateRepository {
    pool: Arc<DbPool>,
    writer: WriteHandle,
}

impl PromptTemplateRepository {
    pub fn new(pool: Arc<DbPool>, writer: WriteHandle) -> Self {
        PromptTemplateRepository { pool, writer }
    }

    fn find(conn: &mut SqliteConnection, template_id: &str) -> Result<PromptTemplateDB> {
        prompt_templates::table
            .find(template_id)
            .first::<PromptTemplateDB>(conn)
            .map_err(|e| match e {
                diesel::result::Error::NotFound => Error::Database(DatabaseError::NotFound(
                    format!("Prompt template '{}' not found", template_id),
                )),
                other => other.into_core_error(),
            })
    }
}

#[async_trait]
impl PromptTemplateRepositoryTrait for PromptTemplateRepository {
    async fn create(&self, new_template: NewPromptTemplate) -> Result<PromptTemplate> {
        new_template.validate()?;
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PromptTemplate> {
                if new_template.is_default {
                    diesel::update(
                        prompt_templates::table
                            .filter(prompt_templates::portfolio_id.eq(&new_template.portfolio_id)),
                    )
                    .set(prompt_templates::is_default.eq(false))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                }
                let row = PromptTemplateDB {
                    id: new_template
                        .id
                        .unwrap_or_else(|| Uuid::new_v4().to_string()),
                    portfolio_id: new_template.portfolio_id,
                    name: new_template.name,
                    system_prompt: new_template.system_prompt,
                    user_template: new_template.user_template,
                    provider_id: new_template.provider_id,
                    is_default: new_template.is_default,
                    is_active: new_template.is_active,
                    created_at: Utc::now().to_rfc3339(),
                };
                let result_db = diesel::insert_into(prompt_templates::table)
                    .values(&row)
                    .returning(PromptTemplateDB::as_returning())
                    .get_result(conn)
                    .map_err(|e| e.into_core_error())?;
                Ok(PromptTemplate::from(result_db))
            })
            .await
    }

    async fn delete(&self, template_id: &str) -> Result<usize> {
        let template_id = template_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<usize> {
                diesel::delete(prompt_templates::table.find(template_id))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())
            })
            .await
    }

    async fn set_default(&self, template_id: &str) -> Result<PromptTemplate> {
        let template_id = template_id.to_string();
        self.writer
            .exec(move |conn: &mut SqliteConnection| -> Result<PromptTemplate> {
                let current = Self::find(conn, &template_id)?;
                diesel::update(
                    prompt_templates::table
                        .filter(prompt_templates::portfolio_id.eq(&current.portfolio_id)),
                )
                .set(prompt_templates::is_default.eq(false))
                .execute(conn)
                .map_err(|e| e.into_core_error())?;
                diesel::update(prompt_templates::table.find(&template_id))
                    .set(prompt_templates::is_default.eq(true))
                    .execute(conn)
                    .map_err(|e| e.into_core_error())?;
                Ok(PromptTemplate::from(Self::find(conn, &template_id)?))
            })
            .await
    }

    fn get_by_id(&self, template_id: &str) -> Result<PromptTemplate> {
        let mut conn = get_connection(&self.pool)?;
        Ok(PromptTemplate::from(Self::find(&mut conn, template_id)?))
    }

    fn get_default_for_portfolio(&self, portfolio_id: &str) -> Result<Option<PromptTemplate>> {
        let mut conn = get_connection(&self.pool)?;
        let row = prompt_templates::table
            .filter(prompt_templates::portfolio_id.eq(portfolio_id))
            .filter(prompt_templates::is_default.eq(true))
            .filter(prompt_templates::is_active.eq(true))
            .first::<PromptTemplateDB>(&mut conn)
            .optional()
            .map_err(|e| e.into_core_error())?;
        Ok(row.map(PromptTemplate::from))
    }

    fn list_for_portfolio(&self, portfolio_id: &str) -> Result<Vec<PromptTemplate>> {
        let mut conn = get_connection(&self.pool)?;
        let rows = prompt_templates::table
            .filter(prompt_templates::portfolio_id.eq(portfolio_id))
            .order(prompt_templates::created_at.asc())
            .load::<PromptTemplateDB>(&mut conn)
            .map_err(|e| e.into_core_error())?;
        Ok(rows.into_iter().map(PromptTemplate::from).collect())
    }
}
