//! LLM provider domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ValidationError;
use crate::{Error, Result};

/// A class of LLM backends sharing one wire protocol.
///
/// Closed set: adding a family means adding one adapter in the AI crate,
/// with no change to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    /// OpenAI-compatible chat-completions backends.
    OpenAi,
    /// Self-hosted backends speaking the same protocol (Ollama, vLLM, ...).
    Local,
    /// Gemini-style generateContent backends.
    Gemini,
    /// Anthropic-style messages backends.
    Anthropic,
}

impl fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            ProviderFamily::OpenAi => "openai",
            ProviderFamily::Local => "local",
            ProviderFamily::Gemini => "gemini",
            ProviderFamily::Anthropic => "anthropic",
        };
        write!(f, "{}", tag)
    }
}

impl FromStr for ProviderFamily {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(ProviderFamily::OpenAi),
            "local" => Ok(ProviderFamily::Local),
            "gemini" => Ok(ProviderFamily::Gemini),
            "anthropic" => Ok(ProviderFamily::Anthropic),
            other => Err(Error::Validation(ValidationError::InvalidInput(format!(
                "Unknown provider family '{}'",
                other
            )))),
        }
    }
}

/// A configured LLM provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmProvider {
    pub id: String,
    pub name: String,
    pub family: ProviderFamily,
    /// API base URL; endpoint paths are derived per family.
    pub base_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Target model identifier, e.g. "gpt-4o-mini".
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    /// At most one provider carries this flag at a time.
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

/// Input model for registering a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLlmProvider {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub family: ProviderFamily,
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
    pub is_default: bool,
}

impl NewLlmProvider {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Provider name cannot be empty".to_string(),
            )));
        }
        if self.base_url.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Provider base URL cannot be empty".to_string(),
            )));
        }
        if self.model.trim().is_empty() {
            return Err(Error::Validation(ValidationError::InvalidInput(
                "Provider model cannot be empty".to_string(),
            )));
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(Error::Validation(ValidationError::InvalidInput(format!(
                    "Temperature must be in [0, 2], got {}",
                    t
                ))));
            }
        }
        Ok(())
    }
}
