mod client;
pub mod prompt_builder;
pub(crate) mod types;

pub use prompt_builder::{GeminiOutputBuilder, GeminiPromptBuilder};

use anyhow::{anyhow, Result};
use tracing::debug;

use crate::error::AiError;
use crate::schema::StructuredOutput;
use crate::util::{strip_code_blocks, truncate_to_char_boundary};
use client::GeminiClient;
use types::GenerateRequest;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Per-call knobs for [`Gemini::generate`].
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// System instruction sent alongside the prompt.
    pub system: Option<String>,
    /// Sampling temperature; provider default when `None`.
    pub temperature: Option<f32>,
    /// Response schema; switches the call to JSON output when set.
    pub schema: Option<serde_json::Value>,
}

// =============================================================================
// Gemini Agent
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
}

impl Gemini {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub(crate) fn client(&self) -> GeminiClient {
        let client = GeminiClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }

    pub fn prompt(&self, input: impl Into<String>) -> GeminiPromptBuilder {
        GeminiPromptBuilder::new(self.clone(), input.into())
    }

    /// One generateContent round trip. Returns the first candidate's text.
    pub async fn generate(&self, prompt: &str, options: GenerateOptions) -> Result<String> {
        let mut request = GenerateRequest::new(prompt);
        if let Some(system) = options.system {
            request = request.system(system);
        }
        if let Some(temperature) = options.temperature {
            request = request.temperature(temperature);
        }
        if let Some(schema) = options.schema {
            request = request.json_schema(schema);
        }

        let response = self.client().generate(&self.model, &request).await?;

        if let Some(reason) = response.block_reason() {
            return Err(AiError::EmptyResponse(format!("prompt blocked: {reason}")).into());
        }

        let text = response.text().ok_or_else(|| {
            AiError::EmptyResponse(format!(
                "no text in response (finish reason: {})",
                response.finish_reason().unwrap_or("unknown")
            ))
        })?;

        let usage = response.usage_metadata.as_ref();
        debug!(
            model = %self.model,
            prompt_tokens = usage.map(|u| u.prompt_token_count),
            output_tokens = usage.map(|u| u.candidates_token_count),
            preview = truncate_to_char_boundary(&text, 120),
            "Gemini response"
        );

        Ok(text)
    }

    // =========================================================================
    // Convenience methods
    // =========================================================================

    /// Type-safe structured output extraction.
    pub async fn extract<T: StructuredOutput>(&self, prompt: &str) -> Result<T> {
        let options = GenerateOptions {
            schema: Some(T::gemini_schema()),
            ..Default::default()
        };
        let text = self.generate(prompt, options).await?;

        serde_json::from_str(strip_code_blocks(&text))
            .map_err(|e| anyhow!("Failed to deserialize response: {}", e))
    }

    /// Simple free-text completion at the provider's default temperature.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        self.generate(prompt, GenerateOptions::default()).await
    }
}
