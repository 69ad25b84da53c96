use std::marker::PhantomData;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::schema::StructuredOutput;
use crate::traits::{OutputBuilder, PromptBuilder};
use crate::util::strip_code_blocks;

use super::{Gemini, GenerateOptions};

pub struct GeminiPromptBuilder {
    agent: Gemini,
    input: String,
    options: GenerateOptions,
}

impl GeminiPromptBuilder {
    pub(crate) fn new(agent: Gemini, input: String) -> Self {
        Self {
            agent,
            input,
            options: GenerateOptions::default(),
        }
    }

    /// Create a structured output builder for extracting typed data.
    pub fn output<T: DeserializeOwned + JsonSchema + Send + 'static>(
        self,
    ) -> GeminiOutputBuilder<T> {
        GeminiOutputBuilder {
            builder: self,
            _phantom: PhantomData,
        }
    }
}

#[async_trait]
impl PromptBuilder for GeminiPromptBuilder {
    fn preamble(mut self, preamble: impl Into<String>) -> Self {
        self.options.system = Some(preamble.into());
        self
    }

    fn temperature(mut self, temperature: f32) -> Self {
        self.options.temperature = Some(temperature);
        self
    }

    async fn send(self) -> Result<String> {
        self.agent.generate(&self.input, self.options).await
    }
}

// =============================================================================
// Structured Output Builder
// =============================================================================

pub struct GeminiOutputBuilder<T> {
    builder: GeminiPromptBuilder,
    _phantom: PhantomData<T>,
}

#[async_trait]
impl<T: DeserializeOwned + JsonSchema + Send + 'static> OutputBuilder<T>
    for GeminiOutputBuilder<T>
{
    async fn send(self) -> Result<T> {
        debug!(
            type_name = T::type_name(),
            "Gemini structured output extraction"
        );

        let options = GenerateOptions {
            schema: Some(T::gemini_schema()),
            ..self.builder.options
        };

        let text = self.builder.agent.generate(&self.builder.input, options).await?;

        serde_json::from_str(strip_code_blocks(&text))
            .map_err(|e| anyhow!("Failed to deserialize response: {}", e))
    }
}
