// The one seam between the pipeline and the language model.
//
// Every component takes `&dyn ContentGenerator`, so runs can be driven by
// the real Gemini client or by `testing::MockGenerator` with no network.

use ai_client::{strip_code_blocks, Gemini, GenerateOptions, StructuredOutput};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Which pipeline step a request belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Anniversaries,
    Companies,
    Draft,
    SelectPerAnniversary,
    SelectFinal,
}

impl std::fmt::Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Task::Anniversaries => "anniversaries",
            Task::Companies => "companies",
            Task::Draft => "draft",
            Task::SelectPerAnniversary => "select_per_anniversary",
            Task::SelectFinal => "select_final",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape {
    Text,
    /// JSON constrained by the given response schema.
    Json(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub task: Task,
    pub prompt: String,
    pub temperature: Option<f32>,
    pub shape: ResponseShape,
}

impl GenerationRequest {
    pub fn text(task: Task, prompt: impl Into<String>) -> Self {
        Self {
            task,
            prompt: prompt.into(),
            temperature: None,
            shape: ResponseShape::Text,
        }
    }

    /// Request JSON shaped like `T`.
    pub fn structured<T: StructuredOutput>(task: Task, prompt: impl Into<String>) -> Self {
        Self {
            task,
            prompt: prompt.into(),
            temperature: None,
            shape: ResponseShape::Json(T::gemini_schema()),
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// Issue one request and return the raw response text.
    async fn generate(&self, request: GenerationRequest) -> Result<String>;
}

#[async_trait]
impl ContentGenerator for Gemini {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        let options = GenerateOptions {
            system: None,
            temperature: request.temperature,
            schema: match request.shape {
                ResponseShape::Json(schema) => Some(schema),
                ResponseShape::Text => None,
            },
        };
        Gemini::generate(self, &request.prompt, options).await
    }
}

/// Decode a JSON response, tolerating markdown fences around it.
pub(crate) fn parse_json<T: DeserializeOwned>(text: &str) -> Result<T> {
    serde_json::from_str(strip_code_blocks(text))
        .map_err(|e| anyhow!("Failed to deserialize response: {}", e))
}
