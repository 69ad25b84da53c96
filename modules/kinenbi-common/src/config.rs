use std::env;
use std::str::FromStr;

use crate::error::KinenbiError;

const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_HASHTAG_HINT: &str = "#NewGrads #Hiring #CompanySpotlight";

/// How the final two posts are requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GlobalSelectionMode {
    /// Free text, picks joined by a literal separator token.
    #[default]
    Separator,
    /// JSON list of 1-based candidate numbers.
    Structured,
}

impl FromStr for GlobalSelectionMode {
    type Err = KinenbiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "separator" => Ok(Self::Separator),
            "structured" => Ok(Self::Structured),
            other => Err(KinenbiError::Config(format!(
                "GLOBAL_SELECTION must be 'separator' or 'structured', got '{other}'"
            ))),
        }
    }
}

/// The subset of configuration the pipeline components read.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub region: String,
    pub post_language: String,
    pub hashtag_hint: String,
    pub draft_temperature: f32,
    pub selection_temperature: f32,
    pub global_selection: GlobalSelectionMode,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            region: "Japan".to_string(),
            post_language: "Japanese".to_string(),
            hashtag_hint: DEFAULT_HASHTAG_HINT.to_string(),
            draft_temperature: 0.8,
            selection_temperature: 0.1,
            global_selection: GlobalSelectionMode::Separator,
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Generative-content API
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: Option<String>,

    // Pipeline
    pub region: String,
    pub post_language: String,
    pub hashtag_hint: String,
    pub draft_temperature: f32,
    pub selection_temperature: f32,
    pub global_selection: GlobalSelectionMode,

    // Web server
    pub web_host: String,
    pub web_port: u16,
}

impl Config {
    /// Load `.env` if present, then read the process environment.
    pub fn from_env() -> Result<Self, KinenbiError> {
        dotenvy::dotenv().ok();
        Self::from_process_env()
    }

    /// Read the process environment. The API key is the only required value.
    pub fn from_process_env() -> Result<Self, KinenbiError> {
        let defaults = PipelineSettings::default();

        let gemini_api_key = non_empty_env("GEMINI_API_KEY")
            .or_else(|| non_empty_env("API_KEY"))
            .ok_or_else(|| {
                KinenbiError::Config("GEMINI_API_KEY environment variable is required".to_string())
            })?;

        Ok(Self {
            gemini_api_key,
            gemini_model: non_empty_env("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            gemini_base_url: non_empty_env("GEMINI_BASE_URL"),
            region: non_empty_env("REGION").unwrap_or(defaults.region),
            post_language: non_empty_env("POST_LANGUAGE").unwrap_or(defaults.post_language),
            hashtag_hint: non_empty_env("HASHTAG_HINT").unwrap_or(defaults.hashtag_hint),
            draft_temperature: parse_env("DRAFT_TEMPERATURE", defaults.draft_temperature)?,
            selection_temperature: parse_env(
                "SELECTION_TEMPERATURE",
                defaults.selection_temperature,
            )?,
            global_selection: parse_env("GLOBAL_SELECTION", defaults.global_selection)?,
            web_host: non_empty_env("WEB_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            web_port: parse_env("WEB_PORT", 3000)?,
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            region: self.region.clone(),
            post_language: self.post_language.clone(),
            hashtag_hint: self.hashtag_hint.clone(),
            draft_temperature: self.draft_temperature,
            selection_temperature: self.selection_temperature,
            global_selection: self.global_selection,
        }
    }

    pub fn log_redacted(&self) {
        tracing::info!("Config loaded:");
        tracing::info!("  GEMINI_API_KEY: {}", preview(&self.gemini_api_key));
        tracing::info!("  GEMINI_MODEL: {}", self.gemini_model);
        tracing::info!(
            "  GEMINI_BASE_URL: {}",
            self.gemini_base_url.as_deref().unwrap_or("<default>")
        );
        tracing::info!("  REGION: {}", self.region);
        tracing::info!("  POST_LANGUAGE: {}", self.post_language);
        tracing::info!("  GLOBAL_SELECTION: {:?}", self.global_selection);
        tracing::info!("  WEB: {}:{}", self.web_host, self.web_port);
    }
}

/// First five characters plus the total character count.
fn preview(val: &str) -> String {
    let n = val.char_indices().nth(5).map(|(i, _)| i).unwrap_or(val.len());
    format!("{}...({} chars)", &val[..n], val.chars().count())
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T, KinenbiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match non_empty_env(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| KinenbiError::Config(format!("{key} is invalid ('{raw}'): {e}"))),
        None => Ok(default),
    }
}
