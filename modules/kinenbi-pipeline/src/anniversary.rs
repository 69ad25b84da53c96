//! Anniversary finder: today's date in, a handful of short labels out.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use kinenbi_common::PipelineSettings;

use crate::prompts;
use crate::traits::{parse_json, ContentGenerator, GenerationRequest, Task};

#[derive(Debug, Deserialize, JsonSchema)]
struct AnniversaryList {
    /// Short names of the day's anniversaries or observances
    #[serde(default)]
    anniversaries: Vec<String>,
}

/// Ask the model for the anniversaries that fall on `date`.
///
/// Never fails: any request or parse error yields an empty list and the
/// caller decides whether that is fatal.
pub async fn find_anniversaries(
    generator: &dyn ContentGenerator,
    date: NaiveDate,
    settings: &PipelineSettings,
) -> Vec<String> {
    let request = GenerationRequest::structured::<AnniversaryList>(
        Task::Anniversaries,
        prompts::anniversaries(date, &settings.region),
    );

    let list = match generator
        .generate(request)
        .await
        .and_then(|text| parse_json::<AnniversaryList>(&text))
    {
        Ok(list) => list,
        Err(e) => {
            warn!(%date, error = %e, "Anniversary lookup failed");
            return Vec::new();
        }
    };

    let anniversaries: Vec<String> = list
        .anniversaries
        .into_iter()
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty())
        .collect();

    info!(%date, count = anniversaries.len(), "Found anniversaries");
    anniversaries
}
