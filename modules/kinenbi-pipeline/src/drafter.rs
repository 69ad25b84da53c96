//! Post drafting: one draft per (anniversary, company) pair.

use futures::future::join_all;
use tracing::{debug, warn};

use kinenbi_common::{AnniversaryDrafts, Company, PipelineSettings};

use crate::prompts;
use crate::traits::{ContentGenerator, GenerationRequest, Task};

/// Draft one post. The content policy lives in the prompt and is not
/// checked afterwards; the trimmed model text is returned as-is, or an
/// empty string on failure.
pub async fn draft_post(
    generator: &dyn ContentGenerator,
    anniversary: &str,
    company: &Company,
    settings: &PipelineSettings,
) -> String {
    let request = GenerationRequest::text(
        Task::Draft,
        prompts::draft(anniversary, company, settings),
    )
    .temperature(settings.draft_temperature);

    match generator.generate(request).await {
        Ok(text) => {
            let text = text.trim().to_string();
            debug!(anniversary, company = %company.name, chars = text.chars().count(), "Drafted post");
            text
        }
        Err(e) => {
            warn!(anniversary, company = %company.name, error = %e, "Draft generation failed");
            String::new()
        }
    }
}

/// Draft for every company of one anniversary concurrently. Empty drafts
/// are dropped; the rest keep company order.
pub async fn draft_for_anniversary(
    generator: &dyn ContentGenerator,
    anniversary: &str,
    companies: &[Company],
    settings: &PipelineSettings,
) -> AnniversaryDrafts {
    let drafts = join_all(
        companies
            .iter()
            .map(|company| draft_post(generator, anniversary, company, settings)),
    )
    .await
    .into_iter()
    .filter(|d| !d.is_empty())
    .collect();

    AnniversaryDrafts {
        anniversary: anniversary.to_string(),
        drafts,
    }
}
