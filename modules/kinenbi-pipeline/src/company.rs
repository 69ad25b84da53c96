//! Company finder: up to three hiring companies tied to one anniversary.

use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{debug, info, warn};

use kinenbi_common::{Company, PipelineSettings};

use crate::prompts;
use crate::traits::{parse_json, ContentGenerator, GenerationRequest, Task};

pub const MAX_COMPANIES: usize = 3;

#[derive(Debug, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct CompanyEntry {
    /// Official company name
    #[serde(default)]
    company_name: String,
    /// Official website URL
    #[serde(default)]
    company_url: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CompanyList {
    #[serde(default)]
    companies: Vec<CompanyEntry>,
}

/// Ask the model for companies related to `anniversary`.
///
/// Returns at most [`MAX_COMPANIES`] entries, each with a non-empty name
/// and URL. Incomplete entries are skipped one by one; a failed request or
/// unparseable body yields an empty list.
pub async fn find_companies(
    generator: &dyn ContentGenerator,
    anniversary: &str,
    settings: &PipelineSettings,
) -> Vec<Company> {
    let request = GenerationRequest::structured::<CompanyList>(
        Task::Companies,
        prompts::companies(anniversary, &settings.region),
    );

    let list = match generator
        .generate(request)
        .await
        .and_then(|text| parse_json::<CompanyList>(&text))
    {
        Ok(list) => list,
        Err(e) => {
            warn!(anniversary, error = %e, "Company lookup failed");
            return Vec::new();
        }
    };

    let companies: Vec<Company> = list
        .companies
        .into_iter()
        .map(|c| Company::new(c.company_name.trim(), c.company_url.trim()))
        .filter(|c| {
            let complete = !c.name.is_empty() && !c.url.is_empty();
            if !complete {
                debug!(anniversary, name = %c.name, "Skipping incomplete company entry");
            }
            complete
        })
        .take(MAX_COMPANIES)
        .collect();

    if companies.is_empty() {
        warn!(anniversary, "No companies found for anniversary");
    } else {
        info!(anniversary, count = companies.len(), "Found related companies");
    }
    companies
}
