//! Two selection rounds: best draft per anniversary, then best two overall.
//!
//! Both rounds only ever return members of their input. Model answers are
//! matched back to a candidate; anything that cannot be matched is dropped.

use std::collections::HashSet;

use ai_client::normalize_whitespace;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::{info, warn};

use kinenbi_common::{GlobalSelectionMode, PipelineSettings};

use crate::prompts;
use crate::traits::{parse_json, ContentGenerator, GenerationRequest, Task};

/// Joins the two picks in a free-text final selection.
pub const TWEET_SEPARATOR: &str = "---END_OF_TWEET---";

pub const FINAL_PICKS: usize = 2;

#[derive(Debug, Deserialize, JsonSchema)]
struct FinalPicks {
    /// 1-based candidate numbers of the chosen posts, best first
    #[serde(default)]
    picks: Vec<u32>,
}

/// Map a model answer back to the candidate it names: exact match after
/// trimming first, then a whitespace-insensitive match.
pub fn resolve_candidate<'a>(answer: &str, candidates: &'a [String]) -> Option<&'a String> {
    let answer = answer.trim();
    if answer.is_empty() {
        return None;
    }
    if let Some(hit) = candidates.iter().find(|c| c.trim() == answer) {
        return Some(hit);
    }
    let normalized = normalize_whitespace(answer);
    candidates
        .iter()
        .find(|c| normalize_whitespace(c) == normalized)
}

/// Pick the best draft for one anniversary.
///
/// Returns `None` only for an empty input. A failed call, or an answer
/// that matches none of the drafts, falls back to the first draft.
pub async fn select_best_for_anniversary(
    generator: &dyn ContentGenerator,
    anniversary: &str,
    drafts: &[String],
    settings: &PipelineSettings,
) -> Option<String> {
    let first = drafts.first()?;

    let request = GenerationRequest::text(
        Task::SelectPerAnniversary,
        prompts::select_per_anniversary(anniversary, drafts),
    )
    .temperature(settings.selection_temperature);

    match generator.generate(request).await {
        Ok(answer) => match resolve_candidate(&answer, drafts) {
            Some(best) => Some(best.clone()),
            None => {
                warn!(
                    anniversary,
                    "Selection answer matched no draft, falling back to first draft"
                );
                Some(first.clone())
            }
        },
        Err(e) => {
            warn!(anniversary, error = %e, "Per-anniversary selection failed, falling back to first draft");
            Some(first.clone())
        }
    }
}

/// Pick up to two posts among the per-anniversary winners.
///
/// May return fewer than two when the answer cannot be matched; the
/// orchestrator covers that case. A failed call returns the first two.
pub async fn select_final(
    generator: &dyn ContentGenerator,
    winners: &[String],
    settings: &PipelineSettings,
) -> Vec<String> {
    if winners.is_empty() {
        return Vec::new();
    }

    let mode = match settings.global_selection {
        GlobalSelectionMode::Separator if winners.iter().any(|w| w.contains(TWEET_SEPARATOR)) => {
            info!("A candidate contains the separator token, using numbered selection");
            GlobalSelectionMode::Structured
        }
        mode => mode,
    };

    let picked = match mode {
        GlobalSelectionMode::Separator => select_final_separated(generator, winners, settings).await,
        GlobalSelectionMode::Structured => select_final_numbered(generator, winners, settings).await,
    };

    match picked {
        Ok(picked) => {
            info!(candidates = winners.len(), picked = picked.len(), "Final selection made");
            picked
        }
        Err(e) => {
            warn!(error = %e, "Final selection failed, falling back to first two winners");
            winners.iter().take(FINAL_PICKS).cloned().collect()
        }
    }
}

async fn select_final_separated(
    generator: &dyn ContentGenerator,
    winners: &[String],
    settings: &PipelineSettings,
) -> anyhow::Result<Vec<String>> {
    let request = GenerationRequest::text(Task::SelectFinal, prompts::select_final_separated(winners))
        .temperature(settings.selection_temperature);
    let answer = generator.generate(request).await?;

    let resolved = answer
        .split(TWEET_SEPARATOR)
        .filter_map(|segment| resolve_candidate(segment, winners));
    Ok(distinct(resolved))
}

async fn select_final_numbered(
    generator: &dyn ContentGenerator,
    winners: &[String],
    settings: &PipelineSettings,
) -> anyhow::Result<Vec<String>> {
    let request = GenerationRequest::structured::<FinalPicks>(
        Task::SelectFinal,
        prompts::select_final_numbered(winners),
    )
    .temperature(settings.selection_temperature);
    let answer = generator.generate(request).await?;
    let picks: FinalPicks = parse_json(&answer)?;

    let resolved = picks
        .picks
        .into_iter()
        .filter_map(|n| (n as usize).checked_sub(1))
        .filter_map(|i| winners.get(i));
    Ok(distinct(resolved))
}

/// First [`FINAL_PICKS`] distinct candidates, in answer order.
fn distinct<'a>(candidates: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    candidates
        .filter(|c| seen.insert(*c))
        .take(FINAL_PICKS)
        .cloned()
        .collect()
}
