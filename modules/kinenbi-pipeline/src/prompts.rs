//! Prompt text for every model call in the pipeline.

use chrono::NaiveDate;

use kinenbi_common::{Company, PipelineSettings};

use crate::selection::TWEET_SEPARATOR;

/// Shared by both selection rounds.
const SELECTION_CRITERIA: &str = "\
Selection criteria:\n\
- Does it convey the company's appeal concretely?\n\
- Can a student picture their own future at the company?\n\
- Is the text concise and easy to read?\n\
- Is the tie to the anniversary natural and interesting?";

pub fn anniversaries(date: NaiveDate, region: &str) -> String {
    format!(
        "What is {date} known for? List 3 notable anniversaries, commemorative days, \
         or annual observances in {region} that fall on this date. \
         Keep each one short: just its name.",
        date = date.format("%Y-%m-%d (%B %-d)"),
    )
}

pub fn companies(anniversary: &str, region: &str) -> String {
    format!(
        "Today is \"{anniversary}\". Name 3 companies in {region} that are related to this \
         anniversary and actively recruit new graduates. For each company give its official \
         name (companyName) and the URL of its official website (companyUrl)."
    )
}

pub fn draft(anniversary: &str, company: &Company, settings: &PipelineSettings) -> String {
    format!(
        "Today is \"{anniversary}\".\n\
         Write one social media post for new-graduate job seekers that introduces \
         \"{name}\" as a company related to this anniversary.\n\n\
         The post must meet every condition below:\n\
         - Open by briefly explaining how the anniversary connects to the company.\n\
         - Introduce the company's appeal and business in a way that resonates with students.\n\
         - End with the company's official website URL: {url}\n\
         - Keep the whole post within 270 characters.\n\
         - Finish with 3-4 hashtags such as \"{hashtags}\".\n\
         - Use emoji where they make the post more appealing.\n\
         - Write the post in {language}.\n\n\
         Return only the post text.",
        name = company.name,
        url = company.url,
        hashtags = settings.hashtag_hint,
        language = settings.post_language,
    )
}

/// Candidates rendered as numbered blocks, 1-based.
fn numbered(drafts: &[String]) -> String {
    drafts
        .iter()
        .enumerate()
        .map(|(i, t)| format!("--- Candidate {} ---\n{}", i + 1, t))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn select_per_anniversary(anniversary: &str, drafts: &[String]) -> String {
    format!(
        "Today is \"{anniversary}\".\n\
         From the draft social media posts below, choose the single post that new-graduate \
         job seekers would find most appealing and engaging.\n\n\
         {SELECTION_CRITERIA}\n\n\
         Candidates:\n\
         {candidates}\n\n\
         Choose the best one and return only that post's full text. Do not add any \
         explanation, preamble, or header such as \"Candidate N\".",
        candidates = numbered(drafts),
    )
}

pub fn select_final_separated(winners: &[String]) -> String {
    format!(
        "From the draft social media posts below, choose the two posts that new-graduate \
         job seekers would find most appealing and engaging.\n\n\
         {SELECTION_CRITERIA}\n\n\
         Candidates:\n\
         ---\n\
         {candidates}\n\
         ---\n\n\
         Choose the best two and return only their text, joined by the separator \
         \"{TWEET_SEPARATOR}\". Do not add any explanation, preamble, or commentary.",
        candidates = winners.join(&format!("\n{TWEET_SEPARATOR}\n")),
    )
}

pub fn select_final_numbered(winners: &[String]) -> String {
    format!(
        "From the draft social media posts below, choose the two posts that new-graduate \
         job seekers would find most appealing and engaging.\n\n\
         {SELECTION_CRITERIA}\n\n\
         Candidates:\n\
         {candidates}\n\n\
         Answer with the candidate numbers of the best two posts in `picks`, best first.",
        candidates = numbered(winners),
    )
}
