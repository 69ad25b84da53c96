use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Pipeline data ---

/// A company tied to one anniversary. Both fields are non-empty once it
/// leaves the company finder; the URL is never validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub name: String,
    pub url: String,
}

impl Company {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Drafts produced for one anniversary, in company order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnniversaryDrafts {
    pub anniversary: String,
    pub drafts: Vec<String>,
}

// --- Run state ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    #[default]
    Idle,
    FetchingAnniversaries,
    FetchingCompanies,
    DraftingTweets,
    SelectingPerAnniversary,
    SelectingFinal,
    Done,
    Failed,
}

impl RunStage {
    /// Loading message shown while the stage is in progress.
    pub fn status_message(self) -> Option<&'static str> {
        match self {
            RunStage::FetchingAnniversaries => Some("Looking up today's anniversaries..."),
            RunStage::FetchingCompanies => Some("Finding related companies..."),
            RunStage::DraftingTweets => Some("Drafting posts for each anniversary..."),
            RunStage::SelectingPerAnniversary => {
                Some("Choosing the best post for each anniversary...")
            }
            RunStage::SelectingFinal => Some("Choosing the final posts..."),
            RunStage::Idle | RunStage::Done | RunStage::Failed => None,
        }
    }

    /// Whether a new run may start from this stage.
    pub fn accepts_trigger(self) -> bool {
        matches!(self, RunStage::Idle | RunStage::Done | RunStage::Failed)
    }

    pub fn is_running(self) -> bool {
        !self.accepts_trigger()
    }
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStage::Idle => "idle",
            RunStage::FetchingAnniversaries => "fetching_anniversaries",
            RunStage::FetchingCompanies => "fetching_companies",
            RunStage::DraftingTweets => "drafting_tweets",
            RunStage::SelectingPerAnniversary => "selecting_per_anniversary",
            RunStage::SelectingFinal => "selecting_final",
            RunStage::Done => "done",
            RunStage::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Everything the display layer needs about the current or last run.
///
/// `final_posts` and `rejected_posts` are only populated in `Done`;
/// `error` only in `Failed`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunState {
    pub stage: RunStage,
    pub status_message: Option<String>,
    pub final_posts: Vec<String>,
    pub rejected_posts: Vec<String>,
    pub error: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunState {
    /// Fresh state for a run that is about to start.
    pub fn started(now: DateTime<Utc>) -> Self {
        let mut state = Self {
            started_at: Some(now),
            ..Self::default()
        };
        state.enter(RunStage::FetchingAnniversaries);
        state
    }

    pub fn enter(&mut self, stage: RunStage) {
        self.stage = stage;
        self.status_message = stage.status_message().map(str::to_string);
    }

    pub fn complete(&mut self, final_posts: Vec<String>, rejected_posts: Vec<String>) {
        self.enter(RunStage::Done);
        self.final_posts = final_posts;
        self.rejected_posts = rejected_posts;
        self.error = None;
        self.finished_at = Some(Utc::now());
    }

    /// Terminal failure. No partial results survive.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.enter(RunStage::Failed);
        self.final_posts.clear();
        self.rejected_posts.clear();
        self.error = Some(message.into());
        self.finished_at = Some(Utc::now());
    }
}
