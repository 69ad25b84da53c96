//! Run orchestration: the staged state machine that drives one generation run.
//!
//! Stages run strictly in order. Fan-out inside a stage uses `join_all`, and
//! every branch returns its own result, so merges are deterministic
//! (anniversary order, then company order). Leaf failures only shrink the
//! result set; the two minimum-count checks are the only hard failures.

use std::any::Any;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use kinenbi_common::{AnniversaryDrafts, PipelineSettings, RunStage, RunState};

use crate::anniversary::find_anniversaries;
use crate::company::find_companies;
use crate::drafter::draft_for_anniversary;
use crate::selection::{select_best_for_anniversary, select_final, FINAL_PICKS};
use crate::traits::ContentGenerator;

const MIN_ANNIVERSARIES: usize = 2;
const MIN_WINNERS: usize = 2;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Could not find at least two anniversaries to feature.")]
    NotEnoughAnniversaries { found: usize },

    #[error("Could not pick enough winning posts across anniversaries.")]
    NotEnoughWinners { found: usize },

    #[error("A run is already in progress.")]
    AlreadyRunning,

    #[error("{0}")]
    Unexpected(String),
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub final_posts: Vec<String>,
    pub rejected_posts: Vec<String>,
}

pub struct Orchestrator {
    generator: Arc<dyn ContentGenerator>,
    settings: PipelineSettings,
    state: watch::Sender<RunState>,
}

impl Orchestrator {
    pub fn new(generator: Arc<dyn ContentGenerator>, settings: PipelineSettings) -> Self {
        let (state, _) = watch::channel(RunState::default());
        Self {
            generator,
            settings,
            state,
        }
    }

    /// Receiver that sees every stage transition.
    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> RunState {
        self.state.borrow().clone()
    }

    /// Execute one run to completion and return its terminal state.
    pub async fn run(&self, today: NaiveDate) -> Result<RunState, RunError> {
        self.begin()?;
        Ok(self.drive(today).await)
    }

    /// Start a run in the background. The state is already reset to
    /// `FetchingAnniversaries` when this returns.
    pub fn spawn(self: Arc<Self>, today: NaiveDate) -> Result<JoinHandle<RunState>, RunError> {
        self.begin()?;
        Ok(tokio::spawn(async move { self.drive(today).await }))
    }

    /// Atomically check that no run is in flight and reset the state.
    fn begin(&self) -> Result<(), RunError> {
        let started = self.state.send_if_modified(|state| {
            if !state.stage.accepts_trigger() {
                return false;
            }
            *state = RunState::started(Utc::now());
            true
        });

        if !started {
            warn!("Run requested while another is in progress");
            return Err(RunError::AlreadyRunning);
        }
        info!(stage = %RunStage::FetchingAnniversaries, "Run started");
        Ok(())
    }

    async fn drive(&self, today: NaiveDate) -> RunState {
        let result = match AssertUnwindSafe(self.execute(today)).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => Err(RunError::Unexpected(panic_message(panic))),
        };

        match result {
            Ok(outcome) => {
                info!(
                    final_posts = outcome.final_posts.len(),
                    rejected_posts = outcome.rejected_posts.len(),
                    "Run complete"
                );
                self.state
                    .send_modify(|s| s.complete(outcome.final_posts, outcome.rejected_posts));
            }
            Err(e) => {
                error!(error = %e, "Run failed");
                self.state.send_modify(|s| s.fail(e.to_string()));
            }
        }

        self.snapshot()
    }

    fn enter(&self, stage: RunStage) {
        info!(%stage, "Entering stage");
        self.state.send_modify(|s| s.enter(stage));
    }

    async fn execute(&self, today: NaiveDate) -> Result<RunOutcome, RunError> {
        let generator = self.generator.as_ref();
        let settings = &self.settings;

        // Stage 1: anniversaries
        let anniversaries = find_anniversaries(generator, today, settings).await;
        if anniversaries.len() < MIN_ANNIVERSARIES {
            return Err(RunError::NotEnoughAnniversaries {
                found: anniversaries.len(),
            });
        }

        // Stage 2: companies per anniversary
        self.enter(RunStage::FetchingCompanies);
        let companies = join_all(
            anniversaries
                .iter()
                .map(|a| find_companies(generator, a, settings)),
        )
        .await;

        // Stage 3: drafts per (anniversary, company)
        self.enter(RunStage::DraftingTweets);
        let drafted: Vec<AnniversaryDrafts> = join_all(
            anniversaries
                .iter()
                .zip(&companies)
                .map(|(a, c)| draft_for_anniversary(generator, a, c, settings)),
        )
        .await;
        let all_drafts: Vec<String> = drafted
            .iter()
            .flat_map(|d| d.drafts.iter().cloned())
            .collect();
        info!(count = all_drafts.len(), "Drafts collected");

        // Stage 4: best draft per anniversary
        self.enter(RunStage::SelectingPerAnniversary);
        let picked = join_all(
            drafted
                .iter()
                .filter(|d| !d.drafts.is_empty())
                .map(|d| select_best_for_anniversary(generator, &d.anniversary, &d.drafts, settings)),
        )
        .await;
        let winners = unique(picked.into_iter().flatten());
        if winners.len() < MIN_WINNERS {
            return Err(RunError::NotEnoughWinners {
                found: winners.len(),
            });
        }

        // Stage 5: final pick
        self.enter(RunStage::SelectingFinal);
        let mut final_posts = select_final(generator, &winners, settings).await;
        if final_posts.len() < FINAL_PICKS {
            warn!(
                picked = final_posts.len(),
                "Final selection came up short, using first two winners"
            );
            final_posts = winners.iter().take(FINAL_PICKS).cloned().collect();
        }

        let rejected_posts = rejected_posts(&all_drafts, &final_posts);
        Ok(RunOutcome {
            final_posts,
            rejected_posts,
        })
    }
}

/// Every draft not in the final selection, by exact text, without repeats.
pub fn rejected_posts(all_drafts: &[String], final_posts: &[String]) -> Vec<String> {
    let chosen: HashSet<&str> = final_posts.iter().map(String::as_str).collect();
    unique(
        all_drafts
            .iter()
            .filter(|d| !chosen.contains(d.as_str()))
            .cloned(),
    )
}

fn unique(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_default();

    if message.trim().is_empty() {
        "An unknown error occurred.".to_string()
    } else {
        message
    }
}
