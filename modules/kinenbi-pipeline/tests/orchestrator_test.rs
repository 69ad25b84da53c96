//! End-to-end runs of the orchestrator against scripted generators.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::json;
use tokio::sync::{Barrier, Notify};

use kinenbi_common::{GlobalSelectionMode, PipelineSettings, RunStage, RunState};
use kinenbi_pipeline::testing::MockGenerator;
use kinenbi_pipeline::{
    ContentGenerator, GenerationRequest, Orchestrator, RunError, Task, TWEET_SEPARATOR,
};

const TOFU_POST: &str = "Tofu Day! Mame Foods turns soybeans into smiles. #NewGrads";
const TOFU_POST_2: &str = "Kinu Works has pressed silky tofu since 1952. Join us! #Hiring";
const FLIGHT_POST: &str = "Happy Aviation Day from Sora Air, come fly with us! #NewGrads";

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 2).unwrap()
}

fn company(name: &str) -> serde_json::Value {
    json!({ "companyName": name, "companyUrl": format!("https://{}.example.jp", name.to_lowercase().replace(' ', "-")) })
}

/// Two anniversaries with one company and one draft each.
fn tofu_and_aviation() -> MockGenerator {
    MockGenerator::new()
        .on_json(
            Task::Anniversaries,
            &[],
            json!({ "anniversaries": ["Tofu Day", "Aviation Day"] }),
        )
        .on_json(
            Task::Companies,
            &["\"Tofu Day\""],
            json!({ "companies": [company("Mame Foods")] }),
        )
        .on_json(
            Task::Companies,
            &["\"Aviation Day\""],
            json!({ "companies": [company("Sora Air")] }),
        )
        .on(Task::Draft, &["Mame Foods"], TOFU_POST)
        .on(Task::Draft, &["Sora Air"], FLIGHT_POST)
        .on(Task::SelectPerAnniversary, &["\"Tofu Day\""], TOFU_POST)
        .on(Task::SelectPerAnniversary, &["\"Aviation Day\""], FLIGHT_POST)
}

fn orchestrator(generator: &Arc<MockGenerator>) -> Orchestrator {
    Orchestrator::new(generator.clone(), PipelineSettings::default())
}

#[tokio::test]
async fn two_anniversaries_two_final_posts_nothing_rejected() {
    let generator = Arc::new(tofu_and_aviation().on(
        Task::SelectFinal,
        &[],
        format!("{TOFU_POST}\n{TWEET_SEPARATOR}\n{FLIGHT_POST}"),
    ));
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![TOFU_POST, FLIGHT_POST]);
    assert!(state.rejected_posts.is_empty());
    assert!(state.error.is_none());
    assert!(state.status_message.is_none());
    assert!(state.finished_at.is_some());
    assert_eq!(orchestrator.snapshot(), state);

    let drafts = generator.calls_for(Task::Draft);
    assert_eq!(drafts.len(), 2);
    assert!(drafts.iter().all(|c| c.temperature == Some(0.8)));
    assert!(generator
        .calls_for(Task::SelectFinal)
        .iter()
        .all(|c| c.temperature == Some(0.1)));
}

#[tokio::test]
async fn single_anniversary_fails_before_any_drafting() {
    let generator = Arc::new(MockGenerator::new().on_json(
        Task::Anniversaries,
        &[],
        json!({ "anniversaries": ["Tofu Day"] }),
    ));
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Failed);
    assert_eq!(
        state.error.as_deref(),
        Some("Could not find at least two anniversaries to feature.")
    );
    assert!(state.final_posts.is_empty());
    assert!(generator.calls_for(Task::Companies).is_empty());
    assert!(generator.calls_for(Task::Draft).is_empty());
}

#[tokio::test]
async fn anniversary_lookup_failure_is_a_failed_run() {
    let generator = Arc::new(MockGenerator::new().fail(Task::Anniversaries, &[], "503"));
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Failed);
    assert_eq!(
        state.error.as_deref(),
        Some("Could not find at least two anniversaries to feature.")
    );
}

#[tokio::test]
async fn failed_company_lookup_only_drops_that_anniversary() {
    const CAT_POST: &str = "Cat Day at Neko Toys: we build play for every cat. #CompanySpotlight";
    let generator = Arc::new(
        MockGenerator::new()
            .on_json(
                Task::Anniversaries,
                &[],
                json!({ "anniversaries": ["Tofu Day", "Aviation Day", "Cat Day"] }),
            )
            .on_json(
                Task::Companies,
                &["\"Tofu Day\""],
                json!({ "companies": [company("Mame Foods")] }),
            )
            .fail(Task::Companies, &["\"Aviation Day\""], "timeout")
            .on_json(
                Task::Companies,
                &["\"Cat Day\""],
                json!({ "companies": [company("Neko Toys")] }),
            )
            .on(Task::Draft, &["Mame Foods"], TOFU_POST)
            .on(Task::Draft, &["Neko Toys"], CAT_POST)
            .on(Task::SelectPerAnniversary, &["\"Tofu Day\""], TOFU_POST)
            .on(Task::SelectPerAnniversary, &["\"Cat Day\""], CAT_POST)
            .on(
                Task::SelectFinal,
                &[],
                format!("{CAT_POST}{TWEET_SEPARATOR}{TOFU_POST}"),
            ),
    );
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![CAT_POST, TOFU_POST]);
    assert!(generator
        .calls_for(Task::Draft)
        .iter()
        .all(|c| !c.prompt.contains("Aviation Day")));
    assert_eq!(generator.calls_for(Task::SelectPerAnniversary).len(), 2);
}

#[tokio::test]
async fn one_surviving_winner_fails_the_run() {
    let generator = Arc::new(
        MockGenerator::new()
            .on_json(
                Task::Anniversaries,
                &[],
                json!({ "anniversaries": ["Tofu Day", "Aviation Day"] }),
            )
            .on_json(
                Task::Companies,
                &["\"Tofu Day\""],
                json!({ "companies": [company("Mame Foods")] }),
            )
            .on_json(Task::Companies, &["\"Aviation Day\""], json!({ "companies": [] }))
            .on(Task::Draft, &["Mame Foods"], TOFU_POST)
            .on(Task::SelectPerAnniversary, &[], TOFU_POST),
    );
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Failed);
    assert_eq!(
        state.error.as_deref(),
        Some("Could not pick enough winning posts across anniversaries.")
    );
    assert!(state.final_posts.is_empty());
    assert!(state.rejected_posts.is_empty());
    assert!(generator.calls_for(Task::SelectFinal).is_empty());
}

#[tokio::test]
async fn per_anniversary_failure_uses_first_draft_and_rejects_the_rest() {
    let generator = Arc::new(
        MockGenerator::new()
            .on_json(
                Task::Anniversaries,
                &[],
                json!({ "anniversaries": ["Tofu Day", "Aviation Day"] }),
            )
            .on_json(
                Task::Companies,
                &["\"Tofu Day\""],
                json!({ "companies": [company("Mame Foods"), company("Kinu Works")] }),
            )
            .on_json(
                Task::Companies,
                &["\"Aviation Day\""],
                json!({ "companies": [company("Sora Air")] }),
            )
            .on(Task::Draft, &["Mame Foods"], TOFU_POST)
            .on(Task::Draft, &["Kinu Works"], TOFU_POST_2)
            .on(Task::Draft, &["Sora Air"], FLIGHT_POST)
            .fail(Task::SelectPerAnniversary, &["\"Tofu Day\""], "quota")
            .on(Task::SelectPerAnniversary, &["\"Aviation Day\""], FLIGHT_POST)
            .on(
                Task::SelectFinal,
                &[],
                format!("{FLIGHT_POST}{TWEET_SEPARATOR}{TOFU_POST}"),
            ),
    );
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![FLIGHT_POST, TOFU_POST]);
    assert_eq!(state.rejected_posts, vec![TOFU_POST_2]);
}

#[tokio::test]
async fn malformed_final_answer_falls_back_to_first_two_winners() {
    let generator = Arc::new(tofu_and_aviation().on(
        Task::SelectFinal,
        &[],
        "I would go with the tofu one, it is cute.",
    ));
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![TOFU_POST, FLIGHT_POST]);
    assert!(state.rejected_posts.is_empty());
}

#[tokio::test]
async fn final_posts_are_drafts_and_never_rejected() {
    let generator = Arc::new(
        MockGenerator::new()
            .on_json(
                Task::Anniversaries,
                &[],
                json!({ "anniversaries": ["Tofu Day", "Aviation Day"] }),
            )
            .on_json(
                Task::Companies,
                &["\"Tofu Day\""],
                json!({ "companies": [company("Mame Foods"), company("Kinu Works")] }),
            )
            .on_json(
                Task::Companies,
                &["\"Aviation Day\""],
                json!({ "companies": [company("Sora Air"), company("Kumo Jets")] }),
            )
            .on(Task::Draft, &["Mame Foods"], TOFU_POST)
            .on(Task::Draft, &["Kinu Works"], TOFU_POST_2)
            .on(Task::Draft, &["Sora Air"], FLIGHT_POST)
            // Same text as the Sora Air draft.
            .on(Task::Draft, &["Kumo Jets"], FLIGHT_POST)
            .on(Task::SelectPerAnniversary, &["\"Tofu Day\""], TOFU_POST_2)
            .on(Task::SelectPerAnniversary, &["\"Aviation Day\""], FLIGHT_POST)
            .on(
                Task::SelectFinal,
                &[],
                format!("{TOFU_POST_2}{TWEET_SEPARATOR}An invented post"),
            ),
    );
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();
    let all = [TOFU_POST, TOFU_POST_2, FLIGHT_POST];

    assert_eq!(state.stage, RunStage::Done);
    assert!(state.final_posts.len() <= 2);
    assert!(state.final_posts.iter().all(|p| all.contains(&p.as_str())));
    assert!(state
        .rejected_posts
        .iter()
        .all(|r| !state.final_posts.contains(r)));
    // One valid pick only, so the first two winners are used.
    assert_eq!(state.final_posts, vec![TOFU_POST_2, FLIGHT_POST]);
    assert_eq!(state.rejected_posts, vec![TOFU_POST]);
}

#[tokio::test]
async fn structured_final_selection_runs_end_to_end() {
    let generator = Arc::new(tofu_and_aviation().on_json(
        Task::SelectFinal,
        &[],
        json!({ "picks": [2, 1] }),
    ));
    let settings = PipelineSettings {
        global_selection: GlobalSelectionMode::Structured,
        ..PipelineSettings::default()
    };
    let orchestrator = Orchestrator::new(generator.clone(), settings);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![FLIGHT_POST, TOFU_POST]);
}

#[tokio::test]
async fn panic_inside_a_stage_becomes_a_failed_run() {
    let generator = Arc::new(
        MockGenerator::new()
            .on_json(
                Task::Anniversaries,
                &[],
                json!({ "anniversaries": ["Tofu Day", "Aviation Day"] }),
            )
            .panic_on(Task::Companies, &[], "model exploded"),
    );
    let orchestrator = orchestrator(&generator);

    let state = orchestrator.run(today()).await.unwrap();

    assert_eq!(state.stage, RunStage::Failed);
    assert_eq!(state.error.as_deref(), Some("model exploded"));
    assert!(state.final_posts.is_empty());
}

// ---------------------------------------------------------------------------
// Scripted wrappers for run-lifecycle tests
// ---------------------------------------------------------------------------

/// Holds the anniversary lookup until `release` is notified.
struct GatedGenerator {
    inner: MockGenerator,
    release: Arc<Notify>,
}

#[async_trait]
impl ContentGenerator for GatedGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        if request.task == Task::Anniversaries {
            self.release.notified().await;
        }
        self.inner.generate(request).await
    }
}

/// Fails the first anniversary lookup, then behaves like `inner`.
struct FlakyGenerator {
    inner: MockGenerator,
    failed_once: AtomicBool,
}

#[async_trait]
impl ContentGenerator for FlakyGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        if request.task == Task::Anniversaries && !self.failed_once.swap(true, Ordering::SeqCst) {
            bail!("connection reset");
        }
        self.inner.generate(request).await
    }
}

#[tokio::test]
async fn retrigger_while_running_is_rejected() {
    let release = Arc::new(Notify::new());
    let generator = Arc::new(GatedGenerator {
        inner: tofu_and_aviation().on(
            Task::SelectFinal,
            &[],
            format!("{TOFU_POST}{TWEET_SEPARATOR}{FLIGHT_POST}"),
        ),
        release: release.clone(),
    });
    let orchestrator = Arc::new(Orchestrator::new(generator, PipelineSettings::default()));
    let updates = orchestrator.subscribe();

    let handle = orchestrator.clone().spawn(today()).unwrap();

    let running = updates.borrow().clone();
    assert_eq!(running.stage, RunStage::FetchingAnniversaries);
    assert_eq!(
        running.status_message.as_deref(),
        Some("Looking up today's anniversaries...")
    );
    assert!(matches!(
        orchestrator.clone().spawn(today()),
        Err(RunError::AlreadyRunning)
    ));
    assert_eq!(
        orchestrator.run(today()).await,
        Err(RunError::AlreadyRunning)
    );

    release.notify_one();
    let state = handle.await.unwrap();
    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![TOFU_POST, FLIGHT_POST]);

    // A finished run accepts the next trigger.
    release.notify_one();
    let again = orchestrator.run(today()).await.unwrap();
    assert_eq!(again.stage, RunStage::Done);
}

#[tokio::test]
async fn each_run_starts_from_a_clean_state() {
    let generator = Arc::new(FlakyGenerator {
        inner: tofu_and_aviation().on(
            Task::SelectFinal,
            &[],
            format!("{TOFU_POST}{TWEET_SEPARATOR}{FLIGHT_POST}"),
        ),
        failed_once: AtomicBool::new(false),
    });
    let orchestrator = Orchestrator::new(generator, PipelineSettings::default());

    let failed = orchestrator.run(today()).await.unwrap();
    assert_eq!(failed.stage, RunStage::Failed);
    assert!(failed.error.is_some());

    let done = orchestrator.run(today()).await.unwrap();
    assert_eq!(done.stage, RunStage::Done);
    assert!(done.error.is_none());
    assert_eq!(done.final_posts, vec![TOFU_POST, FLIGHT_POST]);
    assert!(done.started_at >= failed.started_at);
}

/// Holds every request of one task at a barrier sized to the number of
/// requests that stage issues. Completes only if they are all in flight at
/// once.
struct BarrierGenerator {
    inner: MockGenerator,
    task: Task,
    barrier: Barrier,
}

impl BarrierGenerator {
    fn new(inner: MockGenerator, task: Task, in_flight: usize) -> Self {
        Self {
            inner,
            task,
            barrier: Barrier::new(in_flight),
        }
    }
}

#[async_trait]
impl ContentGenerator for BarrierGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        if request.task == self.task {
            self.barrier.wait().await;
        }
        self.inner.generate(request).await
    }
}

/// Tofu Day has two companies, Aviation Day one: three drafts in total.
fn three_drafts() -> MockGenerator {
    MockGenerator::new()
        .on_json(
            Task::Anniversaries,
            &[],
            json!({ "anniversaries": ["Tofu Day", "Aviation Day"] }),
        )
        .on_json(
            Task::Companies,
            &["\"Tofu Day\""],
            json!({ "companies": [company("Mame Foods"), company("Kinu Works")] }),
        )
        .on_json(
            Task::Companies,
            &["\"Aviation Day\""],
            json!({ "companies": [company("Sora Air")] }),
        )
        .on(Task::Draft, &["Mame Foods"], TOFU_POST)
        .on(Task::Draft, &["Kinu Works"], TOFU_POST_2)
        .on(Task::Draft, &["Sora Air"], FLIGHT_POST)
        .on(Task::SelectPerAnniversary, &["\"Tofu Day\""], TOFU_POST)
        .on(Task::SelectPerAnniversary, &["\"Aviation Day\""], FLIGHT_POST)
        .on(
            Task::SelectFinal,
            &[],
            format!("{TOFU_POST}{TWEET_SEPARATOR}{FLIGHT_POST}"),
        )
}

async fn run_with_barrier(task: Task, in_flight: usize) -> RunState {
    let generator = Arc::new(BarrierGenerator::new(three_drafts(), task, in_flight));
    let orchestrator = Orchestrator::new(generator, PipelineSettings::default());

    tokio::time::timeout(Duration::from_secs(5), orchestrator.run(today()))
        .await
        .unwrap_or_else(|_| panic!("{task} requests were not issued concurrently"))
        .unwrap()
}

#[tokio::test]
async fn company_lookups_run_concurrently() {
    let state = run_with_barrier(Task::Companies, 2).await;
    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![TOFU_POST, FLIGHT_POST]);
}

#[tokio::test]
async fn drafts_run_concurrently_across_anniversaries_and_companies() {
    let state = run_with_barrier(Task::Draft, 3).await;
    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.rejected_posts, vec![TOFU_POST_2]);
}

#[tokio::test]
async fn per_anniversary_selections_run_concurrently() {
    let state = run_with_barrier(Task::SelectPerAnniversary, 2).await;
    assert_eq!(state.stage, RunStage::Done);
    assert_eq!(state.final_posts, vec![TOFU_POST, FLIGHT_POST]);
}
