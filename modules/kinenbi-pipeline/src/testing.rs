// Test mock for the pipeline's single trait boundary.
//
// MockGenerator answers by task plus prompt substrings and records every
// request, so tests can assert on prompts, temperatures and shapes.

use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use crate::traits::{ContentGenerator, GenerationRequest, Task};

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail(String),
    Panic(String),
}

#[derive(Debug, Clone)]
struct Rule {
    task: Task,
    needles: Vec<String>,
    reply: Reply,
}

impl Rule {
    fn matches(&self, request: &GenerationRequest) -> bool {
        self.task == request.task && self.needles.iter().all(|n| request.prompt.contains(n))
    }
}

/// Rule-based content generator. Returns `Err` for unmatched requests.
/// Rules are checked in registration order; the first whose task matches
/// and whose needles all appear in the prompt wins.
/// Builder pattern: `.on()`, `.on_json()`, `.fail()`, `.panic_on()`.
#[derive(Default)]
pub struct MockGenerator {
    rules: Vec<Rule>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    fn rule(mut self, task: Task, needles: &[&str], reply: Reply) -> Self {
        self.rules.push(Rule {
            task,
            needles: needles.iter().map(|n| n.to_string()).collect(),
            reply,
        });
        self
    }

    pub fn on(self, task: Task, needles: &[&str], text: impl Into<String>) -> Self {
        self.rule(task, needles, Reply::Text(text.into()))
    }

    pub fn on_json(self, task: Task, needles: &[&str], value: serde_json::Value) -> Self {
        self.rule(task, needles, Reply::Text(value.to_string()))
    }

    pub fn fail(self, task: Task, needles: &[&str], message: &str) -> Self {
        self.rule(task, needles, Reply::Fail(message.to_string()))
    }

    pub fn panic_on(self, task: Task, needles: &[&str], message: &str) -> Self {
        self.rule(task, needles, Reply::Panic(message.to_string()))
    }

    /// Every request seen so far, in arrival order.
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, task: Task) -> Vec<GenerationRequest> {
        self.calls()
            .into_iter()
            .filter(|c| c.task == task)
            .collect()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(&self, request: GenerationRequest) -> Result<String> {
        self.calls.lock().unwrap().push(request.clone());

        let reply = self
            .rules
            .iter()
            .find(|r| r.matches(&request))
            .map(|r| r.reply.clone());

        match reply {
            Some(Reply::Text(text)) => Ok(text),
            Some(Reply::Fail(message)) => bail!("{message}"),
            Some(Reply::Panic(message)) => panic!("{message}"),
            None => bail!("MockGenerator: no rule for {} request", request.task),
        }
    }
}
