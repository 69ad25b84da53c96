pub mod anniversary;
pub mod company;
pub mod drafter;
pub mod orchestrator;
pub mod prompts;
pub mod selection;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use orchestrator::{Orchestrator, RunError, RunOutcome};
pub use selection::TWEET_SEPARATOR;
pub use traits::{ContentGenerator, GenerationRequest, ResponseShape, Task};
