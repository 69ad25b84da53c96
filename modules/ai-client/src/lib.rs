pub mod error;
pub mod gemini;
pub mod schema;
pub mod traits;
pub mod util;

pub use error::AiError;
pub use gemini::{Gemini, GenerateOptions};
pub use schema::StructuredOutput;
pub use traits::{OutputBuilder, PromptBuilder};
pub use util::{normalize_whitespace, strip_code_blocks, truncate_to_char_boundary};
