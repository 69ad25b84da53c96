pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, GlobalSelectionMode, PipelineSettings};
pub use error::KinenbiError;
pub use types::*;
