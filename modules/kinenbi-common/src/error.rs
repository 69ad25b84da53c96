use thiserror::Error;

#[derive(Error, Debug)]
pub enum KinenbiError {
    #[error("Configuration error: {0}")]
    Config(String),
}
