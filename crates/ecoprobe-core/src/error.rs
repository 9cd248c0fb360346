use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Failed to parse configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Invalid HAR structure: {0}")]
    InvalidStructure(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid resource pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown rule: {0}")]
    UnknownRule(String),

    #[error("Script could not be parsed: {0}")]
    ScriptParse(String),

    #[error("Measurement source error: {0}")]
    Source(String),
}

pub type Result<T> = std::result::Result<T, Error>;
