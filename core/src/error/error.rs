use thiserror::Error;

use super::{FileError, StreamError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error("stream failed: {0}")]
    Stream(#[from] StreamError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("file error: {0}")]
    File(#[from] FileError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("game '{0}' is not configured")]
    GameNotConfigured(String),
    #[error("game '{game}' is missing required setting '{field}'")]
    MissingField { game: String, field: &'static str },
    #[error("invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
