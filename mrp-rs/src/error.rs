use std::io;

pub type MrpResult<T> = Result<T, MrpError>;

/// Errors raised while loading a run record or writing run outputs.
#[derive(Debug, thiserror::Error)]
pub enum MrpError {
    #[error("no run record on stdin")]
    EmptyInput,

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML run record: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to deserialize input: {0}")]
    Input(serde_json::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}
