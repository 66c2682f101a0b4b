use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("tokenizer error: {0}")]
    TokenizerError(#[from] tokenizers::Error),
    #[error("candle error: {0}")]
    CandleError(#[from] candle_core::Error),
    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IOError(#[from] std::io::Error),
    #[error("{0}")]
    Cli(#[from] clap::Error),
    #[error("hub error: {0}")]
    HubError(#[from] hf_hub::api::sync::ApiError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("unsupported checkpoint format: {}", .0.display())]
    UnsupportedCheckpoint(PathBuf),
    #[error("checkpoint has no tensor named \"{0}\"")]
    MissingCheckpointKey(String),
    #[error("checkpoint key \"{key}\" does not start with \"{prefix}\"")]
    UnprefixedKey { key: String, prefix: &'static str },
    #[error("checkpoint parameter \"{0}\" has no counterpart in the model")]
    UnexpectedParameter(String),
    #[error("model parameter \"{0}\" is missing from the checkpoint")]
    MissingParameter(String),
    #[error("parameter \"{name}\" has shape {actual:?} in the checkpoint but {expected:?} in the model")]
    ShapeMismatch {
        name: String,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },
    #[error("pair classification needs {expected} labels but the checkpoint has {actual}")]
    UnsupportedLabelCount { expected: usize, actual: usize },
    #[error("model produced {0} logits per example")]
    UnexpectedLogits(usize),
    #[error("tokenizer vocabulary has no \"{0}\" token")]
    MissingSpecialToken(String),
    #[error("inference task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;
