//! Locating the files of the pretrained encoder a checkpoint was fine-tuned
//! from: either a local directory or a model id on the Hugging Face Hub.

use std::path::{Path, PathBuf};

use hf_hub::api::sync::Api;

use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenizerFile {
    /// A serialized `tokenizers` pipeline.
    Json(PathBuf),
    /// A bare WordPiece vocabulary, one token per line.
    Vocab(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PretrainedFiles {
    pub config: PathBuf,
    pub tokenizer: TokenizerFile,
}

impl PretrainedFiles {
    pub fn resolve(name: &str) -> Result<Self> {
        let dir = Path::new(name);
        if dir.is_dir() {
            return Self::from_dir(dir);
        }
        tracing::info!(model = name, "fetching pretrained files from the hub");
        let repo = Api::new()?.model(name.to_string());
        let config = repo.get("config.json")?;
        let tokenizer = match repo.get("tokenizer.json") {
            Ok(path) => TokenizerFile::Json(path),
            Err(err) => {
                tracing::debug!(model = name, error = %err, "no tokenizer.json, using vocab.txt");
                TokenizerFile::Vocab(repo.get("vocab.txt")?)
            }
        };
        Ok(Self { config, tokenizer })
    }

    pub fn from_dir(dir: &Path) -> Result<Self> {
        let config = dir.join("config.json");
        if !config.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{} not found", config.display()),
            )
            .into());
        }
        let tokenizer_json = dir.join("tokenizer.json");
        let tokenizer = if tokenizer_json.is_file() {
            TokenizerFile::Json(tokenizer_json)
        } else {
            TokenizerFile::Vocab(dir.join("vocab.txt"))
        };
        Ok(Self { config, tokenizer })
    }
}
