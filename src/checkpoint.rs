//! Fine-tuned checkpoints and the key schema that maps them onto the bare
//! inference model.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use candle_core::{Device, Tensor};

use crate::error::{Error, Result};

/// Entry holding the parameters inside a training checkpoint.
pub const STATE_DICT_KEY: &str = "state_dict";

/// Bias of the final classification layer; its length is the label count.
pub const CLASSIFIER_BIAS_KEY: &str = "model.classifier.bias";

/// Parameters keyed by their bare model names.
pub type StateDict = BTreeMap<String, Tensor>;

/// A fine-tuned checkpoint with its parameter names exactly as saved by the
/// training wrapper. Every tensor lives on the CPU.
#[derive(Debug)]
pub struct Checkpoint {
    tensors: HashMap<String, Tensor>,
}

impl Checkpoint {
    /// Reads a checkpoint from disk. PyTorch files (`.ckpt`, `.pt`, `.pth`)
    /// are read from their `state_dict` entry; `.safetensors` files are
    /// expected to hold the state dict directly.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        let tensors = match extension {
            "ckpt" | "pt" | "pth" => {
                candle_core::pickle::read_all_with_key(path, Some(STATE_DICT_KEY))?
                    .into_iter()
                    .collect()
            }
            "safetensors" => candle_core::safetensors::load(path, &Device::Cpu)?,
            _ => return Err(Error::UnsupportedCheckpoint(path.to_path_buf())),
        };
        tracing::debug!(path = %path.display(), tensors = tensors.len(), "read checkpoint");
        Ok(Self { tensors })
    }

    #[cfg(test)]
    pub(crate) fn from_tensors(tensors: HashMap<String, Tensor>) -> Self {
        Self { tensors }
    }

    pub(crate) fn len(&self) -> usize {
        self.tensors.len()
    }

    #[cfg(test)]
    fn get(&self, key: &str) -> Option<&Tensor> {
        self.tensors.get(key)
    }

    /// Number of output classes, read off the classifier bias.
    pub fn num_labels(&self) -> Result<usize> {
        self.tensors
            .get(CLASSIFIER_BIAS_KEY)
            .map(Tensor::elem_count)
            .ok_or_else(|| Error::MissingCheckpointKey(CLASSIFIER_BIAS_KEY.to_string()))
    }

    /// Renames every parameter according to `schema`.
    pub fn into_state_dict(self, schema: StateDictSchema) -> Result<StateDict> {
        schema.apply(self.tensors)
    }
}

/// Naming conventions a checkpoint may be saved under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateDictSchema {
    /// Classifier trained inside a Lightning module that stores the model
    /// under its `model` attribute, so every key starts with `model.`.
    #[default]
    LightningV1,
}

impl StateDictSchema {
    fn prefix(self) -> &'static str {
        match self {
            Self::LightningV1 => "model.",
        }
    }

    /// Buffers that are saved alongside parameters but are not loaded.
    fn is_buffer(self, name: &str) -> bool {
        match self {
            Self::LightningV1 => name.ends_with("position_ids"),
        }
    }

    /// Strips the schema prefix from every key. A key without the prefix is
    /// rejected instead of being passed through.
    pub fn apply(self, tensors: HashMap<String, Tensor>) -> Result<StateDict> {
        let prefix = self.prefix();
        let mut state_dict = StateDict::new();
        for (key, tensor) in tensors {
            let name = key
                .strip_prefix(prefix)
                .ok_or_else(|| Error::UnprefixedKey {
                    key: key.clone(),
                    prefix,
                })?;
            if self.is_buffer(name) {
                tracing::debug!(key = %key, "skipping buffer");
                continue;
            }
            state_dict.insert(name.to_string(), tensor);
        }
        Ok(state_dict)
    }
}
