pub use candle_core::Device;
use candle_core::{Tensor, D};
use std::fs::File;
use std::path::Path;
use tokenizers::Tokenizer;

use crate::args::DeployArguments;
use crate::checkpoint::{Checkpoint, StateDictSchema};
use crate::error::{Error, Result};
use crate::inference::{Inference, InferenceResult, PairLabel};
use crate::model::{materialize_model, BertForSequenceClassification, Config};
use crate::pretrained::PretrainedFiles;
use crate::tokenizer;

/// Loads the fine-tuned checkpoint at `checkpoint_path` into the architecture
/// of `pretrained_model_name` and returns it with its cased tokenizer.
pub fn materialize<P: AsRef<Path>>(
    checkpoint_path: P,
    pretrained_model_name: &str,
    device: &Device,
) -> Result<(BertForSequenceClassification, Tokenizer)> {
    let checkpoint = Checkpoint::load(checkpoint_path)?;
    let num_labels = checkpoint.num_labels()?;
    tracing::info!(tensors = checkpoint.len(), num_labels, "loaded checkpoint");

    let files = PretrainedFiles::resolve(pretrained_model_name)?;
    let config_reader = File::open(&files.config)?;
    let config: Config = serde_json::from_reader(config_reader)?;
    let config = config.with_num_labels(num_labels);

    let state_dict = checkpoint.into_state_dict(StateDictSchema::LightningV1)?;
    let model = materialize_model(&config, state_dict, device)?;
    let tokenizer = tokenizer::load_cased(&files.tokenizer)?;
    Ok((model, tokenizer))
}

/// Premise/hypothesis classifier held for the lifetime of the server.
pub struct PairClassifier {
    model: BertForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
}

impl PairClassifier {
    pub fn load(args: &DeployArguments, device: Device) -> Result<Self> {
        let (model, tokenizer) = materialize(
            &args.downstream_model_checkpoint_path,
            &args.pretrained_model_name,
            &device,
        )?;
        Self::new(model, tokenizer, args.max_seq_length, device)
    }

    pub fn new(
        model: BertForSequenceClassification,
        mut tokenizer: Tokenizer,
        max_seq_length: usize,
        device: Device,
    ) -> Result<Self> {
        if model.num_labels() != PairLabel::ALL.len() {
            return Err(Error::UnsupportedLabelCount {
                expected: PairLabel::ALL.len(),
                actual: model.num_labels(),
            });
        }
        tokenizer::with_fixed_length(&mut tokenizer, max_seq_length)?;
        Ok(Self {
            model,
            tokenizer,
            device,
        })
    }

    /// Softmax over the classifier outputs for one pair, in
    /// [`PairLabel::ALL`] order.
    pub fn probabilities(&self, premise: &str, hypothesis: &str) -> Result<Vec<f32>> {
        let encoding = self.tokenizer.encode((premise, hypothesis), true)?;
        let input_ids = Tensor::new(encoding.get_ids(), &self.device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(encoding.get_type_ids(), &self.device)?.unsqueeze(0)?;
        let attention_mask =
            Tensor::new(encoding.get_attention_mask(), &self.device)?.unsqueeze(0)?;

        let logits = self
            .model
            .forward(&input_ids, &token_type_ids, &attention_mask)?;
        let probs = candle_nn::ops::softmax(&logits, D::Minus1)?;
        Ok(probs.squeeze(0)?.to_vec1()?)
    }
}

impl Inference for PairClassifier {
    fn infer(&self, premise: &str, hypothesis: &str) -> Result<InferenceResult> {
        let probs = self.probabilities(premise, hypothesis)?;
        tracing::debug!(?probs, "classified pair");
        InferenceResult::from_probabilities(premise, hypothesis, &probs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::argmax;
    use crate::model::config::tests::TINY_BERT_CONFIG;
    use crate::model::tests::random_checkpoint_tensors;
    use crate::tokenizer::tests::write_vocab;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    /// A pretrained directory and a checkpoint fine-tuned from it, on disk.
    struct Deployment {
        _dir: TempDir,
        args: DeployArguments,
    }

    fn deployment(num_labels: usize, max_seq_length: usize) -> Deployment {
        let dir = tempfile::tempdir().unwrap();
        let pretrained = dir.path().join("tiny-bert");
        std::fs::create_dir(&pretrained).unwrap();
        std::fs::write(pretrained.join("config.json"), TINY_BERT_CONFIG).unwrap();
        write_vocab(&pretrained);

        let checkpoint = dir.path().join("epoch=0.safetensors");
        candle_core::safetensors::save(&random_checkpoint_tensors(num_labels), &checkpoint)
            .unwrap();

        let args = DeployArguments {
            pretrained_model_name: pretrained.to_str().unwrap().to_string(),
            downstream_model_checkpoint_path: checkpoint,
            max_seq_length,
            ..DeployArguments::default()
        };
        Deployment { _dir: dir, args }
    }

    #[fixture]
    fn classifier() -> PairClassifier {
        let deployment = deployment(3, 12);
        PairClassifier::load(&deployment.args, Device::Cpu).unwrap()
    }

    #[rstest]
    fn materialize_reports_checkpoint_label_count() {
        let deployment = deployment(3, 12);
        let (model, tokenizer) = materialize(
            &deployment.args.downstream_model_checkpoint_path,
            &deployment.args.pretrained_model_name,
            &Device::Cpu,
        )
        .unwrap();
        assert_eq!(model.num_labels(), 3);
        assert_eq!(tokenizer.token_to_id("[CLS]"), Some(2));
    }

    #[rstest]
    fn probabilities_sum_to_one(classifier: PairClassifier) {
        let probs = classifier
            .probabilities("a man is playing the guitar", "the man is sleeping")
            .unwrap();
        assert_eq!(probs.len(), 3);
        assert!((probs.iter().sum::<f32>() - 1.0).abs() < 1e-5);
    }

    #[rstest]
    fn prediction_matches_argmax_of_probabilities(classifier: PairClassifier) {
        let premise = "a dog runs";
        let hypothesis = "no one runs";
        let probs = classifier.probabilities(premise, hypothesis).unwrap();
        let result = classifier.infer(premise, hypothesis).unwrap();
        assert_eq!(result.prediction, PairLabel::ALL[argmax(&probs)]);
        assert_eq!(result.premise, premise);
        assert_eq!(result.hypothesis, hypothesis);
        assert!(result.entailment_width.ends_with('%'));
    }

    #[rstest]
    fn inference_is_repeatable(classifier: PairClassifier) {
        let first = classifier.infer("the cat", "a cat").unwrap();
        let second = classifier.infer("the cat", "a cat").unwrap();
        assert_eq!(first, second);
    }

    #[rstest]
    fn long_inputs_are_truncated(classifier: PairClassifier) {
        let premise = "a man is playing the guitar ".repeat(20);
        assert!(classifier.infer(&premise, "music").is_ok());
    }

    #[rstest]
    #[case(2)]
    #[case(4)]
    fn non_three_way_checkpoint_is_rejected(#[case] num_labels: usize) {
        let deployment = deployment(num_labels, 12);
        let Err(err) = PairClassifier::load(&deployment.args, Device::Cpu) else {
            panic!("{num_labels}-way checkpoint was accepted");
        };
        assert!(matches!(
            err,
            Error::UnsupportedLabelCount { expected: 3, actual } if actual == num_labels
        ));
    }

    #[rstest]
    fn missing_checkpoint_file_fails() {
        let mut deployment = deployment(3, 12);
        deployment.args.downstream_model_checkpoint_path =
            deployment.args.downstream_model_checkpoint_path.with_file_name("missing.safetensors");
        assert!(PairClassifier::load(&deployment.args, Device::Cpu).is_err());
    }
}
