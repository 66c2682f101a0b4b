use candle_transformers::models::bert::Config as BertConfig;
use serde::Deserialize;

/// `config.json` of a pretrained BERT checkpoint plus the sequence
/// classification fields the encoder config does not carry.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(flatten)]
    pub bert_config: BertConfig,
    #[serde(flatten)]
    pub classifier_config: ClassifierConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_num_labels")]
    pub num_labels: usize,
}

// Label count a pretrained config implies when it names none.
fn default_num_labels() -> usize {
    2
}

impl Config {
    pub fn with_num_labels(mut self, num_labels: usize) -> Self {
        self.classifier_config.num_labels = num_labels;
        self
    }

    pub fn num_labels(&self) -> usize {
        self.classifier_config.num_labels
    }

    pub fn hidden_size(&self) -> usize {
        self.bert_config.hidden_size
    }
}
