//! Turning pair-classification probabilities into the record the web demo
//! renders.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Anything that can classify a premise/hypothesis pair.
pub trait Inference: Send + Sync {
    fn infer(&self, premise: &str, hypothesis: &str) -> Result<InferenceResult>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairLabel {
    Entailment,
    Contradiction,
    Neutral,
}

impl PairLabel {
    /// Labels in the order of the classifier outputs.
    pub const ALL: [PairLabel; 3] = [Self::Entailment, Self::Contradiction, Self::Neutral];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Entailment => "entailment",
            Self::Contradiction => "contradiction",
            Self::Neutral => "neutral",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceResult {
    pub premise: String,
    pub hypothesis: String,
    pub prediction: PairLabel,
    pub entailment_data: String,
    pub contradiction_data: String,
    pub neutral_data: String,
    pub entailment_width: String,
    pub contradiction_width: String,
    pub neutral_width: String,
}

impl InferenceResult {
    /// Builds the display record from the softmax output of one pair.
    pub fn from_probabilities(premise: &str, hypothesis: &str, probs: &[f32]) -> Result<Self> {
        let [entailment, contradiction, neutral] = <[f32; 3]>::try_from(probs)
            .map_err(|_| Error::UnexpectedLogits(probs.len()))?;
        let prediction = PairLabel::ALL[argmax(&[entailment, contradiction, neutral])];

        let [entailment, contradiction, neutral] =
            [entailment, contradiction, neutral].map(|p| round2(f64::from(p)));
        Ok(Self {
            premise: premise.to_string(),
            hypothesis: hypothesis.to_string(),
            prediction,
            entailment_data: data(PairLabel::Entailment, entailment),
            contradiction_data: data(PairLabel::Contradiction, contradiction),
            neutral_data: data(PairLabel::Neutral, neutral),
            entailment_width: width(entailment),
            contradiction_width: width(contradiction),
            neutral_width: width(neutral),
        })
    }
}

/// Index of the largest value; the first one wins a tie.
pub fn argmax(values: &[f32]) -> usize {
    values
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |(best, max), (i, &v)| {
            if v > max {
                (i, v)
            } else {
                (best, max)
            }
        })
        .0
}

/// Rounds to two decimal digits, halfway cases to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Shortest representation that round-trips, always with a fractional part:
/// `0.7`, `70.0`, `28.999999999999996`.
pub fn format_float(value: f64) -> String {
    format!("{value:?}")
}

fn data(label: PairLabel, prob: f64) -> String {
    format!("{} {}", label.as_str(), format_float(prob))
}

fn width(prob: f64) -> String {
    format!("{}%", format_float(prob * 100.0))
}
