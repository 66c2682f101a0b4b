//! Serves a fine-tuned BERT sentence-pair classifier (entailment,
//! contradiction, neutral) behind a small web demo.
//!
//! Startup is linear: [`args::resolve`] picks the deploy configuration,
//! [`classifier::PairClassifier::load`] materializes the checkpoint and its
//! tokenizer, and [`web::app`] wraps the classifier in an HTTP router.

pub mod args;
pub mod checkpoint;
pub mod classifier;
pub mod error;
pub mod inference;
pub mod model;
pub mod pretrained;
pub mod tokenizer;
pub mod web;
