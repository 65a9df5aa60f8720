//! Sentiment analysis for Indonesian text.
//!
//! Classify text as `Negatif` or `Positif` with a fine-tuned IndoBERT checkpoint.
//! Returns the label, both class probabilities, and the raw logits.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use indobert_sentiment::sentiment::SentimentPipelineBuilder;
//!
//! # fn main() -> indobert_sentiment::error::Result<()> {
//! let pipeline = SentimentPipelineBuilder::new().build()?;
//!
//! let output = pipeline.run("aku senang banget karena masih ada orang tua yang peduli sama aku")?;
//! let p = output.prediction;
//! println!("{} (negatif {:.3}, positif {:.3})", p.label_name, p.probs[0], p.probs[1]);
//! # Ok(())
//! # }
//! ```
//!
//! # Loading handles directly
//!
//! [`load_model`] returns the tokenizer, model, and device separately; pass them to
//! [`predict_sentiment`] for each request. Loading is slow, so do it once per process.

// ============ Internal API ============

pub(crate) mod builder;
pub(crate) mod model;
pub(crate) mod pipeline;

// ============ Public API ============

pub use crate::loaders::{
    load_model, load_model_from, ModelPaths, DEFAULT_CHECKPOINT, DEFAULT_MODELS_DIR,
};
pub use crate::models::BertSequenceClassifier;
pub use crate::pipelines::stats::PipelineStats;
pub use crate::pipelines::utils::{DeviceKind, DeviceRequest};
pub use builder::SentimentPipelineBuilder;
pub use model::SentimentAnalysisModel;
pub use pipeline::{
    encode_single, predict_sentiment, stable_softmax, EncodedInput, Output, PredictionResult,
    SentimentLabel, SentimentPipeline, DEFAULT_MAX_LENGTH,
};
