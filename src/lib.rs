//! Sentiment classification for Indonesian maternal mental-health text.
//!
//! Powered by [Candle](https://github.com/huggingface/candle). Loads a fine-tuned IndoBERT
//! checkpoint and labels one text at a time as `Negatif` or `Positif`, with probabilities.
//!
//! ```rust,no_run
//! use indobert_sentiment::{load_model, predict_sentiment};
//!
//! # fn main() -> indobert_sentiment::error::Result<()> {
//! let (tokenizer, model, device) = load_model()?;
//! let result = predict_sentiment("saya sedih sekali", &tokenizer, &model, &device, 128)?;
//! println!("{} {:?}", result.label_name, result.probs);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

// ============ Internal API ============

pub(crate) mod loaders;
pub(crate) mod models;
pub(crate) mod pipelines;

// ============ Public API ============

pub mod error;

pub use pipelines::sentiment;
pub use sentiment::{load_model, predict_sentiment, PredictionResult, SentimentLabel};
