use candle_core::{DType, Device, Tensor, D};
use serde::Serialize;
use tokenizers::{PaddingDirection, PostProcessor, Tokenizer, TruncationDirection};

use super::model::SentimentAnalysisModel;
use crate::error::{PipelineError, Result};
use crate::models::BertSequenceClassifier;
use crate::pipelines::stats::PipelineStats;
use crate::pipelines::utils::DeviceKind;

/// Token budget used when the caller does not choose one.
pub const DEFAULT_MAX_LENGTH: usize = 128;

// ============ Output types ============

/// The two sentiment classes, in class-id order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SentimentLabel {
    /// Class 0.
    Negatif,
    /// Class 1.
    Positif,
}

impl SentimentLabel {
    /// All labels, indexed by class id.
    pub const ALL: [SentimentLabel; 2] = [SentimentLabel::Negatif, SentimentLabel::Positif];

    /// Class id (`0` or `1`).
    pub fn id(self) -> usize {
        match self {
            SentimentLabel::Negatif => 0,
            SentimentLabel::Positif => 1,
        }
    }

    /// Display name (`"Negatif"` or `"Positif"`).
    pub fn name(self) -> &'static str {
        match self {
            SentimentLabel::Negatif => "Negatif",
            SentimentLabel::Positif => "Positif",
        }
    }

    /// Label for a class id, `None` outside `0..2`.
    pub fn from_id(id: usize) -> Option<Self> {
        Self::ALL.get(id).copied()
    }

    /// Argmax over the two probabilities. Class 0 wins exact ties.
    pub fn from_probs(probs: &[f32; 2]) -> Self {
        if probs[1] > probs[0] {
            SentimentLabel::Positif
        } else {
            SentimentLabel::Negatif
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying one text.
///
/// `probs` and `logits` are indexed by class id (`0` = negative, `1` = positive).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Index of the larger probability.
    pub label_id: usize,
    /// `"Negatif"` or `"Positif"`.
    pub label_name: &'static str,
    /// Softmax of `logits`; sums to 1.
    pub probs: [f32; 2],
    /// Raw classifier scores.
    pub logits: [f32; 2],
}

impl PredictionResult {
    pub(crate) fn new(logits: [f32; 2], probs: [f32; 2]) -> Self {
        let label = SentimentLabel::from_probs(&probs);
        Self {
            label_id: label.id(),
            label_name: label.name(),
            probs,
            logits,
        }
    }

    /// The predicted label.
    pub fn label(&self) -> SentimentLabel {
        SentimentLabel::from_probs(&self.probs)
    }

    /// Probability of the predicted label.
    pub fn confidence(&self) -> f32 {
        self.probs[self.label_id]
    }
}

/// Single-text output from [`SentimentPipeline::run`].
#[derive(Debug)]
pub struct Output {
    /// Sentiment prediction.
    pub prediction: PredictionResult,
    /// Execution statistics.
    pub stats: PipelineStats,
}

// ============ Encoding ============

/// Token ids, segment ids, and attention mask for a batch of one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    /// Token ids, special tokens included.
    pub ids: Vec<u32>,
    /// Segment ids (all zero for a single sequence).
    pub type_ids: Vec<u32>,
    /// `1` for real tokens, `0` for padding.
    pub attention_mask: Vec<u32>,
}

impl EncodedInput {
    /// Sequence length fed to the model.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// `true` if no tokens were produced.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn to_tensors(&self, device: &Device) -> Result<(Tensor, Tensor, Tensor)> {
        let input_ids = Tensor::new(self.ids.as_slice(), device)?.unsqueeze(0)?;
        let token_type_ids = Tensor::new(self.type_ids.as_slice(), device)?.unsqueeze(0)?;
        let attention_mask = Tensor::new(self.attention_mask.as_slice(), device)?.unsqueeze(0)?;
        Ok((input_ids, token_type_ids, attention_mask))
    }
}

/// Tokenize one text, keeping at most `max_length` tokens (special tokens included).
///
/// Truncation drops tokens from the end, so the start of the text is always scored.
/// Padding follows the tokenizer's padding policy.
pub fn encode_single(tokenizer: &Tokenizer, text: &str, max_length: usize) -> Result<EncodedInput> {
    let added = tokenizer
        .get_post_processor()
        .map_or(0, |p| p.added_tokens(false));
    if max_length <= added {
        return Err(PipelineError::Tokenization(format!(
            "max_length {max_length} leaves no room for text after {added} special tokens"
        )));
    }

    let preview = || text.chars().take(50).collect::<String>();
    let mut encoding = tokenizer.encode(text, false).map_err(|e| {
        PipelineError::Tokenization(format!("Tokenization failed on '{}': {}", preview(), e))
    })?;

    // A fixed-length padding policy has already padded the bare tokens; keep only real ones.
    let real = encoding
        .get_attention_mask()
        .iter()
        .filter(|&&m| m == 1)
        .count();
    if real < encoding.len() {
        let padded_side = match tokenizer.get_padding().map(|p| p.direction) {
            Some(PaddingDirection::Left) => TruncationDirection::Left,
            _ => TruncationDirection::Right,
        };
        encoding.truncate(real, 0, padded_side);
    }
    encoding.truncate(max_length - added, 0, TruncationDirection::Right);
    encoding.take_overflowing();

    let encoding = tokenizer.post_process(encoding, None, true).map_err(|e| {
        PipelineError::Tokenization(format!("Tokenization failed on '{}': {}", preview(), e))
    })?;

    if encoding.is_empty() {
        return Err(PipelineError::Tokenization(format!(
            "Tokenizer produced no tokens for '{}'",
            preview()
        )));
    }

    Ok(EncodedInput {
        ids: encoding.get_ids().to_vec(),
        type_ids: encoding.get_type_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
    })
}

// ============ Inference ============

/// Softmax over the last dimension, shifted by the row max so large logits cannot overflow.
pub fn stable_softmax(logits: &Tensor) -> candle_core::Result<Tensor> {
    let max = logits.max_keepdim(D::Minus1)?;
    let exp = logits.broadcast_sub(&max)?.exp()?;
    let sum = exp.sum_keepdim(D::Minus1)?;
    exp.broadcast_div(&sum)
}

fn to_host_pair(scores: &Tensor) -> Result<[f32; 2]> {
    let values = scores.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?;
    <[f32; 2]>::try_from(values.as_slice()).map_err(|_| {
        PipelineError::Unexpected(format!(
            "Expected 2 class scores, model returned {}",
            values.len()
        ))
    })
}

/// Classify one text as `Negatif` or `Positif`.
///
/// Tokenizes `text` (at most `max_length` tokens), runs one forward pass on `device`,
/// and returns host-side logits and softmax probabilities.
///
/// # Errors
///
/// - [`PipelineError::InvalidInput`] if `text` is empty or whitespace only.
/// - [`PipelineError::Tokenization`] if the tokenizer rejects the input.
/// - [`PipelineError::Device`] if `device` is not the device the model was loaded on.
/// - [`PipelineError::Unexpected`] if the forward pass fails.
///
/// # Examples
///
/// ```rust,no_run
/// use indobert_sentiment::{load_model, predict_sentiment};
///
/// # fn main() -> indobert_sentiment::error::Result<()> {
/// let (tokenizer, model, device) = load_model()?;
/// let result = predict_sentiment(
///     "aku senang banget karena masih ada orang tua yang peduli sama aku",
///     &tokenizer,
///     &model,
///     &device,
///     128,
/// )?;
/// println!("{} {:?}", result.label_name, result.probs);
/// # Ok(())
/// # }
/// ```
pub fn predict_sentiment<M: SentimentAnalysisModel>(
    text: &str,
    tokenizer: &Tokenizer,
    model: &M,
    device: &Device,
    max_length: usize,
) -> Result<PredictionResult> {
    predict_encoded(text, tokenizer, model, device, max_length).map(|(result, _)| result)
}

fn predict_encoded<M: SentimentAnalysisModel>(
    text: &str,
    tokenizer: &Tokenizer,
    model: &M,
    device: &Device,
    max_length: usize,
) -> Result<(PredictionResult, usize)> {
    if text.trim().is_empty() {
        return Err(PipelineError::InvalidInput("Input text is empty".to_string()));
    }

    if !device.same_device(model.device()) {
        return Err(PipelineError::Device(format!(
            "Inputs would be placed on {:?} but the model lives on {:?}",
            device.location(),
            model.device().location()
        )));
    }

    if let Some(limit) = model.max_position_embeddings() {
        if max_length > limit {
            tracing::warn!(
                max_length,
                limit,
                "max_length exceeds the model's position embeddings; long texts will fail"
            );
        }
    }

    let input = encode_single(tokenizer, text, max_length)?;
    let (input_ids, token_type_ids, attention_mask) = input.to_tensors(device)?;

    let logits = model.forward(&input_ids, &token_type_ids, &attention_mask)?;
    let probs = stable_softmax(&logits)?;

    let result = PredictionResult::new(to_host_pair(&logits)?, to_host_pair(&probs)?);

    tracing::debug!(
        tokens = input.len(),
        label = result.label_name,
        p_neg = result.probs[0],
        p_pos = result.probs[1],
        "classified text"
    );

    Ok((result, input.len()))
}

// ============ Pipeline ============

/// Loaded tokenizer, model, and device, bundled for repeated predictions.
///
/// Construct with [`SentimentPipelineBuilder`](super::SentimentPipelineBuilder), or wrap
/// handles from [`load_model`](crate::load_model) with [`SentimentPipeline::new`].
///
/// # Examples
///
/// ```rust,no_run
/// # use indobert_sentiment::sentiment::SentimentPipelineBuilder;
/// # fn main() -> indobert_sentiment::error::Result<()> {
/// let pipeline = SentimentPipelineBuilder::new().build()?;
///
/// let output = pipeline.run("mertua saya selalu bikin saya sedih")?;
/// println!("{}: {:.3}", output.prediction.label_name, output.prediction.confidence());
/// # Ok(())
/// # }
/// ```
pub struct SentimentPipeline<M: SentimentAnalysisModel = BertSequenceClassifier> {
    pub(crate) model: M,
    pub(crate) tokenizer: Tokenizer,
    pub(crate) device: Device,
    pub(crate) max_length: usize,
}

impl<M: SentimentAnalysisModel> SentimentPipeline<M> {
    /// Bundle already loaded handles, using [`DEFAULT_MAX_LENGTH`].
    pub fn new(tokenizer: Tokenizer, model: M, device: Device) -> Self {
        Self {
            model,
            tokenizer,
            device,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Change the token budget for subsequent predictions.
    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Classify one text, with timing stats.
    pub fn run(&self, text: &str) -> Result<Output> {
        let stats_builder = PipelineStats::start();
        let (prediction, tokens) = predict_encoded(
            text,
            &self.tokenizer,
            &self.model,
            &self.device,
            self.max_length,
        )?;
        Ok(Output {
            prediction,
            stats: stats_builder.finish(tokens),
        })
    }

    /// Classify one text.
    pub fn predict(&self, text: &str) -> Result<PredictionResult> {
        predict_sentiment(
            text,
            &self.tokenizer,
            &self.model,
            &self.device,
            self.max_length,
        )
    }

    /// Returns the device (CPU/GPU) the model is running on.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Whether inference runs on an accelerator or the CPU.
    pub fn device_kind(&self) -> DeviceKind {
        DeviceKind::of(&self.device)
    }

    /// Token budget per prediction.
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// The loaded tokenizer.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// The loaded model.
    pub fn model(&self) -> &M {
        &self.model
    }
}
