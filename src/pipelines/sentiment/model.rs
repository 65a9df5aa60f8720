use crate::error::Result;
use candle_core::{Device, Tensor};

/// A two-class sequence classifier usable by [`predict_sentiment`](super::predict_sentiment).
pub trait SentimentAnalysisModel {
    /// Raw class scores of shape `(1, 2)` for one encoded sequence.
    ///
    /// All inputs have shape `(1, seq_len)` and live on [`Self::device`].
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor>;

    /// Device the model parameters live on.
    fn device(&self) -> &Device;

    /// Longest sequence the position embeddings can address, if bounded.
    fn max_position_embeddings(&self) -> Option<usize> {
        None
    }
}
