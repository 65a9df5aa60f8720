use std::path::PathBuf;

use super::pipeline::{SentimentPipeline, DEFAULT_MAX_LENGTH};
use crate::error::Result;
use crate::loaders::{load_model_from, ModelPaths};
use crate::pipelines::utils::DeviceRequest;

/// Builder for creating [`SentimentPipeline`] instances.
///
/// Defaults to the deployment paths, automatic device selection, and
/// [`DEFAULT_MAX_LENGTH`].
///
/// # Examples
///
/// ```rust,no_run
/// # use indobert_sentiment::sentiment::SentimentPipelineBuilder;
/// # fn main() -> indobert_sentiment::error::Result<()> {
/// let pipeline = SentimentPipelineBuilder::new()
///     .models_dir("/srv/models/indoBERT_best")
///     .cpu()
///     .max_length(256)
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SentimentPipelineBuilder {
    paths: ModelPaths,
    device_request: DeviceRequest,
    max_length: usize,
}

impl SentimentPipelineBuilder {
    /// Builder with default paths and device selection.
    pub fn new() -> Self {
        Self {
            paths: ModelPaths::default(),
            device_request: DeviceRequest::Auto,
            max_length: DEFAULT_MAX_LENGTH,
        }
    }

    /// Base directory holding the tokenizer and the checkpoint subdirectory.
    pub fn models_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.paths = ModelPaths::new(dir);
        self
    }

    /// Use CPU for inference.
    pub fn cpu(mut self) -> Self {
        self.device_request = DeviceRequest::Cpu;
        self
    }

    /// Use a specific CUDA GPU for inference.
    pub fn cuda(mut self, index: usize) -> Self {
        self.device_request = DeviceRequest::Cuda(index);
        self
    }

    /// Use a specific Metal GPU for inference.
    pub fn metal(mut self, index: usize) -> Self {
        self.device_request = DeviceRequest::Metal(index);
        self
    }

    /// Token budget per prediction.
    pub fn max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    /// Loads the tokenizer and model.
    ///
    /// # Errors
    ///
    /// Returns an error if model loading or device initialization fails.
    pub fn build(self) -> Result<SentimentPipeline> {
        let (tokenizer, model, device) = load_model_from(&self.paths, self.device_request)?;
        Ok(SentimentPipeline::new(tokenizer, model, device).with_max_length(self.max_length))
    }
}

impl Default for SentimentPipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;

    #[test]
    fn missing_models_dir_fails_with_load_error() {
        let err = SentimentPipelineBuilder::new()
            .models_dir("/nonexistent/indoBERT_best")
            .cpu()
            .build()
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Load(_)));
        assert!(err.is_fatal());
    }
}
