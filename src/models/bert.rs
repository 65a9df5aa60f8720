//! BERT sequence classifier (`BertForSequenceClassification` layout).
//!
//! candle-transformers ships the encoder only. The pooler (`bert.pooler.dense`, tanh over
//! the `[CLS]` state) and the linear `classifier` head are added here. Dropout from the
//! training graph is never built, so the model is always in inference mode.

use candle_core::{Device, IndexOp, Tensor};
use candle_nn::{Linear, Module, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::loaders::{CheckpointLoader, NUM_LABELS};
use crate::pipelines::sentiment::model::SentimentAnalysisModel;

/// Fine-tuned two-class BERT classifier bound to one device.
pub struct BertSequenceClassifier {
    bert: BertModel,
    pooler: Linear,
    classifier: Linear,
    device: Device,
    max_position_embeddings: usize,
    span: tracing::Span,
}

impl BertSequenceClassifier {
    /// Build from a var builder rooted at the checkpoint (`bert.*`, `classifier.*`).
    pub fn load(
        vb: VarBuilder,
        config: &Config,
        hidden_size: usize,
        max_position_embeddings: usize,
    ) -> candle_core::Result<Self> {
        let device = vb.device().clone();
        let bert = BertModel::load(vb.pp("bert"), config)?;
        let pooler = candle_nn::linear(hidden_size, hidden_size, vb.pp("bert.pooler.dense"))?;
        let classifier = candle_nn::linear(hidden_size, NUM_LABELS, vb.pp("classifier"))?;
        let span = tracing::span!(tracing::Level::TRACE, "bert-classifier");

        Ok(Self {
            bert,
            pooler,
            classifier,
            device,
            max_position_embeddings,
            span,
        })
    }

    /// Load `config.json` and weights from a trainer checkpoint directory onto `device`.
    pub fn from_checkpoint(dir: &Path, device: &Device) -> Result<Self> {
        let checkpoint = CheckpointLoader::new(dir).load(device)?;
        Self::load(
            checkpoint.vb,
            &checkpoint.bert_config,
            checkpoint.classifier_config.hidden_size,
            checkpoint.classifier_config.max_position_embeddings,
        )
        .map_err(|e| {
            PipelineError::Load(format!(
                "Checkpoint '{}' is incompatible with BertForSequenceClassification: {}",
                dir.display(),
                e
            ))
        })
    }
}

impl SentimentAnalysisModel for BertSequenceClassifier {
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor> {
        let _enter = self.span.enter();
        let hidden = self
            .bert
            .forward(input_ids, token_type_ids, Some(attention_mask))?;
        let cls = hidden.i((.., 0))?;
        let pooled = self.pooler.forward(&cls)?.tanh()?;
        Ok(self.classifier.forward(&pooled)?)
    }

    fn device(&self) -> &Device {
        &self.device
    }

    fn max_position_embeddings(&self) -> Option<usize> {
        Some(self.max_position_embeddings)
    }
}
