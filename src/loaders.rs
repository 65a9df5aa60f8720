//! Local loaders for the fine-tuned IndoBERT checkpoint and its tokenizer.
//!
//! The deployment keeps two artifacts apart:
//! - the tokenizer (`tokenizer.json`, or `vocab.txt` + `tokenizer_config.json`) in a base directory
//! - the classifier checkpoint (`config.json` + weights) in a named subdirectory of that base
//!
//! ```text
//! models/indoBERT_best/
//!   vocab.txt
//!   tokenizer_config.json
//!   checkpoint-2390/
//!     config.json
//!     model.safetensors
//! ```

use candle_core::{DType, Device};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::Config as BertConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer};

use crate::error::{PipelineError, Result};
use crate::models::BertSequenceClassifier;
use crate::pipelines::utils::DeviceRequest;

/// Base directory holding the tokenizer files.
pub const DEFAULT_MODELS_DIR: &str = "models/indoBERT_best";

/// Checkpoint subdirectory (inside the base directory) holding the model weights.
pub const DEFAULT_CHECKPOINT: &str = "checkpoint-2390";

/// Number of classes the classifier head must produce.
pub(crate) const NUM_LABELS: usize = 2;

/// On-disk location of the tokenizer and checkpoint.
///
/// The checkpoint is always [`DEFAULT_CHECKPOINT`] inside the base directory;
/// only the base directory can be relocated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPaths {
    base_dir: PathBuf,
}

impl ModelPaths {
    /// Paths rooted at `base_dir` instead of [`DEFAULT_MODELS_DIR`].
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Directory holding the tokenizer files.
    pub fn tokenizer_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Directory holding `config.json` and the model weights.
    pub fn checkpoint_dir(&self) -> PathBuf {
        self.base_dir.join(DEFAULT_CHECKPOINT)
    }
}

impl Default for ModelPaths {
    fn default() -> Self {
        Self::new(DEFAULT_MODELS_DIR)
    }
}

/// Load tokenizer, model, and device from the fixed deployment paths.
///
/// Picks an accelerator when one is available, otherwise the CPU.
/// This is expensive; load once and reuse the handles for every prediction.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] if either directory is missing or its files are malformed.
pub fn load_model() -> Result<(Tokenizer, BertSequenceClassifier, Device)> {
    load_model_from(&ModelPaths::default(), DeviceRequest::Auto)
}

/// Load tokenizer, model, and device from explicit paths and device request.
///
/// # Errors
///
/// Returns [`PipelineError::Load`] for missing or malformed artifacts, and
/// [`PipelineError::Device`] if an explicitly requested accelerator cannot be opened.
pub fn load_model_from(
    paths: &ModelPaths,
    device_request: DeviceRequest,
) -> Result<(Tokenizer, BertSequenceClassifier, Device)> {
    let device = device_request.resolve()?;

    let tokenizer = TokenizerLoader::new(paths.tokenizer_dir()).load()?;
    let model = BertSequenceClassifier::from_checkpoint(&paths.checkpoint_dir(), &device)?;

    tracing::info!(
        tokenizer_dir = %paths.tokenizer_dir().display(),
        checkpoint_dir = %paths.checkpoint_dir().display(),
        device = ?device.location(),
        "loaded sentiment model"
    );

    Ok((tokenizer, model, device))
}

// ============ Tokenizer ============

/// Loads a BERT tokenizer from a local directory.
#[derive(Debug, Clone)]
pub struct TokenizerLoader {
    dir: PathBuf,
}

impl TokenizerLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Prefers `tokenizer.json`; falls back to building WordPiece from `vocab.txt`.
    pub fn load(&self) -> Result<Tokenizer> {
        if !self.dir.is_dir() {
            return Err(PipelineError::Load(format!(
                "Tokenizer directory not found: '{}'",
                self.dir.display()
            )));
        }

        let tokenizer_json = self.dir.join("tokenizer.json");
        let mut tokenizer = if tokenizer_json.is_file() {
            tracing::debug!(path = %tokenizer_json.display(), "loading tokenizer.json");
            Tokenizer::from_file(&tokenizer_json).map_err(|e| {
                PipelineError::Load(format!(
                    "Failed to load tokenizer from '{}': {}",
                    tokenizer_json.display(),
                    e
                ))
            })?
        } else {
            let vocab = self.dir.join("vocab.txt");
            if !vocab.is_file() {
                return Err(PipelineError::Load(format!(
                    "No tokenizer found in '{}' (tried tokenizer.json, vocab.txt)",
                    self.dir.display()
                )));
            }
            let config = TokenizerConfig::read(&self.dir.join("tokenizer_config.json"))?;
            tracing::debug!(path = %vocab.display(), "building WordPiece tokenizer from vocab.txt");
            build_wordpiece_tokenizer(&vocab, &config)?
        };

        // Truncation is applied per request; padding defaults to the batch's longest sequence.
        tokenizer.with_truncation(None).map_err(|e| {
            PipelineError::Load(format!("Failed to reset tokenizer truncation: {e}"))
        })?;
        if tokenizer.get_padding().is_none() {
            let pad_token = "[PAD]".to_string();
            let pad_id = tokenizer.token_to_id(&pad_token).unwrap_or(0);
            tokenizer.with_padding(Some(PaddingParams {
                strategy: PaddingStrategy::BatchLongest,
                pad_id,
                pad_token,
                ..Default::default()
            }));
        }

        Ok(tokenizer)
    }
}

/// The subset of `tokenizer_config.json` a `BertTokenizer` save carries.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenizerConfig {
    #[serde(default = "default_true")]
    do_lower_case: bool,
    #[serde(default)]
    strip_accents: Option<bool>,
    #[serde(default = "default_true")]
    tokenize_chinese_chars: bool,
    #[serde(default)]
    unk_token: Option<SpecialToken>,
    #[serde(default)]
    cls_token: Option<SpecialToken>,
    #[serde(default)]
    sep_token: Option<SpecialToken>,
}

/// Special tokens are saved either as plain strings or as `AddedToken` objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SpecialToken {
    Plain(String),
    Added { content: String },
}

impl SpecialToken {
    fn content(&self) -> &str {
        match self {
            SpecialToken::Plain(s) => s,
            SpecialToken::Added { content } => content,
        }
    }
}

fn default_true() -> bool {
    true
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            do_lower_case: true,
            strip_accents: None,
            tokenize_chinese_chars: true,
            unk_token: None,
            cls_token: None,
            sep_token: None,
        }
    }
}

impl TokenizerConfig {
    /// Missing file means defaults; a present but unreadable file is a load error.
    pub(crate) fn read(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            PipelineError::Load(format!("Failed to read '{}': {}", path.display(), e))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            PipelineError::Load(format!("Failed to parse '{}': {}", path.display(), e))
        })
    }

    fn token<'a>(token: &'a Option<SpecialToken>, fallback: &'a str) -> &'a str {
        token.as_ref().map(SpecialToken::content).unwrap_or(fallback)
    }
}

fn build_wordpiece_tokenizer(vocab: &Path, config: &TokenizerConfig) -> Result<Tokenizer> {
    let unk = TokenizerConfig::token(&config.unk_token, "[UNK]");
    let cls = TokenizerConfig::token(&config.cls_token, "[CLS]");
    let sep = TokenizerConfig::token(&config.sep_token, "[SEP]");

    let wordpiece = WordPiece::from_file(&vocab.to_string_lossy())
        .unk_token(unk.to_string())
        .build()
        .map_err(|e| {
            PipelineError::Load(format!(
                "Failed to build WordPiece model from '{}': {}",
                vocab.display(),
                e
            ))
        })?;

    let mut tokenizer = Tokenizer::new(wordpiece);
    tokenizer.with_normalizer(Some(BertNormalizer::new(
        true,
        config.tokenize_chinese_chars,
        config.strip_accents,
        config.do_lower_case,
    )));
    tokenizer.with_pre_tokenizer(Some(BertPreTokenizer));

    let special_id = |token: &str| {
        tokenizer.token_to_id(token).ok_or_else(|| {
            PipelineError::Load(format!(
                "Special token '{}' missing from '{}'",
                token,
                vocab.display()
            ))
        })
    };
    let sep_id = special_id(sep)?;
    let cls_id = special_id(cls)?;
    tokenizer.with_post_processor(Some(BertProcessing::new(
        (sep.to_string(), sep_id),
        (cls.to_string(), cls_id),
    )));

    Ok(tokenizer)
}

// ============ Checkpoint ============

/// Classifier fields of `config.json` that the candle BERT config does not expose.
#[derive(Debug, Deserialize)]
pub(crate) struct ClassifierConfig {
    pub hidden_size: usize,
    pub max_position_embeddings: usize,
    #[serde(default)]
    id2label: HashMap<String, String>,
    #[serde(default)]
    label2id: HashMap<String, u32>,
}

impl ClassifierConfig {
    /// Matches the `transformers` default of two labels when neither map is saved.
    pub(crate) fn num_labels(&self) -> usize {
        match self.id2label.len().max(self.label2id.len()) {
            0 => NUM_LABELS,
            n => n,
        }
    }
}

/// Everything needed to assemble the classifier from a checkpoint directory.
pub(crate) struct Checkpoint {
    pub bert_config: BertConfig,
    pub classifier_config: ClassifierConfig,
    pub vb: VarBuilder<'static>,
}

/// Loads `config.json` and weights from a trainer checkpoint directory.
#[derive(Debug, Clone)]
pub(crate) struct CheckpointLoader {
    dir: PathBuf,
}

impl CheckpointLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, device: &Device) -> Result<Checkpoint> {
        if !self.dir.is_dir() {
            return Err(PipelineError::Load(format!(
                "Checkpoint directory not found: '{}'",
                self.dir.display()
            )));
        }

        let config_path = self.dir.join("config.json");
        let config_str = std::fs::read_to_string(&config_path).map_err(|e| {
            PipelineError::Load(format!("Failed to read '{}': {}", config_path.display(), e))
        })?;
        let parse_err = |e: serde_json::Error| {
            PipelineError::Load(format!("Failed to parse '{}': {}", config_path.display(), e))
        };
        let bert_config: BertConfig = serde_json::from_str(&config_str).map_err(parse_err)?;
        let classifier_config: ClassifierConfig =
            serde_json::from_str(&config_str).map_err(parse_err)?;

        if classifier_config.num_labels() != NUM_LABELS {
            return Err(PipelineError::Load(format!(
                "Checkpoint '{}' has {} labels, expected {}",
                self.dir.display(),
                classifier_config.num_labels(),
                NUM_LABELS
            )));
        }

        let vb = self.weights(device)?;

        Ok(Checkpoint {
            bert_config,
            classifier_config,
            vb,
        })
    }

    fn weights(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let safetensors = self.dir.join("model.safetensors");
        let pth = self.dir.join("pytorch_model.bin");

        let vb = if safetensors.is_file() {
            // SAFETY: the checkpoint is read-only for the lifetime of the process.
            unsafe { VarBuilder::from_mmaped_safetensors(&[&safetensors], DType::F32, device) }
                .map_err(|e| e.with_path(&safetensors))
        } else if pth.is_file() {
            VarBuilder::from_pth(&pth, DType::F32, device).map_err(|e| e.with_path(&pth))
        } else {
            return Err(PipelineError::Load(format!(
                "No weights found in '{}' (tried model.safetensors, pytorch_model.bin)",
                self.dir.display()
            )));
        };

        vb.map_err(|e| PipelineError::Load(format!("Failed to load weights: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkpoint_lives_under_tokenizer_dir() {
        let paths = ModelPaths::default();
        assert_eq!(paths.tokenizer_dir(), Path::new("models/indoBERT_best"));
        assert_eq!(
            paths.checkpoint_dir(),
            Path::new("models/indoBERT_best/checkpoint-2390")
        );

        let moved = ModelPaths::new("/srv/indobert");
        assert_eq!(
            moved.checkpoint_dir(),
            Path::new("/srv/indobert/checkpoint-2390")
        );
    }

    #[test]
    fn tokenizer_config_accepts_added_token_objects() {
        let config: TokenizerConfig = serde_json::from_str(
            r#"{
                "do_lower_case": false,
                "unk_token": {"content": "<unk>", "lstrip": false},
                "cls_token": "<cls>"
            }"#,
        )
        .unwrap();

        assert!(!config.do_lower_case);
        assert!(config.tokenize_chinese_chars);
        assert_eq!(TokenizerConfig::token(&config.unk_token, "[UNK]"), "<unk>");
        assert_eq!(TokenizerConfig::token(&config.cls_token, "[CLS]"), "<cls>");
        assert_eq!(TokenizerConfig::token(&config.sep_token, "[SEP]"), "[SEP]");
    }

    #[test]
    fn missing_tokenizer_config_uses_defaults() {
        let config = TokenizerConfig::read(Path::new("/nonexistent/tokenizer_config.json")).unwrap();
        assert!(config.do_lower_case);
    }

    #[test]
    fn num_labels_defaults_to_two() {
        let config: ClassifierConfig =
            serde_json::from_str(r#"{"hidden_size": 8, "max_position_embeddings": 16}"#).unwrap();
        assert_eq!(config.num_labels(), 2);

        let config: ClassifierConfig = serde_json::from_str(
            r#"{
                "hidden_size": 8,
                "max_position_embeddings": 16,
                "id2label": {"0": "a", "1": "b", "2": "c"}
            }"#,
        )
        .unwrap();
        assert_eq!(config.num_labels(), 3);
    }

    #[test]
    fn missing_directories_are_load_errors() {
        let err = TokenizerLoader::new("/nonexistent/indobert").load().unwrap_err();
        assert!(matches!(err, PipelineError::Load(_)));

        let err = CheckpointLoader::new("/nonexistent/indobert/checkpoint-2390")
            .load(&Device::Cpu)
            .err()
            .unwrap();
        assert!(matches!(err, PipelineError::Load(_)));
    }
}
