//! Tiny synthetic IndoBERT-shaped checkpoint for tests that need real weights.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;

use candle_core::{DType, Device, Tensor};
use indobert_sentiment::sentiment::{ModelPaths, DEFAULT_CHECKPOINT};

pub const VOCAB: &[&str] = &[
    "[PAD]", "[UNK]", "[CLS]", "[SEP]", "[MASK]", "saya", "aku", "mertua", "suami", "orang",
    "tua", "senang", "sedih", "banget", "selalu", "bikin", "dan", "lagi", "kerja", "di", "luar",
    "kota", "karena", "masih", "ada", "yang", "peduli", "sama", "##nya", ",", ".",
];

pub const HIDDEN: usize = 8;
pub const INTERMEDIATE: usize = 16;
pub const MAX_POSITIONS: usize = 64;

pub fn config_json(num_labels: usize) -> serde_json::Value {
    let id2label: HashMap<String, String> = (0..num_labels)
        .map(|i| (i.to_string(), format!("LABEL_{i}")))
        .collect();
    serde_json::json!({
        "architectures": ["BertForSequenceClassification"],
        "model_type": "bert",
        "vocab_size": VOCAB.len(),
        "hidden_size": HIDDEN,
        "num_hidden_layers": 1,
        "num_attention_heads": 2,
        "intermediate_size": INTERMEDIATE,
        "hidden_act": "gelu",
        "hidden_dropout_prob": 0.1,
        "attention_probs_dropout_prob": 0.1,
        "max_position_embeddings": MAX_POSITIONS,
        "type_vocab_size": 2,
        "initializer_range": 0.02,
        "layer_norm_eps": 1e-12,
        "pad_token_id": 0,
        "position_embedding_type": "absolute",
        "classifier_dropout": null,
        "id2label": id2label,
    })
}

/// Deterministic small weights, different for every `seed`.
fn filler(shape: &[usize], seed: f64) -> candle_core::Result<Tensor> {
    let n: usize = shape.iter().product();
    Tensor::arange(0u32, n as u32, &Device::Cpu)?
        .to_dtype(DType::F32)?
        .affine(0.37, seed)?
        .sin()?
        .affine(0.5, 0.0)?
        .reshape(shape.to_vec())
}

fn ones(n: usize) -> candle_core::Result<Tensor> {
    Tensor::ones(n, DType::F32, &Device::Cpu)
}

fn zeros(n: usize) -> candle_core::Result<Tensor> {
    Tensor::zeros(n, DType::F32, &Device::Cpu)
}

fn weights() -> candle_core::Result<HashMap<String, Tensor>> {
    let mut w = HashMap::new();
    let mut seed = 0.0;
    let mut fill = |shape: &[usize]| {
        seed += 1.3;
        filler(shape, seed)
    };

    w.insert("bert.embeddings.word_embeddings.weight".into(), fill(&[VOCAB.len(), HIDDEN])?);
    w.insert("bert.embeddings.position_embeddings.weight".into(), fill(&[MAX_POSITIONS, HIDDEN])?);
    w.insert("bert.embeddings.token_type_embeddings.weight".into(), fill(&[2, HIDDEN])?);
    w.insert("bert.embeddings.LayerNorm.weight".into(), ones(HIDDEN)?);
    w.insert("bert.embeddings.LayerNorm.bias".into(), zeros(HIDDEN)?);

    let layer = "bert.encoder.layer.0";
    for name in ["query", "key", "value"] {
        w.insert(format!("{layer}.attention.self.{name}.weight"), fill(&[HIDDEN, HIDDEN])?);
        w.insert(format!("{layer}.attention.self.{name}.bias"), fill(&[HIDDEN])?);
    }
    w.insert(format!("{layer}.attention.output.dense.weight"), fill(&[HIDDEN, HIDDEN])?);
    w.insert(format!("{layer}.attention.output.dense.bias"), fill(&[HIDDEN])?);
    w.insert(format!("{layer}.attention.output.LayerNorm.weight"), ones(HIDDEN)?);
    w.insert(format!("{layer}.attention.output.LayerNorm.bias"), zeros(HIDDEN)?);
    w.insert(format!("{layer}.intermediate.dense.weight"), fill(&[INTERMEDIATE, HIDDEN])?);
    w.insert(format!("{layer}.intermediate.dense.bias"), fill(&[INTERMEDIATE])?);
    w.insert(format!("{layer}.output.dense.weight"), fill(&[HIDDEN, INTERMEDIATE])?);
    w.insert(format!("{layer}.output.dense.bias"), fill(&[HIDDEN])?);
    w.insert(format!("{layer}.output.LayerNorm.weight"), ones(HIDDEN)?);
    w.insert(format!("{layer}.output.LayerNorm.bias"), zeros(HIDDEN)?);

    w.insert("bert.pooler.dense.weight".into(), fill(&[HIDDEN, HIDDEN])?);
    w.insert("bert.pooler.dense.bias".into(), fill(&[HIDDEN])?);
    w.insert("classifier.weight".into(), fill(&[2, HIDDEN])?);
    w.insert("classifier.bias".into(), fill(&[2])?);

    Ok(w)
}

/// Write tokenizer files into `base` and a checkpoint into `base/checkpoint-2390`.
pub fn write_checkpoint(base: &Path) -> anyhow::Result<ModelPaths> {
    write_checkpoint_with_labels(base, 2)
}

pub fn write_checkpoint_with_labels(base: &Path, num_labels: usize) -> anyhow::Result<ModelPaths> {
    std::fs::write(base.join("vocab.txt"), VOCAB.join("\n"))?;
    std::fs::write(
        base.join("tokenizer_config.json"),
        serde_json::json!({
            "do_lower_case": true,
            "model_max_length": 512,
            "unk_token": "[UNK]",
            "cls_token": "[CLS]",
            "sep_token": "[SEP]",
            "pad_token": "[PAD]",
            "mask_token": "[MASK]",
            "tokenizer_class": "BertTokenizer"
        })
        .to_string(),
    )?;

    let checkpoint = base.join(DEFAULT_CHECKPOINT);
    std::fs::create_dir_all(&checkpoint)?;
    std::fs::write(
        checkpoint.join("config.json"),
        config_json(num_labels).to_string(),
    )?;
    candle_core::safetensors::save(&weights()?, checkpoint.join("model.safetensors"))?;

    Ok(ModelPaths::new(base))
}
