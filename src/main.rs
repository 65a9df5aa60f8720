use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use once_cell::unsync::OnceCell;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use indobert_sentiment::error::PipelineError;
use indobert_sentiment::sentiment::{
    PredictionResult, SentimentLabel, SentimentPipeline, SentimentPipelineBuilder,
    DEFAULT_MAX_LENGTH, DEFAULT_MODELS_DIR,
};

const EMPTY_TEXT_WARNING: &str = "Teks masih kosong. Silakan isi kalimat terlebih dahulu.";

/// Analisis sentimen teks berbahasa Indonesia (kesehatan mental ibu hamil).
#[derive(Parser)]
#[command(name = "indobert-sentiment")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Text to analyse once. Without it, starts an interactive session.
    #[arg(long, short)]
    text: Option<String>,

    /// Maximum tokens fed to the model (64-256, in steps of 16)
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH, value_parser = parse_max_length)]
    max_length: usize,

    /// Directory holding the tokenizer and the checkpoint subdirectory
    #[arg(long, default_value = DEFAULT_MODELS_DIR)]
    models_dir: PathBuf,

    /// Use CPU even if a GPU is available
    #[arg(long)]
    cpu: bool,

    /// Print the prediction as JSON
    #[arg(long)]
    json: bool,

    /// Also print raw logits and probabilities
    #[arg(long)]
    details: bool,
}

fn parse_max_length(s: &str) -> std::result::Result<usize, String> {
    let value: usize = s.parse().map_err(|_| format!("'{s}' is not a number"))?;
    if !(64..=256).contains(&value) || value % 16 != 0 {
        return Err(format!(
            "max length must be between 64 and 256 in steps of 16, got {value}"
        ));
    }
    Ok(value)
}

/// Lazily loaded pipeline, shared by every analysis in the session.
struct Session {
    builder: SentimentPipelineBuilder,
    pipeline: OnceCell<SentimentPipeline>,
    json: bool,
    details: bool,
}

impl Session {
    fn new(cli: &Cli) -> Self {
        let mut builder = SentimentPipelineBuilder::new()
            .models_dir(&cli.models_dir)
            .max_length(cli.max_length);
        if cli.cpu {
            builder = builder.cpu();
        }
        Self {
            builder,
            pipeline: OnceCell::new(),
            json: cli.json,
            details: cli.details,
        }
    }

    fn pipeline(&self) -> std::result::Result<&SentimentPipeline, PipelineError> {
        self.pipeline.get_or_try_init(|| {
            eprintln!("Sedang memuat model IndoBERT, tunggu sebentar...");
            let pipeline = self.builder.clone().build()?;
            tracing::info!(device = %pipeline.device_kind(), "model ready");
            Ok(pipeline)
        })
    }

    /// Analyse one text. Load failures are returned; per-request failures are printed.
    fn analyze(&self, text: &str) -> std::result::Result<bool, PipelineError> {
        if text.trim().is_empty() {
            println!("⚠️  {EMPTY_TEXT_WARNING}");
            return Ok(false);
        }

        let pipeline = self.pipeline()?;

        match pipeline.run(text) {
            Ok(output) => {
                tracing::debug!(
                    elapsed_ms = output.stats.total_time.as_secs_f64() * 1000.0,
                    tokens = output.stats.tokens_processed,
                    "analysis finished"
                );
                if self.json {
                    match serde_json::to_string_pretty(&output.prediction) {
                        Ok(json) => println!("{json}"),
                        Err(e) => eprintln!("Gagal menulis JSON: {e}"),
                    }
                } else {
                    println!("{}", render(&output.prediction, self.details));
                }
                Ok(true)
            }
            Err(e) if e.is_user_correctable() => {
                println!("⚠️  {EMPTY_TEXT_WARNING}");
                Ok(false)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                eprintln!("Analisis gagal: {e}");
                Ok(false)
            }
        }
    }
}

fn format_prob(p: f32) -> String {
    format!("{:.1}%", p * 100.0)
}

fn bar(p: f32) -> String {
    const WIDTH: usize = 30;
    let filled = ((p.clamp(0.0, 1.0) * WIDTH as f32).round() as usize).min(WIDTH);
    format!("{}{}", "█".repeat(filled), "░".repeat(WIDTH - filled))
}

fn render(result: &PredictionResult, details: bool) -> String {
    let (p_neg, p_pos) = (result.probs[0], result.probs[1]);
    let mut out = String::new();

    match result.label() {
        SentimentLabel::Positif => {
            out.push_str("✅ Perkiraan model: Sentimen POSITIF 😊\n");
            out.push_str("Model cukup yakin bahwa kalimat ini bernada positif.\n");
            out.push_str(&format!("• Perkiraan positif: {}\n", format_prob(p_pos)));
            out.push_str(&format!("• Perkiraan negatif: {}\n", format_prob(p_neg)));
        }
        SentimentLabel::Negatif => {
            out.push_str("⚠️  Perkiraan model: Sentimen NEGATIF 😞\n");
            out.push_str("Model membaca kalimat ini cenderung bernada negatif.\n");
            out.push_str(&format!("• Perkiraan negatif: {}\n", format_prob(p_neg)));
            out.push_str(&format!("• Perkiraan positif: {}\n", format_prob(p_pos)));
        }
    }

    out.push_str("\n🎯 Tingkat keyakinan model\n");
    out.push_str(&format!("Negatif (0) {} {}\n", bar(p_neg), format_prob(p_neg)));
    out.push_str(&format!("Positif (1) {} {}\n", bar(p_pos), format_prob(p_pos)));

    if details {
        out.push_str("\n🔍 Detail teknis\n");
        out.push_str(&format!(
            "Logits (sebelum softmax): [{}, {}]\n",
            result.logits[0], result.logits[1]
        ));
        out.push_str(&format!(
            "Probabilitas mentah: negatif (0) = {}, positif (1) = {}\n",
            p_neg, p_pos
        ));
    }

    out
}

fn interactive(session: &Session) -> Result<()> {
    println!("🧠 Analisis Sentimen Teks (Kesehatan Mental Ibu Hamil di Indonesia)");
    println!("Tulis kalimat berbahasa Indonesia lalu tekan Enter. Ketik 'keluar' untuk berhenti.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        io::stdout().flush()?;

        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;
        if matches!(line.trim(), "keluar" | "exit" | "quit") {
            break;
        }

        session.analyze(&line)?;
        println!();
    }

    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "indobert_sentiment=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let session = Session::new(&cli);

    match &cli.text {
        Some(text) => {
            if !session.analyze(text)? {
                std::process::exit(1);
            }
        }
        None => interactive(&session)?,
    }

    Ok(())
}
