//! lockstep-decode: run the decoding engine against a built-in toy scorer.
//!
//! The engine treats the model as an injected capability, so this tool
//! ships a small deterministic scorer (each token's successor is favored
//! with a fixed margin) to make the decode loop and sampling pipeline
//! observable without any model files.

use std::path::PathBuf;
use std::process;
use std::time::Instant;

use clap::Parser;
use serde::Serialize;

use lockstep_decode::cli;
use lockstep_decode::{
    AttentionMask, DecodeError, Decoder, GenerationConfig, Logits, SamplingConfig, ScoreModel,
    TokenBuffer,
};

#[derive(Parser)]
#[command(name = "lockstep-decode", about = "Decode token sequences with a toy scorer")]
struct Args {
    /// Prompt token ids: comma-separated, rows split by ';' (e.g. "5,7;5,8")
    #[arg(short = 't', long, conflicts_with = "file")]
    tokens: Option<String>,

    /// Read prompt token text from file
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// Total output length per row, prompt included
    #[arg(short = 'n', long, default_value = "16")]
    max_length: usize,

    /// Vocabulary size of the toy scorer
    #[arg(long, default_value = "32")]
    vocab: usize,

    /// Sample stochastically instead of greedy arg-max
    #[arg(long)]
    sample: bool,

    /// Temperature for logit scaling
    #[arg(long)]
    temp: Option<f32>,

    /// Top-k filtering
    #[arg(long)]
    top_k: Option<usize>,

    /// Top-p (nucleus) filtering
    #[arg(long)]
    top_p: Option<f32>,

    /// Min-p filtering
    #[arg(long)]
    min_p: Option<f32>,

    /// Random seed (required with --sample)
    #[arg(short = 's', long)]
    seed: Option<u64>,

    /// Pad token id (default 0)
    #[arg(long)]
    pad_id: Option<u32>,

    /// EOS token id (unset: generate to max length)
    #[arg(long)]
    eos_id: Option<u32>,

    /// Use the cached fixed-shape decode plan
    #[arg(long)]
    plan: bool,

    /// Output format: text or json
    #[arg(long, default_value = "text", value_parser = validate_output_format)]
    output_format: String,

    /// Suppress all logging
    #[arg(long)]
    log_disable: bool,
}

fn validate_output_format(s: &str) -> Result<String, String> {
    match s {
        "text" | "json" => Ok(s.to_string()),
        _ => Err(format!("Unknown output format '{}'. Options: text, json", s)),
    }
}

/// Deterministic demo scorer: the successor of the token at each position
/// gets a fixed logit margin, everything else stays flat.
struct SuccessorModel {
    vocab: usize,
}

impl ScoreModel for SuccessorModel {
    fn vocab_size(&self) -> usize {
        self.vocab
    }

    fn score(
        &self,
        tokens: &TokenBuffer,
        _mask: &AttentionMask,
        _deterministic: bool,
    ) -> Result<Logits, DecodeError> {
        let mut logits = Logits::zeros(tokens.rows(), tokens.cols(), self.vocab);
        for row in 0..tokens.rows() {
            for pos in 0..tokens.cols() {
                let next = (tokens.get(row, pos) as usize + 1) % self.vocab;
                logits.row_mut(row, pos)[next] = 4.0;
            }
        }
        Ok(logits)
    }

    fn model_id(&self) -> &str {
        "successor-demo"
    }
}

#[derive(Serialize)]
struct ConfigOutput {
    max_length: usize,
    do_sample: bool,
    temperature: Option<f32>,
    top_k: Option<usize>,
    top_p: Option<f32>,
    min_p: Option<f32>,
    seed: Option<u64>,
    use_plan: bool,
}

#[derive(Serialize)]
struct JsonOutput {
    rows: Vec<Vec<u32>>,
    prompt_length: usize,
    decode_ms: f64,
    config: ConfigOutput,
}

fn main() {
    let args = Args::parse();
    cli::init_logging(args.log_disable);

    if let Err(e) = run(args) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let text = cli::read_input(args.tokens.as_deref(), args.file.as_deref(), true)?;
    let rows = cli::parse_token_rows(&text)?;
    let prompt = TokenBuffer::from_rows(&rows);
    let prompt_length = prompt.cols();

    let config = GenerationConfig {
        max_length: args.max_length,
        pad_token_id: args.pad_id,
        eos_token_id: args.eos_id,
        use_plan: args.plan,
        sampling: SamplingConfig {
            do_sample: args.sample,
            temperature: args.temp,
            top_k: args.top_k,
            top_p: args.top_p,
            min_p: args.min_p,
            seed: args.seed,
        },
    };

    let decoder = Decoder::new(SuccessorModel { vocab: args.vocab });

    let decode_start = Instant::now();
    let output = decoder.generate(&prompt, &config)?;
    let decode_ms = decode_start.elapsed().as_secs_f64() * 1000.0;

    match args.output_format.as_str() {
        "json" => {
            let json = JsonOutput {
                rows: (0..output.rows()).map(|r| output.row(r).to_vec()).collect(),
                prompt_length,
                decode_ms,
                config: ConfigOutput {
                    max_length: args.max_length,
                    do_sample: args.sample,
                    temperature: args.temp,
                    top_k: args.top_k,
                    top_p: args.top_p,
                    min_p: args.min_p,
                    seed: args.seed,
                    use_plan: args.plan,
                },
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            for r in 0..output.rows() {
                let line: Vec<String> = output.row(r).iter().map(|t| t.to_string()).collect();
                println!("{}", line.join(","));
            }
        }
    }

    Ok(())
}
