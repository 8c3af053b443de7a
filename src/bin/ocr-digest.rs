//! CLI binary for ocr-digest.
//!
//! A thin shim over the library crate: reads stored Textract responses, maps
//! CLI flags to `SummarizeConfig`, and prints the transcript, summary, answer,
//! or analysis.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr_digest::{
    analyze_transcript, answer_question, build_transcript, parse_textract_response,
    summarize_transcript, ProgressCallback, SummarizeConfig, SummaryProgressCallback,
    TextFragment,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Renders one progress bar per reduction pass. Chunks complete out of order,
/// so the bar only counts; per-chunk lines are printed above it.
struct CliProgressCallback {
    bar: ProgressBar,
    retries: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.set_message("Resolving model provider…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            retries: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
        let retries = self.retries.load(Ordering::SeqCst);
        if retries > 0 {
            eprintln!("{} {} model calls retried", cyan("↻"), retries);
        }
    }
}

impl SummaryProgressCallback for CliProgressCallback {
    fn on_pass_start(&self, depth: u32, chunk_count: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} chunks  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_style(style);
        self.bar.set_length(chunk_count as u64);
        self.bar.set_position(0);
        self.bar.set_prefix(format!("Pass {depth}"));
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Pass {depth}: summarising {chunk_count} chunks…"))
        ));
    }

    fn on_chunk_retry(&self, _depth: u32, index: usize, attempt: u32, error: &str) {
        self.retries.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Chunk {:>3}  attempt {} failed: {}",
            cyan("↻"),
            index + 1,
            attempt,
            dim(error)
        ));
    }

    fn on_chunk_complete(&self, _depth: u32, index: usize, total: usize, summary_len: usize) {
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}",
            green("✓"),
            index + 1,
            total,
            dim(&format!("{summary_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_chunk_error(&self, _depth: u32, index: usize, total: usize, error: &str) {
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(std::iter::once('…')).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Chunk {:>3}/{:<3}  {}",
            red("✗"),
            index + 1,
            total,
            red(&msg)
        ));
    }

    fn on_pass_complete(&self, depth: u32, candidate_tokens: usize, within_budget: bool) {
        self.bar.println(format!(
            "  {} Pass {} merged to {} tokens{}",
            if within_budget { green("✔") } else { cyan("…") },
            depth,
            candidate_tokens,
            if within_budget { "" } else { ", reducing again" }
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the ordered transcript of a scanned invoice
  ocr-digest invoice.json

  # One Textract response per page, summarised to 500 tokens
  ocr-digest page1.json page2.json page3.json --summarize --max-tokens 500

  # Ask a question about the document
  ocr-digest letter.json --ask "What is the payment deadline?"

  # Classify the document and extract key entities as JSON
  ocr-digest receipt.json --analyze

  # Use a specific provider and model
  ocr-digest --provider anthropic --model claude-sonnet-4-20250514 doc.json --summarize

INPUT:
  Each file is an AWS Textract DetectDocumentText response body. Files are
  pages in the order given, unless their blocks carry an explicit "Page".

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Order OCR output into transcripts and summarise them with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "ocr-digest",
    version,
    about = "Order OCR fragments into transcripts and summarise them within a token budget",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Textract JSON responses, one per page.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Summarise the transcript to --max-tokens.
    #[arg(long, conflicts_with_all = ["ask", "analyze"])]
    summarize: bool,

    /// Answer a question about the document.
    #[arg(long, value_name = "QUESTION", conflicts_with = "analyze")]
    ask: Option<String>,

    /// Classify the document and extract key entities.
    #[arg(long)]
    analyze: bool,

    /// Token budget per model call and for the final summary.
    #[arg(long, env = "OCR_DIGEST_MAX_TOKENS", default_value_t = 4000)]
    max_tokens: usize,

    /// Number of concurrent model calls per reduction pass.
    #[arg(short, long, env = "OCR_DIGEST_CONCURRENCY", default_value_t = 10)]
    concurrency: usize,

    /// Retries per model call on transient failure.
    #[arg(long, env = "OCR_DIGEST_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Maximum number of reduction passes.
    #[arg(long, env = "OCR_DIGEST_MAX_DEPTH", default_value_t = 5)]
    max_depth: u32,

    /// Per-call model timeout in seconds.
    #[arg(long, env = "OCR_DIGEST_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gpt-4.1-nano).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// Output structured JSON instead of plain text.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "OCR_DIGEST_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR_DIGEST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while a summary is running.
    let show_progress = cli.summarize && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Read and order fragments ─────────────────────────────────────────
    let mut fragments: Vec<TextFragment> = Vec::new();
    for (idx, path) in cli.inputs.iter().enumerate() {
        let body = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let page = parse_textract_response(&body, idx as u32 + 1)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        fragments.extend(page);
    }
    let transcript = build_transcript(fragments).context("Failed to build transcript")?;

    if transcript.dropped_fragments > 0 && !cli.quiet {
        eprintln!(
            "{} {} fragments dropped for malformed bounding boxes",
            cyan("⚠"),
            transcript.dropped_fragments
        );
    }

    let progress = show_progress.then(CliProgressCallback::new);
    let config = build_config(
        &cli,
        progress
            .as_ref()
            .map(|cb| Arc::clone(cb) as ProgressCallback),
    )?;

    // ── Run the requested operation ──────────────────────────────────────
    let start = Instant::now();
    if cli.summarize {
        let result = summarize_transcript(&transcript, cli.max_tokens, &config).await;
        if let Some(ref cb) = progress {
            cb.finish();
        }
        let summary = result.context("Summarization failed")?;

        if cli.json {
            print_json(&summary)?;
        } else {
            write_stdout(&summary.text)?;
        }
        if !cli.quiet && !cli.json {
            eprintln!(
                "{}  {} tokens  depth {}  {}ms",
                if summary.over_budget {
                    cyan("⚠ over budget")
                } else {
                    green("✔")
                },
                summary.estimated_tokens,
                summary.depth,
                start.elapsed().as_millis()
            );
        }
    } else if let Some(ref question) = cli.ask {
        let answer = answer_question(&transcript.full_text, question, &[], &config)
            .await
            .context("Question answering failed")?;
        if cli.json {
            print_json(&serde_json::json!({ "question": question, "answer": answer }))?;
        } else {
            write_stdout(&answer)?;
        }
    } else if cli.analyze {
        let analysis = analyze_transcript(&transcript, &config)
            .await
            .context("Analysis failed")?;
        print_json(&analysis)?;
    } else if cli.json {
        print_json(&transcript)?;
    } else {
        write_stdout(&transcript.full_text)?;
        if !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "{} pages, {} lines, mean confidence {:.1}",
                    transcript.page_count(),
                    transcript.fragment_count(),
                    transcript.mean_confidence
                ))
            );
        }
    }

    Ok(())
}

/// Map CLI args to `SummarizeConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<SummarizeConfig> {
    let mut builder = SummarizeConfig::builder()
        .max_tokens(cli.max_tokens)
        .concurrency(cli.concurrency)
        .max_retries(cli.max_retries)
        .max_depth(cli.max_depth)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.as_str());
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider.as_str());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialise output")?;
    println!("{json}");
    Ok(())
}

fn write_stdout(text: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(text.as_bytes())
        .context("Failed to write to stdout")?;
    if !text.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write to stdout")?;
    }
    Ok(())
}
