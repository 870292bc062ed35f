//! CLI binary for pagecast.
//!
//! A thin shim over the library crate that maps CLI flags to the pipeline
//! configs and prints results.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pagecast::{
    ask, run_ocr, run_podcast, AskConfig, DirectoryRetriever, OcrConfig, OutputFormat,
    PodcastConfig, RunObserver, RunStats, Workspace,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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

// ── CLI run observer using indicatif ─────────────────────────────────────────

/// Terminal observer: a live page bar plus per-page log lines. The page
/// loop is sequential, so no locking gymnastics are needed.
struct CliObserver {
    bar: ProgressBar,
}

impl CliObserver {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_run_start
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening document…");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl RunObserver for CliObserver {
    fn on_run_start(&self, total_pages: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        self.bar.set_length(total_pages as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Extracting");
    }

    fn on_page_resumed(&self, page: usize, total: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            cyan("↻"),
            page,
            total,
            dim("already done")
        ));
        self.bar.inc(1);
    }

    fn on_page_extracted(&self, page: usize, total: usize) {
        self.bar
            .println(format!("  {} Page {:>3}/{:<3}", green("✓"), page, total));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page: usize, total: usize, reason: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = if reason.len() > 80 {
            format!("{}\u{2026}", &reason[..79])
        } else {
            reason.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, stats: &RunStats) {
        self.bar.finish_and_clear();
        if stats.skipped_pages == 0 {
            eprintln!(
                "{} {} pages complete ({} extracted, {} resumed)",
                green("✔"),
                bold(&stats.total_pages.to_string()),
                stats.extracted_pages,
                stats.resumed_pages,
            );
        } else {
            eprintln!(
                "{} {}/{} pages complete  ({} still pending — rerun to retry)",
                cyan("⚠"),
                bold(&(stats.total_pages - stats.skipped_pages).to_string()),
                stats.total_pages,
                red(&stats.skipped_pages.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # OCR a document (resumes automatically if interrupted)
  pagecast ocr book.pdf -o output_texts

  # Force a full reprocess of an existing output directory
  pagecast ocr book.pdf -o output_texts --fresh

  # Plain-text results instead of JSON
  pagecast ocr book.pdf --format text

  # OCR straight from a URL with a specific model
  pagecast ocr https://example.com/paper.pdf --provider openai --model gpt-4.1

  # Turn a folder of notes into one narrated WAV
  pagecast podcast ./txt -o ./podcast --workers 4

  # Ask a question over a folder of text files
  pagecast ask "what is dataprep used for" --corpus ./corpus

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY       OpenAI API key
  ANTHROPIC_API_KEY    Anthropic API key
  GEMINI_API_KEY       Google Gemini API key
  PAGECAST_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  PAGECAST_MODEL       Override model ID

  A .env file in the working directory is loaded automatically.

RESUME SEMANTICS:
  Each page's extraction result and a progress record (progress.json) are
  written to the output directory as the run proceeds. Re-running against
  the same directory skips every page whose result is intact and retries
  only what is missing — interrupted runs never pay twice for a page.
"#;

/// Checkpointed OCR, podcast narration, and corpus Q&A via vision/LLM services.
#[derive(Parser, Debug)]
#[command(
    name = "pagecast",
    version,
    about = "Checkpointed document OCR, podcast narration, and corpus Q&A via vision/LLM services",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PAGECAST_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PAGECAST_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract text from a document page by page, with checkpointed resume.
    Ocr(OcrArgs),
    /// Rewrite text files into narrated audio and concatenate one podcast WAV.
    Podcast(PodcastArgs),
    /// Answer a question from a directory of text files.
    Ask(AskArgs),
}

#[derive(clap::Args, Debug)]
struct OcrArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Output directory (results, progress record, aggregate).
    #[arg(short, long, env = "PAGECAST_OUTPUT", default_value = "output_texts")]
    output: PathBuf,

    /// LLM provider: openai, anthropic, gemini, ollama.
    #[arg(long, env = "PAGECAST_PROVIDER")]
    provider: Option<String>,

    /// Vision model ID (e.g. gpt-4.1-nano, gemma3:12b).
    #[arg(long, env = "PAGECAST_MODEL")]
    model: Option<String>,

    /// Result/aggregate shape.
    #[arg(long, value_enum, default_value = "json")]
    format: FormatArg,

    /// Maximum rendered page dimension in pixels.
    #[arg(long, env = "PAGECAST_MAX_PIXELS", default_value_t = 2000)]
    max_pixels: u32,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.2)]
    temperature: f32,

    /// Max model output tokens per page.
    #[arg(long, default_value_t = 8192)]
    max_tokens: usize,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PAGECAST_PASSWORD")]
    password: Option<String>,

    /// Path to a text file containing a custom extraction prompt.
    #[arg(long)]
    prompt: Option<PathBuf>,

    /// Clear the progress record first, forcing a full reprocess.
    #[arg(long)]
    fresh: bool,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Disable the progress bar.
    #[arg(long)]
    no_progress: bool,
}

#[derive(clap::Args, Debug)]
struct PodcastArgs {
    /// Directory of source .txt files.
    input_dir: PathBuf,

    /// Output directory (narrations, per-file WAVs, final podcast.wav).
    #[arg(short, long, default_value = "podcast")]
    output: PathBuf,

    /// Synthesis worker-pool size.
    #[arg(long, default_value_t = 4)]
    workers: usize,

    /// LLM provider for the narration stage.
    #[arg(long, env = "PAGECAST_PROVIDER")]
    provider: Option<String>,

    /// Model ID for the narration stage.
    #[arg(long, env = "PAGECAST_MODEL")]
    model: Option<String>,

    /// TTS program (say-compatible: -v VOICE -f text -o out.wav).
    #[arg(long, env = "PAGECAST_TTS", default_value = "say")]
    tts_program: String,

    /// Synthesize the input files directly, without the narration rewrite.
    #[arg(long)]
    skip_narration: bool,
}

#[derive(clap::Args, Debug)]
struct AskArgs {
    /// The question to answer.
    question: String,

    /// Directory of .txt files to retrieve context from.
    #[arg(long, default_value = "corpus")]
    corpus: PathBuf,

    /// How many context chunks to use.
    #[arg(long, default_value_t = 3)]
    top_k: usize,

    /// LLM provider.
    #[arg(long, env = "PAGECAST_PROVIDER")]
    provider: Option<String>,

    /// Model ID.
    #[arg(long, env = "PAGECAST_MODEL")]
    model: Option<String>,

    /// Print the retrieved context excerpts after the answer.
    #[arg(long)]
    show_context: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum FormatArg {
    Json,
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(v: FormatArg) -> Self {
        match v {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Environment first: API keys and overrides may live in .env.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar provides the per-page feedback, so library INFO
    // logs stay quiet unless asked for.
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Ocr(args) => run_ocr_command(args, cli.quiet).await,
        Command::Podcast(args) => run_podcast_command(args, cli.quiet).await,
        Command::Ask(args) => run_ask_command(args).await,
    }
}

async fn run_ocr_command(args: OcrArgs, quiet: bool) -> Result<()> {
    if args.fresh {
        let workspace = Workspace::open(&args.output).context("Failed to open output directory")?;
        workspace
            .clear_checkpoint()
            .context("Failed to clear the progress record")?;
        if !quiet {
            eprintln!("{} progress record cleared", cyan("◆"));
        }
    }

    let extraction_prompt = if let Some(ref path) = args.prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read extraction prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = OcrConfig::builder()
        .output_dir(&args.output)
        .format(args.format.clone().into())
        .max_rendered_pixels(args.max_pixels)
        .temperature(args.temperature)
        .max_tokens(args.max_tokens)
        .download_timeout_secs(args.download_timeout);

    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref password) = args.password {
        builder = builder.password(password);
    }
    if let Some(prompt) = extraction_prompt {
        builder = builder.extraction_prompt(prompt);
    }
    if !quiet && !args.no_progress {
        builder = builder.observer(CliObserver::new());
    }

    let config = builder.build().context("Invalid configuration")?;
    let output = run_ocr(&args.input, &config)
        .await
        .context("OCR run failed")?;

    if !quiet {
        eprintln!(
            "{}  {} extracted / {} resumed / {} pending  {}ms  →  {}",
            if output.stats.skipped_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            output.stats.extracted_pages,
            output.stats.resumed_pages,
            output.stats.skipped_pages,
            output.stats.total_duration_ms,
            bold(&output.aggregate_path.display().to_string()),
        );
    }

    Ok(())
}

async fn run_podcast_command(args: PodcastArgs, quiet: bool) -> Result<()> {
    let mut config = PodcastConfig {
        input_dir: args.input_dir,
        output_dir: args.output,
        workers: args.workers,
        skip_narration: args.skip_narration,
        tts_program: args.tts_program,
        ..PodcastConfig::default()
    };
    config.llm.provider_name = args.provider;
    config.llm.model = args.model;

    let output = run_podcast(&config).await.context("Podcast run failed")?;

    if !quiet {
        eprintln!(
            "{}  {} narrated / {} synthesized  →  {}",
            if output.failures.is_empty() {
                green("✔")
            } else {
                cyan("⚠")
            },
            output.narrated.len(),
            output.synthesized.len(),
            bold(&output.podcast_path.display().to_string()),
        );
        for failure in &output.failures {
            eprintln!("  {} {}", red("✗"), failure);
        }
    }

    Ok(())
}

async fn run_ask_command(args: AskArgs) -> Result<()> {
    let mut config = AskConfig {
        top_k: args.top_k,
        ..AskConfig::default()
    };
    config.llm.provider_name = args.provider;
    config.llm.model = args.model;

    let retriever = DirectoryRetriever::new(&args.corpus);
    let answer = ask(&retriever, &args.question, &config)
        .await
        .context("Ask failed")?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{}", answer.text).context("Failed to write to stdout")?;

    if args.show_context {
        for chunk in &answer.contexts {
            writeln!(
                handle,
                "\n{} {} {}",
                dim("──"),
                bold(&chunk.source),
                dim(&format!("(score {:.2})", chunk.score))
            )?;
            writeln!(handle, "{}", dim(&chunk.text))?;
        }
    } else if !answer.contexts.is_empty() {
        let sources: Vec<&str> = answer.contexts.iter().map(|c| c.source.as_str()).collect();
        eprintln!("{}", dim(&format!("sources: {}", sources.join(", "))));
    }

    Ok(())
}
