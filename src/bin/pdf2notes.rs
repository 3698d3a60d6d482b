//! CLI binary for pdf2notes.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `NotesConfig` and prints or exports the notes.

use anyhow::{Context, Result};
use clap::Parser;
use futures::{Stream, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use pdf2notes::{
    export_html, read_input, CancelHandle, FailurePolicy, NotesConfig, NotesPipeline, NotesProgressCallback,
    PageSelection, ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
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

/// Live progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_run_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Taking notes");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, page_num: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&page_num))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl NotesProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Taking notes on {total_pages} pages…"))
        ));
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(page_num, Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, html_len: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{html_len:>5} chars")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_skipped(&self, page_num: usize, total: usize) {
        let secs = self.elapsed_secs(page_num);
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<8}  {}",
            yellow("∅"),
            page_num,
            total,
            dim("no text"),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(page_num);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.chars().count() > 80 {
            format!("{}\u{2026}", error.chars().take(79).collect::<String>())
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_run_complete(&self, total_pages: usize, noted_pages: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} notes for {}/{} pages",
                green("✔"),
                bold(&noted_pages.to_string()),
                total_pages
            );
        } else {
            eprintln!(
                "{} notes for {}/{} pages  ({} failed)",
                cyan("⚠"),
                bold(&noted_pages.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Notes for a whole document (HTML on stdout)
  pdf2notes lecture.pdf

  # Write the notes to a file
  pdf2notes lecture.pdf -o processed-notes.html

  # Only pages 3 to 8, keep going past failing pages
  pdf2notes --pages 3-8 --keep-going lecture.pdf -o notes.html

  # OCR text only, no note generation
  pdf2notes --ocr-only --pages 1-2 scan.pdf

  # Page count and metadata (no API keys needed)
  pdf2notes --inspect-only lecture.pdf

  # JSON with per-page records and stats
  pdf2notes --json lecture.pdf > notes.json

ENVIRONMENT VARIABLES:
  VISION_API_KEY          OCR (Vision API) key
  GROQ_API_KEY            Generation API key
  PDF2NOTES_MODEL         Override the chat model
  PDFIUM_LIB_PATH         Directory containing libpdfium
  RUST_LOG                Override log filtering
"#;

/// Turn PDF files and URLs into HTML study notes.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2notes",
    version,
    about = "Turn PDF files and URLs into HTML study notes",
    long_about = "Rasterise each PDF page, read its text with an OCR service and rewrite it \
as structured HTML notes with a chat-completion model.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Write HTML to this file (or directory) instead of stdout.
    #[arg(short, long, env = "PDF2NOTES_OUTPUT")]
    output: Option<PathBuf>,

    /// Page selection: all, 5, 3-15, 1,3,5 or 1-3,7.
    #[arg(long, env = "PDF2NOTES_PAGES", default_value = "all")]
    pages: String,

    /// Render scale relative to the page's natural size (0.5–4.0).
    #[arg(long, env = "PDF2NOTES_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// Pages processed at once (results stay in page order).
    #[arg(short, long, env = "PDF2NOTES_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Record failing pages and continue instead of aborting.
    #[arg(long, env = "PDF2NOTES_KEEP_GOING")]
    keep_going: bool,

    /// OCR API key.
    #[arg(long, env = "VISION_API_KEY", hide_env_values = true)]
    vision_key: Option<String>,

    /// Generation API key.
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    generation_key: Option<String>,

    /// OCR endpoint URL.
    #[arg(long, env = "PDF2NOTES_VISION_ENDPOINT")]
    vision_endpoint: Option<String>,

    /// Chat-completion endpoint URL.
    #[arg(long, env = "PDF2NOTES_GENERATION_ENDPOINT")]
    generation_endpoint: Option<String>,

    /// Chat model ID.
    #[arg(long, env = "PDF2NOTES_MODEL")]
    model: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "PDF2NOTES_TEMPERATURE")]
    temperature: Option<f32>,

    /// Nucleus sampling parameter.
    #[arg(long, env = "PDF2NOTES_TOP_P")]
    top_p: Option<f32>,

    /// Text file with a custom prompt; must contain `{text}`.
    #[arg(long, env = "PDF2NOTES_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2NOTES_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Retries per API call on transport errors, 429 and 5xx.
    #[arg(long, env = "PDF2NOTES_MAX_RETRIES", default_value_t = 0)]
    max_retries: u32,

    /// Per-request API timeout in seconds.
    #[arg(long, env = "PDF2NOTES_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL input.
    #[arg(long, env = "PDF2NOTES_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print recognized text only, no note generation.
    #[arg(long)]
    ocr_only: bool,

    /// Print PDF metadata only.
    #[arg(long)]
    inspect_only: bool,

    /// Output structured JSON (per-page records and stats) instead of HTML.
    #[arg(long, env = "PDF2NOTES_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2NOTES_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2NOTES_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2NOTES_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.inspect_only;
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

    let bytes = read_input(&cli.input, cli.download_timeout)
        .await
        .with_context(|| format!("Failed to read {}", cli.input))?;

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let mut builder = NotesConfig::builder();
        if let Some(ref pwd) = cli.password {
            builder = builder.password(pwd);
        }
        let config = builder.build().context("Invalid configuration")?;
        let info = NotesPipeline::new(config)?
            .inspect(bytes)
            .await
            .context("Failed to inspect PDF")?;

        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&info).context("Failed to serialize metadata")?
            );
        } else {
            println!("File:         {}", cli.input);
            if let Some(ref t) = info.title {
                println!("Title:        {}", t);
            }
            if let Some(ref a) = info.author {
                println!("Author:       {}", a);
            }
            println!("Pages:        {}", info.page_count);
            println!("PDF Version:  {}", info.pdf_version);
            println!("Size:         {} bytes", info.byte_len);
        }
        return Ok(());
    }

    // ── Build pipeline ───────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress && !cli.ocr_only {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn NotesProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;
    let pipeline = NotesPipeline::new(config).context("Failed to set up pipeline")?;

    let cancel = pipeline.cancel_handle();
    tokio::spawn(async move {
        if watch_interrupts(cancel, ctrl_c_stream()).await {
            eprintln!("{} interrupted", red("✗"));
            std::process::exit(130);
        }
    });

    // ── OCR-only mode ────────────────────────────────────────────────────
    if cli.ocr_only {
        let doc = pipeline.load(bytes).await.context("Failed to load PDF")?;
        let pages = pipeline.config().pages.to_page_numbers(doc.page_count());
        if pages.is_empty() {
            anyhow::bail!("No pages selected (document has {})", doc.page_count());
        }
        let text = pipeline
            .recognize_pages(doc.as_ref(), &pages, pipeline.config().render_scale)
            .await
            .context("OCR failed")?;
        return emit(&cli, &text);
    }

    // ── Notes ────────────────────────────────────────────────────────────
    let output = pipeline.process(bytes).await.context("Note generation failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        emit(&cli, &json)?;
    } else {
        emit(&cli, &output.html)?;
    }

    if !cli.quiet && !show_progress {
        eprintln!(
            "Notes for {}/{} pages ({} empty, {} failed) in {}ms",
            output.stats.noted_pages,
            output.stats.selected_pages,
            output.stats.empty_pages,
            output.stats.failed_pages,
            output.stats.total_duration_ms
        );
    }

    Ok(())
}

/// Write to `--output` (atomically) or stdout.
fn emit(cli: &Cli, content: &str) -> Result<()> {
    if let Some(ref path) = cli.output {
        let written = export_html(content, path).context("Failed to write output")?;
        if !cli.quiet {
            eprintln!("{}  →  {}", green("✔"), bold(&written.display().to_string()));
        }
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Map CLI args to `NotesConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<NotesConfig> {
    let vision_key = cli
        .vision_key
        .clone()
        .context("Missing OCR key: pass --vision-key or set VISION_API_KEY")?;

    let mut builder = NotesConfig::builder()
        .vision_api_key(vision_key)
        .render_scale(cli.scale)
        .concurrency(cli.concurrency)
        .pages(parse_pages(&cli.pages)?)
        .max_retries(cli.max_retries)
        .failure_policy(if cli.keep_going {
            FailurePolicy::SkipFailedPages
        } else {
            FailurePolicy::FailFast
        });

    if !cli.ocr_only {
        let generation_key = cli
            .generation_key
            .clone()
            .context("Missing generation key: pass --generation-key or set GROQ_API_KEY")?;
        builder = builder.generation_api_key(generation_key);
    }
    if let Some(ref path) = cli.prompt_file {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt_template(template);
    }
    if let Some(ref url) = cli.vision_endpoint {
        builder = builder.vision_endpoint(url);
    }
    if let Some(ref url) = cli.generation_endpoint {
        builder = builder.generation_endpoint(url);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(p) = cli.top_p {
        builder = builder.top_p(p);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages`: `all`, a page, a `start-end` range, or a comma list
/// whose items may themselves be ranges (`1-3,7`).
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("all") {
        return Ok(PageSelection::All);
    }

    let mut items = s.split(',').map(parse_page_item);
    let first = items.next().unwrap_or_else(|| Ok(PageItem::One(1)))?;
    if !s.contains(',') {
        return Ok(match first {
            PageItem::One(p) => PageSelection::Single(p),
            PageItem::Span(a, b) => PageSelection::Range(a, b),
        });
    }

    let mut pages = first.pages();
    for item in items {
        pages.extend(item?.pages());
    }
    Ok(PageSelection::Set(pages))
}

enum PageItem {
    One(usize),
    Span(usize, usize),
}

impl PageItem {
    fn pages(self) -> Vec<usize> {
        match self {
            PageItem::One(p) => vec![p],
            PageItem::Span(a, b) => (a..=b).collect(),
        }
    }
}

fn parse_page_item(item: &str) -> Result<PageItem> {
    let item = item.trim();
    match item.split_once('-') {
        Some((a, b)) => {
            let (a, b) = (page_number(a)?, page_number(b)?);
            if a > b {
                anyhow::bail!("Invalid page range '{item}': start is after end");
            }
            Ok(PageItem::Span(a, b))
        }
        None => Ok(PageItem::One(page_number(item)?)),
    }
}

fn page_number(s: &str) -> Result<usize> {
    let s = s.trim();
    let page: usize = s
        .parse()
        .with_context(|| format!("Invalid page number: '{s}'"))?;
    if page == 0 {
        anyhow::bail!("Pages start at 1");
    }
    Ok(page)
}

/// Cancel on the first interrupt. Returns `true` if a second one arrives,
/// meaning the caller should quit without waiting for the current page.
async fn watch_interrupts<S>(cancel: CancelHandle, mut signals: S) -> bool
where
    S: Stream<Item = ()> + Unpin,
{
    if signals.next().await.is_none() {
        return false;
    }
    eprintln!(
        "{} cancelling after the current page… (Ctrl-C again to quit now)",
        yellow("⚑")
    );
    cancel.cancel();
    signals.next().await.is_some()
}

fn ctrl_c_stream() -> impl Stream<Item = ()> + Unpin {
    Box::pin(futures::stream::unfold((), |()| async {
        tokio::signal::ctrl_c().await.ok().map(|_| ((), ()))
    }))
}
