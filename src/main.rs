//! # pagewalk CLI Application
//!
//! Command-line interface over the pagewalk library.
//!
//! ## Subcommands
//!
//! - `scrape`: Crawl a paginated listing, export the text, optionally extract data
//! - `chunk`: Split a text file into model-sized chunks
//! - `next`: Show the pagination decision for a single page
//! - `paginate`: Build the URL of page N by rewriting the query string

mod logging;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use pagewalk::crawler::{
    CrawlStatus, CrawlerConfig, Renderer, StaticRenderer, construct_pagination_url, crawl,
    detect_pagination_param, fetch_page, next_link,
    storage::{PageLayout, Storage},
};
use pagewalk::model::gemini_extraction_model_from_env;
use pagewalk::processor::{
    DEFAULT_MAX_CHUNK_LENGTH, ProcessorConfig, chunk_text, extract_insights,
};
use tracing::{info, instrument, warn};

#[derive(Parser)]
#[command(author, version, about = "Render web pages, reduce them to readable text, and walk paginated listings", long_about = None)]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Crawl a paginated listing and save its text
    Scrape(ScrapeArgs),

    /// Split a text file into chunks
    Chunk(ChunkArgs),

    /// Print the next-page decision for one page
    Next(NextArgs),

    /// Print the URL of a given page number
    Paginate(PaginateArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum RendererKind {
    /// Plain HTTP fetch, no script execution
    Static,
    /// Headless Chrome (requires the `browser` feature)
    Browser,
}

#[derive(Args, Debug, Clone)]
struct RenderArgs {
    /// Renderer used to load pages
    #[arg(short, long, value_enum, default_value = "static")]
    renderer: RendererKind,

    /// Seconds to wait for a page to become ready
    #[arg(long, default_value = "20")]
    ready_timeout: u64,

    /// Seconds to wait after readiness for deferred content
    #[arg(long, default_value = "7")]
    settle: u64,

    /// Show the browser window
    #[arg(long)]
    headed: bool,
}

#[derive(Args, Debug)]
struct ScrapeArgs {
    /// URL of the first page
    #[arg(required = true)]
    url: String,

    /// Maximum number of pages to collect
    #[arg(short, long, default_value = "1")]
    pages: usize,

    /// Directory receiving scraped_page_N.txt files
    #[arg(short, long, default_value = ".")]
    output_dir: PathBuf,

    /// Save all pages into one scraped_content.txt (always on for a single page)
    #[arg(long)]
    concatenated: bool,

    /// Also save the whole session as JSON to this file
    #[arg(long)]
    json: Option<PathBuf>,

    /// Seconds to wait between pages
    #[arg(long, default_value = "3")]
    delay: u64,

    /// Describe the data to extract with the Gemini model (needs GEMINI_API_KEY)
    #[arg(short, long)]
    extract: Option<String>,

    /// Chunk size in characters for extraction
    #[arg(short, long, default_value_t = DEFAULT_MAX_CHUNK_LENGTH)]
    chunk_size: usize,

    /// LLM model used for extraction
    #[arg(short, long, default_value = "gemini-1.5-pro")]
    model: String,

    /// Keep crawling when the first page shows a password field
    #[arg(long)]
    skip_login_check: bool,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug)]
struct ChunkArgs {
    /// Text file to split
    #[arg(required = true)]
    file: PathBuf,

    /// Chunk size in characters
    #[arg(short, long, default_value_t = DEFAULT_MAX_CHUNK_LENGTH)]
    chunk_size: usize,

    /// Save the chunks as a JSON array
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct NextArgs {
    /// URL of the page to inspect
    #[arg(required = true)]
    url: String,

    #[command(flatten)]
    render: RenderArgs,
}

#[derive(Args, Debug)]
struct PaginateArgs {
    /// URL of any page of the listing
    #[arg(required = true)]
    url: String,

    /// Page number to build
    #[arg(required = true)]
    page: u32,

    /// Query parameter to set (detected from the URL when omitted)
    #[arg(long)]
    param: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::setup_logging(cli.log_file.as_deref())?;

    match cli.command {
        Some(Commands::Scrape(args)) => scrape_command(args).await?,
        Some(Commands::Chunk(args)) => chunk_command(args).await?,
        Some(Commands::Next(args)) => next_command(args).await?,
        Some(Commands::Paginate(args)) => paginate_command(args)?,
        None => {
            let _ = Cli::parse_from(["pagewalk", "--help"]);
        }
    }

    Ok(())
}

fn crawler_config(render: &RenderArgs) -> CrawlerConfig {
    CrawlerConfig::builder()
        .ready_timeout(Duration::from_secs(render.ready_timeout))
        .settle_delay(Duration::from_secs(render.settle))
        .headless(!render.headed)
        .build()
}

async fn build_renderer(
    kind: RendererKind,
    config: &CrawlerConfig,
) -> anyhow::Result<Box<dyn Renderer>> {
    match kind {
        RendererKind::Static => Ok(Box::new(StaticRenderer::new(config)?)),
        #[cfg(feature = "browser")]
        RendererKind::Browser => Ok(Box::new(
            pagewalk::crawler::BrowserRenderer::launch(config).await?,
        )),
        #[cfg(not(feature = "browser"))]
        RendererKind::Browser => {
            anyhow::bail!("this build has no browser renderer; rebuild with --features browser")
        }
    }
}

fn spinner(message: impl Into<String>) -> anyhow::Result<ProgressBar> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed}] {msg}")?);
    bar.set_message(message.into());
    bar.enable_steady_tick(Duration::from_millis(120));
    Ok(bar)
}

/// Exit status after a second interrupt
const EXIT_INTERRUPTED: i32 = 130;

/// Turn interrupts into a cooperative cancel, then a hard exit
///
/// The first interrupt sets the cancel flag so the crawl stops at its next
/// state transition. A second one returns the exit code; extraction and
/// export have no cancellation points of their own.
async fn watch_interrupts<F, Fut>(mut interrupted: F, config: CrawlerConfig) -> Option<i32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if !interrupted().await {
        return None;
    }
    warn!("Interrupted, finishing after the current page (press Ctrl-C again to quit)");
    config.cancel();

    if !interrupted().await {
        return None;
    }
    warn!("Interrupted again, exiting");
    Some(EXIT_INTERRUPTED)
}

#[instrument(skip(args), fields(url = %args.url, pages = args.pages))]
async fn scrape_command(args: ScrapeArgs) -> anyhow::Result<()> {
    let mut config = crawler_config(&args.render);
    config.politeness_delay = Duration::from_secs(args.delay);
    config.stop_at_login = !args.skip_login_check;

    let signal_config = config.clone();
    tokio::spawn(async move {
        let ctrl_c = || async { tokio::signal::ctrl_c().await.is_ok() };
        if let Some(code) = watch_interrupts(ctrl_c, signal_config).await {
            std::process::exit(code);
        }
    });

    let renderer = build_renderer(args.render.renderer, &config).await?;

    let progress = spinner(format!("Scraping up to {} pages from {}", args.pages, args.url))?;
    let session = crawl(renderer, &args.url, args.pages, &config).await?;
    progress.finish_and_clear();

    if session.login_required {
        if config.stop_at_login {
            anyhow::bail!("login required at {}", args.url);
        }
        warn!("Continuing past the login form at {}", args.url);
    }

    match session.status {
        CrawlStatus::Completed => println!("Collected {} pages", session.pages.len()),
        CrawlStatus::StoppedEarly => println!(
            "Stopped early after {} of {} pages",
            session.pages.len(),
            session.requested_page_count
        ),
        CrawlStatus::Failed => anyhow::bail!("could not load {}", args.url),
        CrawlStatus::Running => {}
    }

    let storage = Storage::in_dir(&args.output_dir);
    let layout = PageLayout::for_run(args.pages, args.concatenated);
    let written = storage.export(&session.pages, layout).await?;
    for path in &written {
        println!("Saved {}", path.display());
    }
    if let Some(json_path) = &args.json {
        let dir = json_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let file_name = json_path
            .file_name()
            .and_then(|name| name.to_str())
            .context("JSON output path needs a UTF-8 file name")?;
        let path = Storage::in_dir(dir).write_session_json(file_name, &session).await?;
        println!("Saved session to {}", path.display());
    }

    if config.is_cancelled() && args.extract.is_some() {
        warn!("Skipping extraction after an interrupt");
    } else if let Some(description) = &args.extract {
        let processor_config = ProcessorConfig::builder()
            .max_chunk_length(args.chunk_size)
            .llm_model(args.model.clone())
            .build();
        let model = gemini_extraction_model_from_env(&processor_config)?;

        let progress = spinner("Extracting with Gemini")?;
        let extracted = extract_insights(
            &model,
            &session.combined_text(),
            description,
            processor_config.max_chunk_length,
        )
        .await?;
        progress.finish_and_clear();

        let path = storage.write_extracted("extracted_data.txt", &extracted).await?;
        info!("Extraction saved to {}", path.display());
        println!("{extracted}");
    }

    Ok(())
}

#[instrument]
async fn chunk_command(args: ChunkArgs) -> anyhow::Result<()> {
    let text = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    let chunks = chunk_text(&text, args.chunk_size)?;
    println!(
        "{} characters in {} chunks of at most {}",
        text.chars().count(),
        chunks.len(),
        args.chunk_size
    );

    if let Some(output) = args.output {
        let json = serde_json::to_string_pretty(&chunks)?;
        tokio::fs::write(&output, json).await?;
        println!("Saved chunks to {}", output.display());
    }
    Ok(())
}

#[instrument]
async fn next_command(args: NextArgs) -> anyhow::Result<()> {
    let config = crawler_config(&args.render);
    let mut renderer = build_renderer(args.render.renderer, &config).await?;

    let result = async {
        let page = fetch_page(&mut renderer, &args.url, &config).await?;
        Ok::<_, anyhow::Error>(next_link(&page.url, &mut renderer, &page.html).await)
    }
    .await;

    if let Err(e) = renderer.close().await {
        warn!("Failed to close renderer: {}", e);
    }

    println!("{}", serde_json::to_string_pretty(&result?)?);
    Ok(())
}

fn paginate_command(args: PaginateArgs) -> anyhow::Result<()> {
    let param = args
        .param
        .unwrap_or_else(|| detect_pagination_param(&args.url));
    println!("{}", construct_pagination_url(&args.url, args.page, &param)?);
    Ok(())
}
