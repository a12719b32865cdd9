//! strand CLI - render a JSON page description.
//!
//! ```text
//! main() -> load config -> init_tracing() -> page::read() -> PageNode::build(Loader)
//!                                                                |
//!                                  stream | data | html <--------+
//! ```
//!
//! Rendered output goes to stdout; logs go to stderr.

mod page;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use futures_util::StreamExt;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use strand_config::StrandConfig;
use strand_engine::{
    ChunkEncoder, HtmlAdapter, Loader, PrefetchPayload, ResolveOptions, render_to_data,
    render_to_html, render_to_stream,
};

#[derive(Parser)]
#[command(name = "strand")]
#[command(about = "Render a page with streamed async boundaries")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the initial HTML, then one chunk script per resolved boundary
    Stream(RenderArgs),
    /// Write the resolved data of every boundary as JSON
    Data(RenderArgs),
    /// Write the fully resolved HTML
    Html(RenderArgs),
}

#[derive(Args)]
struct RenderArgs {
    /// Page description (JSON)
    page: PathBuf,

    /// Pre-seeded boundary values (JSON object of id -> value)
    #[arg(long)]
    seed: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, config_warning) = match StrandConfig::load() {
        Ok(config) => (config.unwrap_or_default(), None),
        Err(err) => (StrandConfig::default(), Some(err)),
    };
    init_tracing(&config.log.filter);
    if let Some(err) = config_warning {
        tracing::warn!("Ignoring config: {err}");
    }

    // Boundaries are `!Send`; everything runs on this one thread.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(run(cli.command, &config))
}

fn init_tracing(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

async fn run(command: Commands, config: &StrandConfig) -> Result<()> {
    let (args, mode) = match &command {
        Commands::Stream(args) => (args, "stream"),
        Commands::Data(args) => (args, "data"),
        Commands::Html(args) => (args, "html"),
    };

    let page = page::read(&args.page)?;
    let loader = Loader::new();
    if let Some(seed) = &args.seed {
        loader.seed(read_seed(seed)?);
    }
    let view = page.build(&loader);
    tracing::info!(mode, page = %args.page.display(), "Rendering");

    let mut out = io::stdout();
    match command {
        Commands::Stream(_) => {
            let encoder = ChunkEncoder::new(&config.render.chunk_function)?;
            let chunks = loader.chunk_channel();
            let mut body = render_to_stream(&view, &HtmlAdapter)?.into_html_stream(chunks, encoder);
            while let Some(part) = body.next().await {
                writeln!(out, "{}", part?)?;
                out.flush()?;
            }
        }
        Commands::Data(_) => {
            let data = render_to_data(&view, &HtmlAdapter, &loader).await?;
            serde_json::to_writer_pretty(&mut out, &data)?;
            writeln!(out)?;
        }
        Commands::Html(_) => {
            let options = ResolveOptions {
                catch_errors: config.render.catch_errors,
            };
            let html = render_to_html(&view, &HtmlAdapter, options).await?;
            writeln!(out, "{html}")?;
        }
    }
    Ok(())
}

fn read_seed(path: &Path) -> Result<PrefetchPayload> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read seed {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("invalid seed data in {}", path.display()))
}
